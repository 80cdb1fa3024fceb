//! Public protocol structs for the HTTP endpoints (serde ready).
//!
//! The three-field answer shape (`operator`, `angka_dalam_soal`, `jawaban`) is the
//! contract the surrounding system stores and sends; it is accepted leniently
//! (numbers or strings, lists or comma-joined operands, missing keys).

use serde::{Deserialize, Serialize};

use crate::comparator::{AnswerRecord, ComparisonResult, Operands};
use crate::domain::{Confidence, ExtractionOutcome, Operator, StructuredAnswer};
use crate::llm::{LlmAnalysis, LlmError};
use crate::report::{ClassPerformance, ScoringSummary};

/// A JSON scalar accepted where the wire allows "string or number". Booleans are rejected.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  Int(i64),
  Float(f64),
  Text(String),
}

impl Scalar {
  pub fn into_text(self) -> String {
    match self {
      Scalar::Int(i) => i.to_string(),
      Scalar::Float(f) => f.to_string(),
      Scalar::Text(s) => s,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OperandsIn {
  List(Vec<Scalar>),
  One(Scalar),
}

/// Lenient answer record as stored/submitted by other parts of the system.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnswerIn {
  #[serde(default)] pub operator: Option<Scalar>,
  #[serde(default)] pub angka_dalam_soal: Option<OperandsIn>,
  #[serde(default)] pub jawaban: Option<Scalar>,
  /// Submissions may nest their extraction here; a non-empty object wins.
  #[serde(default)] pub ai_analysis: Option<Box<AnswerIn>>,
}

impl AnswerIn {
  fn is_empty(&self) -> bool {
    self.operator.is_none() && self.angka_dalam_soal.is_none() && self.jawaban.is_none()
  }

  /// Apply defaults for missing keys and resolve `ai_analysis` nesting.
  pub fn into_record(self) -> AnswerRecord {
    if let Some(inner) = self.ai_analysis {
      if !inner.is_empty() {
        return inner.into_record();
      }
    }
    let defaults = AnswerRecord::default();
    AnswerRecord {
      operator: self.operator.map(Scalar::into_text).unwrap_or(defaults.operator),
      operands: match self.angka_dalam_soal {
        Some(OperandsIn::List(items)) => Operands::List(items.into_iter().map(Scalar::into_text).collect()),
        Some(OperandsIn::One(s)) => Operands::Joined(s.into_text()),
        None => defaults.operands,
      },
      result: self.jawaban.map(Scalar::into_text).unwrap_or(defaults.result),
    }
  }
}

//
// Extraction
//

#[derive(Debug, Deserialize)]
pub struct SolveTextIn {
  #[serde(default)]
  pub text_input: Option<String>,
}

/// Extraction result in the stored wire form.
#[derive(Debug, Serialize)]
pub struct SolveTextOut {
  pub soal_cerita: String,
  pub operator: Operator,
  pub angka_dalam_soal: String,
  pub jawaban: String,
  pub enhanced_by_ai: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub confidence: Option<Confidence>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub penjelasan: Option<String>,
}

impl From<ExtractionOutcome> for SolveTextOut {
  fn from(outcome: ExtractionOutcome) -> Self {
    let (answer, confidence, penjelasan) = match outcome {
      ExtractionOutcome::Local(a) => (a, None, None),
      ExtractionOutcome::Enhanced { answer, confidence, explanation } => (answer, Some(confidence), Some(explanation)),
    };
    Self {
      angka_dalam_soal: answer.operands_joined(),
      soal_cerita: answer.source_text,
      operator: answer.operator,
      jawaban: answer.result,
      enhanced_by_ai: confidence.is_some(),
      confidence,
      penjelasan,
    }
  }
}

//
// Comparison
//

#[derive(Debug, Deserialize)]
pub struct CompareIn {
  #[serde(default)] pub ai_answer: Option<AnswerIn>,
  #[serde(default)] pub student_answer: Option<AnswerIn>,
}

/// Problem text plus the student's written equation, scored in one step.
#[derive(Debug, Deserialize)]
pub struct ScoreTextIn {
  #[serde(default)] pub soal_text: Option<String>,
  #[serde(default)] pub jawaban_text: Option<String>,
}

/// An extracted answer in the three-field wire form.
#[derive(Debug, Serialize)]
pub struct AnswerOut {
  pub operator: Operator,
  pub angka_dalam_soal: String,
  pub jawaban: String,
}

impl From<&StructuredAnswer> for AnswerOut {
  fn from(a: &StructuredAnswer) -> Self {
    Self { operator: a.operator, angka_dalam_soal: a.operands_joined(), jawaban: a.result.clone() }
  }
}

#[derive(Debug, Serialize)]
pub struct ScoreTextOut {
  pub kunci_jawaban: AnswerOut,
  pub jawaban_siswa: AnswerOut,
  pub enhanced_by_ai: bool,
  pub hasil: ComparisonResult,
}

#[derive(Debug, Deserialize)]
pub struct DifficultyIn {
  pub operator: String,
  pub angka_dalam_soal: OperandsIn,
}

//
// LLM boundary
//

#[derive(Debug, Deserialize)]
pub struct AnalyzeProblemIn {
  #[serde(default)]
  pub soal_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisBody {
  pub operator: String,
  pub angka_dalam_soal: String,
  pub jawaban: String,
  pub soal_cerita: String,
}

/// `{status:"success", analysis, penjelasan, confidence}` or `{status:"error", error}`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzeProblemOut {
  Success {
    analysis: AnalysisBody,
    penjelasan: String,
    confidence: Confidence,
    operasi_detail: String,
  },
  Error {
    error: String,
    confidence: Confidence,
  },
}

impl AnalyzeProblemOut {
  pub fn from_result(soal: &str, result: Result<LlmAnalysis, LlmError>) -> Self {
    match result {
      Ok(a) => AnalyzeProblemOut::Success {
        analysis: AnalysisBody {
          operator: a.operator,
          angka_dalam_soal: a.angka_dalam_soal,
          jawaban: a.jawaban,
          soal_cerita: soal.to_string(),
        },
        penjelasan: a.penjelasan,
        confidence: a.confidence,
        operasi_detail: a.operasi_detail,
      },
      Err(e) => AnalyzeProblemOut::Error { error: e.to_string(), confidence: Confidence::Low },
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct PedagogicIn {
  #[serde(default)]
  pub text: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct PedagogicOut {
  pub analisis: String,
  pub generated_by_ai: bool,
}

#[derive(Debug, Serialize)]
pub struct LlmStatusOut {
  pub llm_available: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  pub pre_call_delay_ms: u64,
  pub timeout_secs: u64,
}

//
// Reports
//

#[derive(Debug, Deserialize)]
pub struct BatchPair {
  pub ai_answer: AnswerIn,
  pub student_answer: AnswerIn,
}
#[derive(Debug, Deserialize)]
pub struct BatchIn {
  pub pairs: Vec<BatchPair>,
}
#[derive(Debug, Serialize)]
pub struct BatchOut {
  pub results: Vec<ComparisonResult>,
  pub summary: ScoringSummary,
}

#[derive(Debug, Deserialize)]
pub struct ClassIn {
  pub grades: Vec<f64>,
}
#[derive(Debug, Serialize)]
pub struct ClassOut {
  pub statistik_kelas: ClassPerformance,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
