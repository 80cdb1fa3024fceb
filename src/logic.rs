//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Extracting structured answers (full, with LLM fallback, or equation-only)
//!   - Scoring a submission against a key (records or raw texts), plus the difficulty classifier
//!   - Direct LLM analysis and the pedagogic narrative (local narrative when the LLM is off)
//!   - Batch and class reports

use tracing::{debug, error, info, instrument};

use crate::comparator::{compare, compare_answers, ComparisonResult};
use crate::difficulty::{classify, DifficultyInfo};
use crate::domain::{ExtractionOutcome, Operator};
use crate::extractor::{extract_equation, extract_local};
use crate::protocol::*;
use crate::report::{ClassPerformance, ScoringSummary};
use crate::state::AppState;

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn solve_text(state: &AppState, text: &str) -> SolveTextOut {
  let outcome = state.extractor.extract(text).await;
  let a = outcome.answer();
  info!(target: "exam_scoring", operator = %a.operator, result = %a.result, enhanced = outcome.is_enhanced(), "Text solved");
  outcome.into()
}

#[instrument(level = "info", skip(text), fields(text_len = text.len()))]
pub fn solve_text_simple(text: &str) -> SolveTextOut {
  ExtractionOutcome::Local(extract_equation(text)).into()
}

#[instrument(level = "info", skip_all)]
pub fn compare_answer(key: AnswerIn, submission: AnswerIn) -> ComparisonResult {
  let verdict = compare(&key.into_record(), &submission.into_record());
  info!(target: "scoring", nilai = verdict.nilai, status = verdict.status.as_str(), "Answer compared");
  verdict
}

/// Extract the key from the problem text and the submission from the student's equation, then score.
#[instrument(level = "info", skip(state, soal, jawaban), fields(soal_len = soal.len(), jawaban_len = jawaban.len()))]
pub async fn score_text(state: &AppState, soal: &str, jawaban: &str) -> ScoreTextOut {
  let outcome = state.extractor.extract(soal).await;
  let enhanced_by_ai = outcome.is_enhanced();
  let key = outcome.into_answer();
  let submission = extract_equation(jawaban);
  let hasil = compare_answers(&key, &submission);
  info!(target: "scoring", nilai = hasil.nilai, status = hasil.status.as_str(), enhanced_by_ai, "Texts scored");
  ScoreTextOut {
    kunci_jawaban: (&key).into(),
    jawaban_siswa: (&submission).into(),
    enhanced_by_ai,
    hasil,
  }
}

pub fn difficulty(body: DifficultyIn) -> DifficultyInfo {
  let operands: Vec<String> = match body.angka_dalam_soal {
    OperandsIn::List(items) => items.into_iter().map(Scalar::into_text).collect(),
    OperandsIn::One(s) => s.into_text().split(',').map(str::to_string).collect(),
  };
  classify(&body.operator, &operands)
}

#[instrument(level = "info", skip(state, soal), fields(soal_len = soal.len()))]
pub async fn analyze_problem(state: &AppState, soal: &str) -> AnalyzeProblemOut {
  let result = state.extractor.analyze_with_llm(soal).await;
  if let Err(e) = &result {
    error!(target: "llm", error = %e, "Direct problem analysis failed");
  }
  AnalyzeProblemOut::from_result(soal, result)
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn pedagogic(state: &AppState, text: &str) -> PedagogicOut {
  if let Some(analyzer) = state.extractor.analyzer() {
    let limit = state.config.llm.call_budget();
    match tokio::time::timeout(limit, analyzer.pedagogic_narrative(text)).await {
      Ok(Ok(analisis)) if !analisis.trim().is_empty() => {
        return PedagogicOut { analisis, generated_by_ai: true };
      }
      Ok(Ok(_)) => error!(target: "llm", "Empty pedagogic narrative; using local narrative."),
      Ok(Err(e)) => error!(target: "llm", error = %e, "Pedagogic narrative failed; using local narrative."),
      Err(_) => error!(target: "llm", ?limit, "Pedagogic narrative timed out; using local narrative."),
    }
  }
  PedagogicOut { analisis: pedagogic_local(text), generated_by_ai: false }
}

/// Short narrative built from the local extraction and difficulty classifier.
pub fn pedagogic_local(text: &str) -> String {
  let a = extract_local(text);
  let d = classify(a.operator.label(), &a.operands);
  debug!(target: "exam_scoring", operator = %a.operator, level = ?d.level, "Local pedagogic narrative");

  let focus = match a.operator {
    Operator::Addition => "menggabungkan dua kelompok benda dan menghitung totalnya",
    Operator::Subtraction => "mengambil sebagian dari suatu kelompok dan menghitung sisanya",
    Operator::Multiplication => "penjumlahan berulang dengan kelompok yang sama banyak",
    Operator::Division => "membagi sama banyak ke dalam beberapa kelompok",
    Operator::Mixed => "memecah soal menjadi beberapa langkah operasi secara berurutan",
    Operator::Unknown => "mengenali kata kunci operasi dan angka-angka penting dalam soal",
  };

  let operasi = match a.operator {
    Operator::Unknown => "Operasi pada teks belum dapat dikenali secara otomatis.".to_string(),
    op => format!("Teks ini menggunakan operasi {} dengan angka {}.", op.label(), a.operands.join(", ")),
  };

  format!(
    "{operasi} Tingkat kesulitan: {}. Siswa perlu menguasai kemampuan {focus}. \
     Rekomendasi: gunakan benda konkret atau gambar untuk memodelkan soal, \
     minta siswa menuliskan operan 1, operan 2 dan operator sebelum menghitung, \
     lalu periksa kembali jawaban bersama-sama.",
    d.description
  )
}

#[instrument(level = "info", skip_all, fields(pairs = pairs.len()))]
pub fn batch_report(pairs: Vec<BatchPair>) -> BatchOut {
  let results: Vec<ComparisonResult> = pairs
    .into_iter()
    .map(|p| compare(&p.ai_answer.into_record(), &p.student_answer.into_record()))
    .collect();
  let summary = ScoringSummary::from_results(&results);
  info!(target: "scoring", total = summary.total_jawaban_analyzed, average = summary.average_score, "Batch report built");
  BatchOut { results, summary }
}

pub fn class_report(grades: &[f64]) -> ClassOut {
  ClassOut { statistik_kelas: ClassPerformance::from_grades(grades) }
}
