//! Turns free-form text into a `StructuredAnswer`.
//!
//! Two local strategies:
//!   - equation form ("3+2=5", "48 : 6 = 8"), chosen when an operator symbol
//!     sits directly between two numbers
//!   - story form (Indonesian word problems), classified by keyword hits
//!
//! Problems classified as unknown or mixed are optionally passed to an injected
//! `MathAnalyzer`; its fields replace the local ones on success. Nothing here
//! returns an error: failures degrade to the local (or fallback) answer.

use std::ops::Range;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
  ExtractionOutcome, Operator, StructuredAnswer, NEEDS_ANALYSIS, NOT_COMPUTABLE, UNDEFINED,
};
use crate::llm::{LlmError, MathAnalyzer};

/// Keyword table in tie-break order: on equal hit counts the earlier row wins.
const KEYWORDS: [(Operator, &[&str]); 4] = [
  (Operator::Addition, &[
    "tambah", "ditambah", "plus", "jumlah", "total", "keseluruhan",
    "bersama", "bertambah", "menambah", "gabungan", "semua",
  ]),
  (Operator::Subtraction, &[
    "kurang", "dikurangi", "minus", "sisa", "tersisa", "memberikan",
    "memberi", "mengurangi", "berkurang", "hilang", "diambil",
    "dipinjam", "dipakai", "digunakan", "keluar",
  ]),
  (Operator::Multiplication, &[
    "kali", "dikali", "dikalikan", "x", "×", "*", "setiap", "per",
    "masing-masing", "tiap", "baris", "kolom", "grup", "kelompok",
    "pak", "kotak", "menghasilkan", "produksi", "berisi",
  ]),
  (Operator::Division, &[
    "bagi", "dibagi", "dibagikan", "÷", "/", ":", "rata", "merata",
    "sama banyak", "sama rata", "per kelompok", "setiap kelompok",
    "masing-masing kelompok", "ke dalam", "dimasukkan",
  ]),
];

/// Narrative continuation words hinting at a multi-step problem.
const CONTINUATION_WORDS: &[&str] = &[
  "kemudian", "lalu", "setelah itu", "selanjutnya", "dan", "juga",
  "namun", "tetapi", "akan tetapi", "sementara", "sambil",
];

fn digit_runs_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"[0-9]+").expect("static regex"))
}

/// Byte ranges of every ASCII digit run, left to right.
fn digit_runs(text: &str) -> Vec<Range<usize>> {
  digit_runs_re().find_iter(text).map(|m| m.range()).collect()
}

fn compact(text: &str) -> String {
  text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Operations named by separators that are exactly one operator symbol.
fn separator_ops(compact: &str, runs: &[Range<usize>]) -> Vec<Operator> {
  runs
    .windows(2)
    .filter_map(|w| Operator::from_symbol(&compact[w[0].end..w[1].start]))
    .collect()
}

fn mixed_answer(numbers: Vec<String>, text: &str) -> StructuredAnswer {
  let operands = match numbers.len() {
    0 => vec!["0".into(), "0".into()],
    1 => vec![numbers[0].clone(), "0".into()],
    _ => numbers,
  };
  StructuredAnswer { operator: Operator::Mixed, operands, result: NEEDS_ANALYSIS.into(), source_text: text.to_string() }
}

/// Integer arithmetic; `None` on overflow. Division rounds half to even.
fn apply(op: Operator, a: i64, b: i64) -> Option<String> {
  let v = match op {
    Operator::Addition => a.checked_add(b)?,
    Operator::Subtraction => a.checked_sub(b)?,
    Operator::Multiplication => a.checked_mul(b)?,
    Operator::Division => {
      if b == 0 {
        return Some(UNDEFINED.into());
      }
      let q = a.checked_div(b)?;
      let r = a % b;
      let twice = r.unsigned_abs().checked_mul(2)?;
      let bound = b.unsigned_abs();
      let away = twice > bound || (twice == bound && q % 2 != 0);
      if away {
        // (a / b) is negative exactly when the signs differ
        if (a < 0) != (b < 0) { q.checked_sub(1)? } else { q.checked_add(1)? }
      } else {
        q
      }
    }
    Operator::Mixed | Operator::Unknown => return Some(NOT_COMPUTABLE.into()),
  };
  Some(v.to_string())
}

/// Equation-form extraction on already-compacted text.
fn equation_form(compact: &str, runs: &[Range<usize>], text: &str) -> StructuredAnswer {
  let num = |i: usize| compact[runs[i].clone()].to_string();
  match runs.len() {
    0 => StructuredAnswer::fallback(text),
    1 => StructuredAnswer {
      operator: Operator::Unknown,
      operands: vec![num(0), "0".into()],
      result: num(0),
      source_text: text.to_string(),
    },
    n => StructuredAnswer {
      operator: Operator::from_symbol(&compact[runs[0].end..runs[1].start]).unwrap_or(Operator::Unknown),
      operands: vec![num(0), num(1)],
      // no third number: the caller decides what the result is
      result: if n >= 3 { num(2) } else { String::new() },
      source_text: text.to_string(),
    },
  }
}

/// Hit count per operation, in table order.
fn keyword_scores(lower: &str) -> [(Operator, usize); 4] {
  KEYWORDS.map(|(op, words)| (op, words.iter().filter(|w| lower.contains(*w)).count()))
}

/// Highest-scoring operation; first in table order on ties, Unknown when nothing hits.
fn pick_operation(scores: &[(Operator, usize)]) -> Operator {
  let mut best = (Operator::Unknown, 0);
  for &(op, hits) in scores {
    if hits > best.1 {
      best = (op, hits);
    }
  }
  best.0
}

fn story_form(text: &str) -> Option<StructuredAnswer> {
  let lower = text.to_lowercase();
  let numbers: Vec<String> = digit_runs(text).into_iter().map(|r| text[r].to_string()).collect();
  let scores = keyword_scores(&lower);
  let scored_ops = scores.iter().filter(|(_, hits)| *hits > 0).count();

  let multiple_operations = scored_ops > 1 || numbers.len() > 2;
  let continues = CONTINUATION_WORDS.iter().any(|w| lower.contains(w));
  if (multiple_operations && continues) || numbers.len() > 2 {
    debug!(target: "extractor", ?scores, continues, n_numbers = numbers.len(), "story classified as mixed");
    return Some(mixed_answer(numbers, text));
  }

  let operator = pick_operation(&scores);
  debug!(target: "extractor", ?scores, %operator, "story operation chosen");

  let answer = match numbers.len() {
    0 => StructuredAnswer { operator, ..StructuredAnswer::fallback(text) },
    1 => StructuredAnswer {
      operator,
      operands: vec![numbers[0].clone(), "0".into()],
      result: numbers[0].clone(),
      source_text: text.to_string(),
    },
    _ => {
      let a: i64 = numbers[0].parse().ok()?;
      let b: i64 = numbers[1].parse().ok()?;
      StructuredAnswer {
        operator,
        result: apply(operator, a, b)?,
        operands: vec![numbers[0].clone(), numbers[1].clone()],
        source_text: text.to_string(),
      }
    }
  };
  Some(answer)
}

/// Simple equation extraction used for student answers ("6x4=24").
#[instrument(level = "debug", target = "extractor", skip(text), fields(text_len = text.len()))]
pub fn extract_equation(text: &str) -> StructuredAnswer {
  let compact = compact(text);
  let runs = digit_runs(&compact);
  equation_form(&compact, &runs, text)
}

/// Local heuristics only: equation form when a symbol joins two numbers, story form otherwise.
#[instrument(level = "debug", target = "extractor", skip(text), fields(text_len = text.len()))]
pub fn extract_local(text: &str) -> StructuredAnswer {
  let compact = compact(text);
  let runs = digit_runs(&compact);
  let ops = separator_ops(&compact, &runs);

  let answer = if ops.is_empty() {
    story_form(text)
  } else if ops.iter().any(|op| *op != ops[0]) {
    let numbers = runs.iter().map(|r| compact[r.clone()].to_string()).collect();
    Some(mixed_answer(numbers, text))
  } else {
    Some(equation_form(&compact, &runs, text))
  };

  answer.unwrap_or_else(|| {
    warn!(target: "extractor", "numbers out of range; using fallback answer");
    StructuredAnswer::fallback(text)
  })
}

/// Extractor with an optional LLM collaborator for unknown/mixed problems.
#[derive(Clone, Default)]
pub struct Extractor {
  analyzer: Option<Arc<dyn MathAnalyzer>>,
  timeout: Option<Duration>,
}

impl Extractor {
  pub fn new(analyzer: Option<Arc<dyn MathAnalyzer>>, timeout: Duration) -> Self {
    Self { analyzer, timeout: Some(timeout) }
  }

  pub fn has_analyzer(&self) -> bool {
    self.analyzer.is_some()
  }

  pub fn analyzer(&self) -> Option<&Arc<dyn MathAnalyzer>> {
    self.analyzer.as_ref()
  }

  /// Full extraction: local heuristics, then LLM override when needed and available.
  #[instrument(level = "info", target = "extractor", skip(self, text), fields(text_len = text.len()))]
  pub async fn extract(&self, text: &str) -> ExtractionOutcome {
    let local = extract_local(text);
    if !local.operator.needs_llm() {
      return ExtractionOutcome::Local(local);
    }
    let Some(analyzer) = &self.analyzer else {
      debug!(target: "extractor", operator = %local.operator, "LLM not configured; keeping local answer");
      return ExtractionOutcome::Local(local);
    };

    let call = analyzer.analyze_problem(text);
    let result = match self.timeout {
      Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or(Err(LlmError::Timeout(limit))),
      None => call.await,
    };

    match result {
      Ok(analysis) => {
        let operator = Operator::parse(&analysis.operator).unwrap_or(Operator::Unknown);
        let operands: Vec<String> = analysis.angka_dalam_soal.split(',').map(|s| s.trim().to_string()).collect();
        info!(target: "extractor", %operator, confidence = ?analysis.confidence, "LLM analysis replaced local answer");
        ExtractionOutcome::Enhanced {
          answer: StructuredAnswer { operator, operands, result: analysis.jawaban, source_text: local.source_text },
          confidence: analysis.confidence,
          explanation: analysis.penjelasan,
        }
      }
      Err(e) => {
        warn!(target: "extractor", error = %e, "LLM analysis failed; keeping local answer");
        ExtractionOutcome::Local(local)
      }
    }
  }

  /// Direct LLM analysis for diagnostics; `MissingApiKey` when no collaborator is set.
  pub async fn analyze_with_llm(&self, text: &str) -> Result<crate::llm::LlmAnalysis, LlmError> {
    let analyzer = self.analyzer.as_ref().ok_or(LlmError::MissingApiKey)?;
    match self.timeout {
      Some(limit) => tokio::time::timeout(limit, analyzer.analyze_problem(text))
        .await
        .unwrap_or(Err(LlmError::Timeout(limit))),
      None => analyzer.analyze_problem(text).await,
    }
  }
}
