//! Answer comparison and 4-point partial-credit scoring.
//!
//! Both sides are normalized independently (operator synonyms, trimmed operand
//! tokens, integer-truncated result) and then compared field by field in the
//! fixed order operator, operand 1, operand 2, result. Every input, including
//! empty records, produces a verdict.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::difficulty::{classify, DifficultyInfo};
use crate::domain::{AnswerField, Operator, StatusLabel, StructuredAnswer};

pub const MAX_SCORE: u8 = 4;

/// Operands as received: already comma-joined, or as a list of tokens.
#[derive(Clone, Debug, PartialEq)]
pub enum Operands {
  Joined(String),
  List(Vec<String>),
}

/// One side of a comparison in wire terms (`operator`, `angka_dalam_soal`, `jawaban`).
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerRecord {
  pub operator: String,
  pub operands: Operands,
  pub result: String,
}

impl Default for AnswerRecord {
  fn default() -> Self {
    Self {
      operator: Operator::Unknown.label().into(),
      operands: Operands::Joined("0,0".into()),
      result: String::new(),
    }
  }
}

impl From<&StructuredAnswer> for AnswerRecord {
  fn from(a: &StructuredAnswer) -> Self {
    Self {
      operator: a.operator.label().into(),
      operands: Operands::List(a.operands.clone()),
      result: a.result.clone(),
    }
  }
}

/// Value object produced by every comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonResult {
  pub status: StatusLabel,
  pub deskripsi_analisis: String,
  pub nilai: u8,
  pub nilai_maksimal: u8,
  pub persentase: f64,
  pub parameter_salah: Vec<AnswerField>,
  pub parameter_benar: Vec<AnswerField>,
  pub koreksi: Vec<String>,
  pub difficulty_analysis: DifficultyInfo,
}

impl ComparisonResult {
  /// Three or more points count as a correct answer.
  pub fn is_passing(&self) -> bool {
    self.nilai >= 3
  }
}

// -------- Normalization --------

/// Lowercase + trim + synonym table; unrecognized strings are capitalized.
pub fn normalize_operator(raw: &str) -> String {
  match Operator::parse(raw) {
    Some(op) => op.label().to_string(),
    None => capitalize(&raw.trim().to_lowercase()),
  }
}

/// Trimmed tokens joined by commas, preserving order.
pub fn normalize_operands(operands: &Operands) -> String {
  match operands {
    Operands::Joined(s) => s.split(',').map(str::trim).collect::<Vec<_>>().join(","),
    Operands::List(items) => items.iter().map(|t| t.trim()).collect::<Vec<_>>().join(","),
  }
}

/// Numeric results are truncated to an integer string; anything else is trimmed.
pub fn normalize_result(raw: &str) -> String {
  let s = raw.trim();
  match s.parse::<f64>() {
    // + 0.0 folds -0 into 0
    Ok(v) if v.is_finite() => format!("{:.0}", v.trunc() + 0.0),
    _ => s.to_string(),
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[derive(Debug)]
struct Normalized {
  operator: String,
  operands: String,
  result: String,
}

impl Normalized {
  fn of(rec: &AnswerRecord) -> Self {
    Self {
      operator: normalize_operator(&rec.operator),
      operands: normalize_operands(&rec.operands),
      result: normalize_result(&rec.result),
    }
  }
}

// -------- Scoring --------

/// Score `submission` against `key`.
#[instrument(level = "debug", target = "scoring", skip_all)]
pub fn compare(key: &AnswerRecord, submission: &AnswerRecord) -> ComparisonResult {
  let key = Normalized::of(key);
  let sub = Normalized::of(submission);
  debug!(target: "scoring", ?key, ?sub, "normalized answers");

  let key_ops: Vec<&str> = key.operands.split(',').collect();
  let sub_ops: Vec<&str> = sub.operands.split(',').collect();

  let mut benar = Vec::with_capacity(4);
  let mut salah = Vec::with_capacity(4);
  let mut koreksi = Vec::new();

  let mut mark = |field: AnswerField, ok: bool, correct_value: &str| {
    if ok {
      benar.push(field);
    } else {
      salah.push(field);
      koreksi.push(format!("{} yang benar adalah {}", field.title(), correct_value));
    }
  };

  mark(AnswerField::Operator, key.operator == sub.operator, &key.operator);

  // split(',') always yields at least one token.
  let key_first = key_ops[0];
  mark(AnswerField::Operand1, sub_ops[0] == key_first, key_first);

  let (ok, expected) = match (key_ops.get(1), sub_ops.get(1)) {
    (Some(k), Some(s)) => (k == s, *k),
    (Some(k), None) => (false, *k),
    (None, Some(s)) => (*s == "0", "0"),
    (None, None) => (true, "0"),
  };
  mark(AnswerField::Operand2, ok, expected);

  mark(AnswerField::Result, key.result == sub.result, &key.result);

  let nilai = benar.len() as u8;
  let difficulty = classify(&key.operator, &key_ops);
  let deskripsi = describe(nilai, &benar, &salah, &difficulty);

  ComparisonResult {
    status: StatusLabel::from_score(nilai),
    deskripsi_analisis: deskripsi,
    nilai,
    nilai_maksimal: MAX_SCORE,
    persentase: percentage(nilai),
    parameter_salah: salah,
    parameter_benar: benar,
    koreksi,
    difficulty_analysis: difficulty,
  }
}

/// Convenience for two extractor outputs.
pub fn compare_answers(key: &StructuredAnswer, submission: &StructuredAnswer) -> ComparisonResult {
  compare(&AnswerRecord::from(key), &AnswerRecord::from(submission))
}

pub fn percentage(score: u8) -> f64 {
  f64::from(score) / f64::from(MAX_SCORE) * 100.0
}

fn describe(nilai: u8, benar: &[AnswerField], salah: &[AnswerField], difficulty: &DifficultyInfo) -> String {
  let context = format!(" pada {}", difficulty.description);
  let correct_aspects = || {
    AnswerField::ALL
      .iter()
      .filter(|f| benar.contains(*f))
      .map(|f| f.aspect())
      .collect::<Vec<_>>()
      .join(", ")
  };

  match nilai {
    0 => {
      // operands first, then operator, then result
      let detail = [AnswerField::Operand1, AnswerField::Operand2, AnswerField::Operator, AnswerField::Result]
        .iter()
        .filter(|f| salah.contains(*f))
        .map(|f| format!("{} salah", f.aspect()))
        .collect::<Vec<_>>()
        .join(", ");
      format!("Siswa belum menjawab dengan benar semua aspek soal (0/4 poin){context}. {detail}")
    }
    1 => format!("Siswa hanya menjawab benar 1 dari 4 aspek: {} (1/4 poin){context}", correct_aspects()),
    2 | 3 => format!("Siswa menjawab benar {nilai} dari 4 aspek: {} ({nilai}/4 poin){context}", correct_aspects()),
    _ => format!("Siswa telah menjawab dengan benar semua aspek soal (4/4 poin){context}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rec(op: &str, operands: &str, result: &str) -> AnswerRecord {
    AnswerRecord { operator: op.into(), operands: Operands::Joined(operands.into()), result: result.into() }
  }

  #[test]
  fn perfect_answer_scores_four() {
    let r = compare(&rec("Penjumlahan", "3,2", "5"), &rec("Penjumlahan", "3,2", "5"));
    assert_eq!(r.nilai, 4);
    assert_eq!(r.status, StatusLabel::Excellent);
    assert_eq!(r.persentase, 100.0);
    assert_eq!(r.parameter_benar, AnswerField::ALL.to_vec());
    assert!(r.parameter_salah.is_empty());
    assert!(r.koreksi.is_empty());
    assert!(r.is_passing());
  }

  #[test]
  fn wrong_result_scores_three() {
    let r = compare(&rec("Penjumlahan", "3,2", "5"), &rec("Penjumlahan", "3,2", "6"));
    assert_eq!(r.nilai, 3);
    assert_eq!(r.status, StatusLabel::Good);
    assert_eq!(r.parameter_salah, vec![AnswerField::Result]);
    assert_eq!(r.koreksi, vec!["Jawaban yang benar adalah 5".to_string()]);
    assert_eq!(r.persentase, 75.0);
  }

  #[test]
  fn everything_wrong_scores_zero() {
    let r = compare(&rec("Penjumlahan", "3,2", "5"), &rec("Pengurangan", "4,5", "10"));
    assert_eq!(r.nilai, 0);
    assert_eq!(r.status, StatusLabel::Incorrect);
    assert_eq!(r.parameter_salah.len(), 4);
    assert_eq!(r.koreksi.len(), 4);
    assert!(r.koreksi[0].starts_with("Operator yang benar"));
    assert!(r.koreksi[1].starts_with("Operan 1 yang benar"));
    assert!(r.koreksi[2].starts_with("Operan 2 yang benar"));
    assert!(r.koreksi[3].starts_with("Jawaban yang benar"));
    assert!(r.deskripsi_analisis.contains("(0/4 poin)"));
    assert!(r.deskripsi_analisis.ends_with("operan 1 salah, operan 2 salah, operator salah, jawaban salah"));
  }

  #[test]
  fn operator_synonyms_are_equivalent() {
    let cases = [("Penjumlahan", "+"), ("Perkalian", "x"), ("Perkalian", "*"), ("Perkalian", "×"),
                 ("Pembagian", "/"), ("Pembagian", ":"), ("Pembagian", "÷"), ("Pengurangan", " - ")];
    for (label, sym) in cases {
      let r = compare(&rec(label, "6,3", "1"), &rec(sym, "6,3", "1"));
      assert_eq!(r.nilai, 4, "{label} vs {sym}");
    }
  }

  #[test]
  fn unknown_operators_compare_by_capitalized_text() {
    assert_eq!(normalize_operator("  moDULO "), "Modulo");
    let r = compare(&rec("modulo", "7,2", "1"), &rec("MODULO", "7,2", "1"));
    assert!(r.parameter_benar.contains(&AnswerField::Operator));
  }

  #[test]
  fn numeric_results_tolerate_formatting() {
    for v in ["8", "8.0", " 8 ", "8.4"] {
      assert_eq!(normalize_result(v), "8", "{v:?}");
    }
    assert_eq!(normalize_result("-3.7"), "-3");
    assert_eq!(normalize_result("-0.3"), "0");
    assert_eq!(normalize_result(" Tak terdefinisi "), "Tak terdefinisi");
    assert_eq!(normalize_result("nan"), "nan");
  }

  #[test]
  fn operand_tokens_are_trimmed_and_ordered() {
    assert_eq!(normalize_operands(&Operands::Joined(" 3 , 2 ".into())), "3,2");
    assert_eq!(normalize_operands(&Operands::List(vec![" 3".into(), "2 ".into()])), "3,2");
    let r = compare(&rec("+", "3,2", "5"), &rec("+", "2,3", "5"));
    assert_eq!(r.parameter_salah, vec![AnswerField::Operand1, AnswerField::Operand2]);
    assert_eq!(r.nilai, 2);
    assert_eq!(r.status, StatusLabel::Fair);
    assert_eq!(r.deskripsi_analisis, "Siswa menjawab benar 2 dari 4 aspek: operator, jawaban (2/4 poin) pada Penjumlahan bilangan cacah hingga 20");
  }

  #[test]
  fn missing_second_operand_is_never_lenient() {
    let r = compare(&rec("+", "3,2", "5"), &rec("+", "3", "5"));
    assert_eq!(r.parameter_salah, vec![AnswerField::Operand2]);
    assert_eq!(r.koreksi, vec!["Operan 2 yang benar adalah 2".to_string()]);

    let both_single = compare(&rec("+", "3", "3"), &rec("+", "3", "3"));
    assert_eq!(both_single.nilai, 4);
  }

  #[test]
  fn single_point_description_names_the_aspect() {
    let r = compare(&rec("Perkalian", "6,4", "24"), &rec("Penjumlahan", "6,5", "11"));
    assert_eq!(r.nilai, 1);
    assert_eq!(r.status, StatusLabel::Poor);
    assert_eq!(r.deskripsi_analisis, "Siswa hanya menjawab benar 1 dari 4 aspek: operan 1 (1/4 poin) pada Perkalian bilangan cacah hingga 100");
  }

  #[test]
  fn flipping_one_field_moves_score_by_one() {
    let key = rec("Perkalian", "6,4", "24");
    let base = compare(&key, &key);
    let flips = [rec("Pembagian", "6,4", "24"), rec("Perkalian", "7,4", "24"), rec("Perkalian", "6,5", "24"), rec("Perkalian", "6,4", "25")];
    for (flip, field) in flips.iter().zip(AnswerField::ALL) {
      let r = compare(&key, flip);
      assert_eq!(r.nilai + 1, base.nilai);
      assert_eq!(r.parameter_salah, vec![field]);
      assert!(!r.parameter_benar.contains(&field));
    }
  }

  #[test]
  fn status_and_percentage_follow_score() {
    let key = rec("Pengurangan", "9,4", "5");
    let subs = [rec("+", "1,1", "1"), rec("-", "1,1", "1"), rec("-", "9,1", "1"), rec("-", "9,4", "1"), rec("-", "9,4", "5")];
    for sub in &subs {
      let r = compare(&key, sub);
      assert_eq!(r.status, StatusLabel::from_score(r.nilai));
      assert_eq!(r.persentase, f64::from(r.nilai) / 4.0 * 100.0);
      assert_eq!(r.parameter_benar.len() + r.parameter_salah.len(), 4);
    }
  }

  #[test]
  fn empty_records_are_scored_not_rejected() {
    let r = compare(&AnswerRecord::default(), &rec("", "", ""));
    assert_eq!(r.nilai_maksimal, 4);
    assert_eq!(r.nilai, 1, "only the empty results agree");
    assert_eq!(r.parameter_benar, vec![AnswerField::Result]);
  }

  #[test]
  fn is_deterministic() {
    let key = rec("Pembagian", "48,6", "8");
    let sub = rec(":", "48, 6", "8.0");
    assert_eq!(compare(&key, &sub), compare(&key, &sub));
    assert_eq!(compare(&key, &sub).nilai, 4);
  }

  #[test]
  fn difficulty_describes_the_key() {
    let r = compare(&rec("Penjumlahan", "500,300", "800"), &rec("Penjumlahan", "1,1", "2"));
    assert_eq!(r.difficulty_analysis.complexity_score, 3);
    assert!(r.deskripsi_analisis.contains(&r.difficulty_analysis.description));
  }

  #[test]
  fn structured_answers_compare_directly() {
    let key = StructuredAnswer {
      operator: Operator::Addition,
      operands: vec!["3".into(), "2".into()],
      result: "5".into(),
      source_text: "3+2=5".into(),
    };
    let mut sub = key.clone();
    sub.source_text = "tiga tambah dua".into();
    assert_eq!(compare_answers(&key, &sub).nilai, 4);
  }
}
