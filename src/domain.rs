//! Domain models shared by the extractor and the scoring engine: operator labels,
//! the structured answer tuple, extraction outcomes, scored fields and status labels.

use serde::{Deserialize, Serialize};

/// Placeholder result for problems that need more than one operation.
pub const NEEDS_ANALYSIS: &str = "Perlu analisis lanjutan";
/// Placeholder result when the operator is unknown but two numbers were found.
pub const NOT_COMPUTABLE: &str = "Tidak bisa dihitung";
/// Division-by-zero sentinel.
pub const UNDEFINED: &str = "Tak terdefinisi";

/// Semantic operation of an arithmetic word problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
  #[serde(rename = "Penjumlahan")]
  Addition,
  #[serde(rename = "Pengurangan")]
  Subtraction,
  #[serde(rename = "Perkalian")]
  Multiplication,
  #[serde(rename = "Pembagian")]
  Division,
  #[serde(rename = "Mix")]
  Mixed,
  #[serde(rename = "Tidak diketahui")]
  Unknown,
}

impl Operator {
  /// Canonical (Indonesian) label used on the wire and in diagnostics.
  pub fn label(self) -> &'static str {
    match self {
      Operator::Addition => "Penjumlahan",
      Operator::Subtraction => "Pengurangan",
      Operator::Multiplication => "Perkalian",
      Operator::Division => "Pembagian",
      Operator::Mixed => "Mix",
      Operator::Unknown => "Tidak diketahui",
    }
  }

  /// Map a single equation symbol to its operation.
  pub fn from_symbol(sym: &str) -> Option<Self> {
    match sym {
      "+" => Some(Operator::Addition),
      "-" => Some(Operator::Subtraction),
      "*" | "x" | "X" | "×" => Some(Operator::Multiplication),
      "/" | ":" | "÷" => Some(Operator::Division),
      _ => None,
    }
  }

  /// Lenient parse over symbols, canonical labels and common spellings.
  /// Case and surrounding whitespace are ignored.
  pub fn parse(raw: &str) -> Option<Self> {
    let s = raw.trim().to_lowercase();
    if let Some(op) = Self::from_symbol(&s) {
      return Some(op);
    }
    match s.as_str() {
      "penjumlahan" | "tambah" | "addition" => Some(Operator::Addition),
      "pengurangan" | "kurang" | "subtraction" => Some(Operator::Subtraction),
      "perkalian" | "kali" | "multiplication" => Some(Operator::Multiplication),
      "pembagian" | "bagi" | "division" => Some(Operator::Division),
      "mix" | "campuran" | "mixed" | "complex" => Some(Operator::Mixed),
      "tidak diketahui" | "unknown" => Some(Operator::Unknown),
      _ => None,
    }
  }

  /// Unknown and mixed problems are handed to the LLM collaborator.
  pub fn needs_llm(self) -> bool {
    matches!(self, Operator::Mixed | Operator::Unknown)
  }
}

impl std::fmt::Display for Operator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// The unit exchanged between extractor and comparator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StructuredAnswer {
  pub operator: Operator,
  /// Never empty; a missing second operand is stored as "0".
  pub operands: Vec<String>,
  pub result: String,
  pub source_text: String,
}

impl StructuredAnswer {
  /// Safe answer returned whenever extraction cannot proceed.
  pub fn fallback(text: &str) -> Self {
    Self {
      operator: Operator::Unknown,
      operands: vec!["0".into(), "0".into()],
      result: "0".into(),
      source_text: text.to_string(),
    }
  }

  /// Comma-joined operands, the `angka_dalam_soal` wire form.
  pub fn operands_joined(&self) -> String {
    self.operands.join(",")
  }
}

/// How confident the LLM collaborator claims to be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
  High,
  #[default]
  Medium,
  Low,
}

impl Confidence {
  pub fn parse(raw: &str) -> Self {
    match raw.trim().to_lowercase().as_str() {
      "high" => Confidence::High,
      "low" => Confidence::Low,
      _ => Confidence::Medium,
    }
  }
}

/// Result of running the extractor, with or without the LLM override.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractionOutcome {
  /// Heuristic result only (LLM not needed, not configured, or failed).
  Local(StructuredAnswer),
  /// LLM fields replaced the heuristic operator/operands/result.
  Enhanced {
    answer: StructuredAnswer,
    confidence: Confidence,
    explanation: String,
  },
}

impl ExtractionOutcome {
  pub fn answer(&self) -> &StructuredAnswer {
    match self {
      ExtractionOutcome::Local(a) => a,
      ExtractionOutcome::Enhanced { answer, .. } => answer,
    }
  }

  pub fn into_answer(self) -> StructuredAnswer {
    match self {
      ExtractionOutcome::Local(a) => a,
      ExtractionOutcome::Enhanced { answer, .. } => answer,
    }
  }

  pub fn is_enhanced(&self) -> bool {
    matches!(self, ExtractionOutcome::Enhanced { .. })
  }
}

/// The four independently scored fields, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerField {
  #[serde(rename = "operator")]
  Operator,
  #[serde(rename = "operan_1")]
  Operand1,
  #[serde(rename = "operan_2")]
  Operand2,
  #[serde(rename = "jawaban")]
  Result,
}

impl AnswerField {
  pub const ALL: [AnswerField; 4] = [
    AnswerField::Operator,
    AnswerField::Operand1,
    AnswerField::Operand2,
    AnswerField::Result,
  ];

  /// Human-readable aspect name used inside descriptions.
  pub fn aspect(self) -> &'static str {
    match self {
      AnswerField::Operator => "operator",
      AnswerField::Operand1 => "operan 1",
      AnswerField::Operand2 => "operan 2",
      AnswerField::Result => "jawaban",
    }
  }

  /// Capitalized name used at the start of correction messages.
  pub fn title(self) -> &'static str {
    match self {
      AnswerField::Operator => "Operator",
      AnswerField::Operand1 => "Operan 1",
      AnswerField::Operand2 => "Operan 2",
      AnswerField::Result => "Jawaban",
    }
  }
}

/// Five-way classification derived from the integer score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
  Excellent,
  Good,
  Fair,
  Poor,
  Incorrect,
}

impl StatusLabel {
  pub fn from_score(score: u8) -> Self {
    match score {
      0 => StatusLabel::Incorrect,
      1 => StatusLabel::Poor,
      2 => StatusLabel::Fair,
      3 => StatusLabel::Good,
      _ => StatusLabel::Excellent,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      StatusLabel::Excellent => "excellent",
      StatusLabel::Good => "good",
      StatusLabel::Fair => "fair",
      StatusLabel::Poor => "poor",
      StatusLabel::Incorrect => "incorrect",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn symbols_map_to_one_label_each() {
    for s in ["*", "x", "X", "×"] {
      assert_eq!(Operator::from_symbol(s), Some(Operator::Multiplication));
    }
    for s in ["/", ":", "÷"] {
      assert_eq!(Operator::from_symbol(s), Some(Operator::Division));
    }
    assert_eq!(Operator::from_symbol("="), None);
  }

  #[test]
  fn parse_accepts_labels_and_spellings() {
    assert_eq!(Operator::parse(" Penjumlahan "), Some(Operator::Addition));
    assert_eq!(Operator::parse("MIX"), Some(Operator::Mixed));
    assert_eq!(Operator::parse("Campuran"), Some(Operator::Mixed));
    assert_eq!(Operator::parse("modulo"), None);
  }

  #[test]
  fn status_table_is_total() {
    let labels: Vec<&str> = (0..=4).map(|s| StatusLabel::from_score(s).as_str()).collect();
    assert_eq!(labels, ["incorrect", "poor", "fair", "good", "excellent"]);
  }

  #[test]
  fn field_serializes_with_wire_names() {
    let json = serde_json::to_string(&AnswerField::ALL).unwrap();
    assert_eq!(json, r#"["operator","operan_1","operan_2","jawaban"]"#);
  }
}
