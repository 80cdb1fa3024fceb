//! Magnitude-based difficulty classification of a reference problem.
//!
//! The bucket only looks at the largest parseable operand and the operation
//! class; it never looks at a submission.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::Operator;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
  Dasar,
  Menengah,
  Lanjut,
  SangatLanjut,
  Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyCategory {
  Elementary,
  Intermediate,
  Advanced,
  Expert,
  Invalid,
}

/// `difficulty_analysis` record attached to every comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DifficultyInfo {
  pub level: DifficultyLevel,
  pub description: String,
  pub category: DifficultyCategory,
  pub max_number: i64,
  pub complexity_score: u8,
}

impl DifficultyInfo {
  fn new(level: DifficultyLevel, category: DifficultyCategory, description: String, max_number: i64, complexity_score: u8) -> Self {
    Self { level, description, category, max_number, complexity_score }
  }
}

/// Classify by operation label and operands. Unparseable operands are skipped.
#[instrument(level = "debug", target = "scoring", skip(operands), fields(n_operands = operands.len()))]
pub fn classify<S: AsRef<str>>(operator: &str, operands: &[S]) -> DifficultyInfo {
  use DifficultyCategory::*;
  use DifficultyLevel::*;

  let max_number = operands
    .iter()
    .filter_map(|s| s.as_ref().trim().parse::<i64>().ok())
    .max();

  let Some(max_number) = max_number else {
    return DifficultyInfo::new(Unknown, Invalid, "Tidak dapat menentukan tingkat kesulitan".into(), 0, 0);
  };

  let info = match Operator::parse(operator) {
    Some(op @ (Operator::Addition | Operator::Subtraction)) => {
      let name = op.label();
      if max_number <= 20 {
        DifficultyInfo::new(Dasar, Elementary, format!("{name} bilangan cacah hingga 20"), max_number, 1)
      } else if max_number <= 100 {
        DifficultyInfo::new(Menengah, Intermediate, format!("{name} bilangan cacah hingga 100"), max_number, 2)
      } else if max_number <= 1000 {
        DifficultyInfo::new(Lanjut, Advanced, format!("{name} bilangan cacah hingga 1000"), max_number, 3)
      } else {
        DifficultyInfo::new(SangatLanjut, Expert, format!("{name} bilangan cacah di atas 1000"), max_number, 4)
      }
    }
    Some(op @ (Operator::Multiplication | Operator::Division)) => {
      let name = op.label();
      if max_number <= 100 {
        DifficultyInfo::new(Dasar, Elementary, format!("{name} bilangan cacah hingga 100"), max_number, 2)
      } else {
        DifficultyInfo::new(Lanjut, Advanced, format!("{name} bilangan cacah di atas 100"), max_number, 3)
      }
    }
    _ => DifficultyInfo::new(Unknown, Invalid, "Operasi tidak dikenali".into(), max_number, 0),
  };

  debug!(target: "scoring", level = ?info.level, max_number, "difficulty classified");
  info
}
