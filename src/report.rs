//! Aggregate views over comparison verdicts and class grades.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::comparator::ComparisonResult;
use crate::domain::{AnswerField, StatusLabel};

fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

fn pct(part: usize, whole: usize) -> f64 {
  if whole == 0 { 0.0 } else { round2(part as f64 / whole as f64 * 100.0) }
}

/// How often each field was marked wrong.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CommonMistakes {
  pub operator_salah: usize,
  pub operan_1_salah: usize,
  pub operan_2_salah: usize,
  pub jawaban_salah: usize,
}

impl CommonMistakes {
  fn record(&mut self, field: AnswerField) {
    match field {
      AnswerField::Operator => self.operator_salah += 1,
      AnswerField::Operand1 => self.operan_1_salah += 1,
      AnswerField::Operand2 => self.operan_2_salah += 1,
      AnswerField::Result => self.jawaban_salah += 1,
    }
  }
}

/// Percentages of correct fields across all verdicts.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SkillAnalysis {
  pub operator_mastery: f64,
  /// Operand points earned over operand points available (two per answer).
  pub calculation_accuracy: f64,
  pub problem_solving: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoringSummary {
  pub total_jawaban_analyzed: usize,
  pub average_score: f64,
  pub average_percentage: f64,
  /// Verdicts with at least 3 of 4 points.
  pub passing_count: usize,
  pub status_distribution: BTreeMap<StatusLabel, usize>,
  pub common_mistakes: CommonMistakes,
  pub skill_analysis: SkillAnalysis,
}

impl ScoringSummary {
  pub fn from_results(results: &[ComparisonResult]) -> Self {
    let total = results.len();
    if total == 0 {
      return Self::default();
    }

    let mut mistakes = CommonMistakes::default();
    let mut status_distribution = BTreeMap::new();
    for r in results {
      *status_distribution.entry(r.status).or_insert(0) += 1;
      for f in &r.parameter_salah {
        mistakes.record(*f);
      }
    }

    let score_sum: f64 = results.iter().map(|r| f64::from(r.nilai)).sum();
    let pct_sum: f64 = results.iter().map(|r| r.persentase).sum();
    let operand_errors = mistakes.operan_1_salah + mistakes.operan_2_salah;

    Self {
      total_jawaban_analyzed: total,
      average_score: round2(score_sum / total as f64),
      average_percentage: round2(pct_sum / total as f64),
      passing_count: results.iter().filter(|r| r.is_passing()).count(),
      status_distribution,
      skill_analysis: SkillAnalysis {
        operator_mastery: pct(total - mistakes.operator_salah, total),
        calculation_accuracy: pct(2 * total - operand_errors, 2 * total),
        problem_solving: pct(total - mistakes.jawaban_salah, total),
      },
      common_mistakes: mistakes,
    }
  }
}

/// Grade buckets: tinggi (>= 80), menengah (60..80), rendah (< 60).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassPerformance {
  pub total_siswa: usize,
  pub nilai_tinggi: usize,
  pub nilai_menengah: usize,
  pub nilai_rendah: usize,
  pub persentase_tinggi: f64,
  pub persentase_menengah: f64,
  pub persentase_rendah: f64,
}

impl ClassPerformance {
  pub fn from_grades(grades: &[f64]) -> Self {
    let (mut tinggi, mut menengah, mut rendah) = (0, 0, 0);
    for &g in grades {
      if g >= 80.0 {
        tinggi += 1;
      } else if g >= 60.0 {
        menengah += 1;
      } else {
        rendah += 1;
      }
    }
    let total = grades.len();
    Self {
      total_siswa: total,
      nilai_tinggi: tinggi,
      nilai_menengah: menengah,
      nilai_rendah: rendah,
      persentase_tinggi: pct(tinggi, total),
      persentase_menengah: pct(menengah, total),
      persentase_rendah: pct(rendah, total),
    }
  }
}
