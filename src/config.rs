//! Loading service configuration (LLM call policy + prompts) from TOML.
//!
//! See `AppConfig`, `LlmSettings` and `Prompts` for the expected schema. Every key
//! is optional; missing keys take the defaults below.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read { path: String, source: std::io::Error },
  #[error("failed to parse {path}: {source}")]
  Parse { path: String, source: toml::de::Error },
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub llm: LlmSettings,
  #[serde(default)]
  pub prompts: Prompts,
}

/// Call policy for the external LLM collaborator.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
  /// Courtesy delay before every call (external rate limit).
  pub pre_call_delay_ms: u64,
  /// Upper bound for the HTTP request itself, counted after the delay.
  pub timeout_secs: u64,
  pub temperature: f32,
}

impl Default for LlmSettings {
  fn default() -> Self {
    Self { pre_call_delay_ms: 25_000, timeout_secs: 30, temperature: 0.1 }
  }
}

impl LlmSettings {
  pub fn pre_call_delay(&self) -> Duration {
    Duration::from_millis(self.pre_call_delay_ms)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  /// Bound for a whole collaborator call: the courtesy delay plus the request timeout.
  pub fn call_budget(&self) -> Duration {
    self.pre_call_delay().saturating_add(self.timeout())
  }

  /// True when the request timeout is no longer than the courtesy delay.
  pub fn timeout_shorter_than_delay(&self) -> bool {
    self.timeout_secs.saturating_mul(1000) <= self.pre_call_delay_ms
  }
}

/// Prompts used by the LLM client. `{soal}` and `{text}` are substituted.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub math_analysis_system: String,
  pub math_analysis_user_template: String,
  pub pedagogic_system: String,
  pub pedagogic_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      math_analysis_system: "Anda adalah guru matematika sekolah dasar. Jawab HANYA dengan satu objek JSON.".into(),
      math_analysis_user_template: r#"Analisis soal matematika berikut ini dengan teliti.

Soal: "{soal}"

Tugas:
1. Identifikasi operator (Penjumlahan, Pengurangan, Perkalian, Pembagian, atau Mix jika lebih dari satu)
2. Ekstrak semua angka yang relevan dalam soal
3. Hitung jawaban yang benar
4. Berikan tingkat kepercayaan analisis (high, medium, low)

Format JSON:
{"operator": "Penjumlahan|Pengurangan|Perkalian|Pembagian|Mix", "angka_dalam_soal": "angka1,angka2", "jawaban": "hasil", "penjelasan": "penjelasan singkat", "confidence": "high|medium|low", "operasi_detail": "langkah perhitungan jika Mix"}

Contoh: "Ana membeli 3 kotak permen, setiap kotak berisi 5 permen, kemudian membagikan 10 permen" -> {"operator": "Mix", "angka_dalam_soal": "3,5,10", "jawaban": "5", "operasi_detail": "3x5=15, 15-10=5"}"#.into(),
      pedagogic_system: "Anda adalah ahli pedagogik untuk siswa sekolah dasar. Tulis narasi singkat, bukan JSON.".into(),
      pedagogic_user_template: r#"Kompetensi: mengenali operand 1, operand 2 dan operator, serta mengoperasikan penjumlahan/pengurangan bilangan cacah (hingga 20, 100, 1000) dan perkalian/pembagian hingga 100.

Teks jawaban atau narasi siswa:
"{text}"

Buat analisis pedagogik dalam satu atau dua paragraf beserta rekomendasi pembelajaran."#.into(),
    }
  }
}

/// Parse a TOML document into `AppConfig`.
pub fn parse_config(path: &str, raw: &str) -> Result<AppConfig, ConfigError> {
  toml::from_str::<AppConfig>(raw).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

pub fn load_config_file(path: &str) -> Result<AppConfig, ConfigError> {
  let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
  parse_config(path, &raw)
}

/// Load `AppConfig` from SCORING_CONFIG_PATH. Missing variable or any error yields defaults.
pub fn load_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("SCORING_CONFIG_PATH") else {
    return AppConfig::default();
  };
  match load_config_file(&path) {
    Ok(cfg) => {
      info!(target: "exam_scoring", %path, "Loaded scoring config (TOML)");
      if cfg.llm.timeout_shorter_than_delay() {
        warn!(
          target: "exam_scoring",
          %path,
          timeout_secs = cfg.llm.timeout_secs,
          pre_call_delay_ms = cfg.llm.pre_call_delay_ms,
          "llm.timeout_secs is not longer than llm.pre_call_delay_ms; slow replies will time out"
        );
      }
      cfg
    }
    Err(e) => {
      error!(target: "exam_scoring", %path, error = %e, "Config unusable; using defaults");
      AppConfig::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_gives_defaults() {
    let cfg = parse_config("inline", "").unwrap();
    assert_eq!(cfg.llm.pre_call_delay_ms, 25_000);
    assert_eq!(cfg.llm.timeout(), Duration::from_secs(30));
    assert!(cfg.prompts.math_analysis_user_template.contains("{soal}"));
  }

  #[test]
  fn partial_tables_keep_other_defaults() {
    let cfg = parse_config("inline", "[llm]\npre_call_delay_ms = 0\n[prompts]\npedagogic_system = \"x\"\n").unwrap();
    assert_eq!(cfg.llm.pre_call_delay(), Duration::ZERO);
    assert_eq!(cfg.llm.timeout_secs, 30);
    assert_eq!(cfg.prompts.pedagogic_system, "x");
    assert!(cfg.prompts.pedagogic_user_template.contains("{text}"));
  }

  #[test]
  fn call_budget_starts_the_timeout_after_the_delay() {
    let llm = LlmSettings::default();
    assert_eq!(llm.call_budget(), Duration::from_secs(55));
    assert!(!llm.timeout_shorter_than_delay());

    let tight = parse_config("inline", "[llm]\npre_call_delay_ms = 30000\ntimeout_secs = 30\n").unwrap();
    assert!(tight.llm.timeout_shorter_than_delay());
    assert_eq!(tight.llm.call_budget(), Duration::from_secs(60));
  }

  #[test]
  fn malformed_toml_is_a_parse_error() {
    let err = parse_config("bad.toml", "[llm\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("bad.toml"));
  }

  #[test]
  fn missing_file_is_a_read_error() {
    let err = load_config_file("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }
}
