//! Application state: loaded config plus the extractor and its optional LLM collaborator.
//!
//! Everything here is read-only after startup, so handlers share it behind an `Arc`
//! without locks.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_config_from_env, AppConfig};
use crate::extractor::Extractor;
use crate::llm::{LlmClient, MathAnalyzer};

#[derive(Clone)]
pub struct AppState {
  pub config: AppConfig,
  pub extractor: Extractor,
  /// Model name when the LLM is enabled; reported by the status endpoint.
  pub llm_model: Option<String>,
}

impl AppState {
  /// Build state from env: load config, then init the LLM client if GEMINI_API_KEY is set.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let config = load_config_from_env();

    let client = LlmClient::from_env(&config.llm, &config.prompts);
    let llm_model = client.as_ref().map(|c| c.model.clone());
    match &client {
      Some(c) => info!(
        target: "exam_scoring",
        base_url = %c.base_url,
        model = %c.model,
        pre_call_delay_ms = config.llm.pre_call_delay_ms,
        "LLM enabled."
      ),
      None => info!(target: "exam_scoring", "LLM disabled (no GEMINI_API_KEY). Using local heuristics only."),
    }

    let analyzer = client.map(|c| Arc::new(c) as Arc<dyn MathAnalyzer>);
    Self::with_analyzer(config, analyzer, llm_model)
  }

  /// Assemble state around an explicit collaborator (or none).
  pub fn with_analyzer(config: AppConfig, analyzer: Option<Arc<dyn MathAnalyzer>>, llm_model: Option<String>) -> Self {
    let extractor = Extractor::new(analyzer, config.llm.call_budget());
    Self { config, extractor, llm_model }
  }

  pub fn llm_enabled(&self) -> bool {
    self.extractor.has_analyzer()
  }
}
