//! LLM collaborator for problems the local heuristics cannot classify.
//!
//! `MathAnalyzer` is the seam the extractor depends on; `LlmClient` is the
//! production implementation talking to an OpenAI-compatible chat.completions
//! endpoint (Gemini's compatibility endpoint by default).
//!
//! NOTE: We never log the API key; prompts and raw replies are truncated in logs.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::{LlmSettings, Prompts};
use crate::domain::{Confidence, Operator};
use crate::protocol::Scalar;
use crate::util::{fill_template, trunc_for_log};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error)]
pub enum LlmError {
  #[error("GEMINI_API_KEY not found in environment variables")]
  MissingApiKey,
  #[error("LLM request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("LLM HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("no JSON found in LLM response")]
  NoJson,
  #[error("failed to parse LLM JSON response: {0}")]
  Json(#[from] serde_json::Error),
  #[error("missing required fields in LLM response: operator, angka_dalam_soal, jawaban")]
  MissingFields,
  #[error("LLM call timed out after {0:?}")]
  Timeout(Duration),
}

/// Structured analysis returned by the collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct LlmAnalysis {
  /// Label as given by the model (e.g. "Perkalian", "Mix").
  pub operator: String,
  /// Comma-joined operands.
  pub angka_dalam_soal: String,
  pub jawaban: String,
  pub penjelasan: String,
  pub confidence: Confidence,
  pub operasi_detail: String,
}

#[async_trait]
pub trait MathAnalyzer: Send + Sync {
  /// Analyze a raw problem statement.
  async fn analyze_problem(&self, text: &str) -> Result<LlmAnalysis, LlmError>;

  /// Free-form pedagogic narrative about a student's text.
  async fn pedagogic_narrative(&self, text: &str) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct LlmClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub settings: LlmSettings,
  pub prompts: Prompts,
}

impl LlmClient {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env(settings: &LlmSettings, prompts: &Prompts) -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    Self::new(api_key, base_url, model, settings.clone(), prompts.clone()).ok()
  }

  pub fn new(api_key: String, base_url: String, model: String, settings: LlmSettings, prompts: Prompts) -> Result<Self, LlmError> {
    let client = reqwest::Client::builder().timeout(settings.timeout()).build()?;
    let base_url = base_url.trim_end_matches('/').to_string();
    Ok(Self { client, api_key, base_url, model, settings, prompts })
  }

  /// Plain-text chat completion, preceded by the courtesy delay.
  #[instrument(level = "info", target = "llm", skip(self, system, user), fields(model = %self.model))]
  async fn chat_text(&self, system: &str, user: &str) -> Result<String, LlmError> {
    let delay = self.settings.pre_call_delay();
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }

    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: self.settings.temperature,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "exam-scoring-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or(body);
      error!(target: "llm", status, elapsed = ?start.elapsed(), "LLM call rejected");
      return Err(LlmError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "llm", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "LLM usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();
    info!(target: "llm", elapsed = ?start.elapsed(), reply_len = text.len(), "LLM reply received");
    Ok(text)
  }
}

#[async_trait]
impl MathAnalyzer for LlmClient {
  #[instrument(level = "info", target = "llm", skip(self, text), fields(text_len = text.len()))]
  async fn analyze_problem(&self, text: &str) -> Result<LlmAnalysis, LlmError> {
    let user = fill_template(&self.prompts.math_analysis_user_template, &[("soal", text)]);
    let reply = self.chat_text(&self.prompts.math_analysis_system, &user).await?;
    let parsed = parse_analysis(&reply);
    if let Err(e) = &parsed {
      warn!(target: "llm", error = %e, reply = %trunc_for_log(&reply, 200), "Unusable LLM analysis");
    }
    parsed
  }

  #[instrument(level = "info", target = "llm", skip(self, text), fields(text_len = text.len()))]
  async fn pedagogic_narrative(&self, text: &str) -> Result<String, LlmError> {
    let user = fill_template(&self.prompts.pedagogic_user_template, &[("text", text)]);
    self.chat_text(&self.prompts.pedagogic_system, &user).await
  }
}

// -------- Reply parsing --------

#[derive(Deserialize)]
struct RawAnalysis {
  operator: Option<Scalar>,
  angka_dalam_soal: Option<Scalar>,
  jawaban: Option<Scalar>,
  #[serde(default)] penjelasan: Option<String>,
  #[serde(default)] confidence: Option<String>,
  #[serde(default)] operasi_detail: Option<String>,
}

fn json_block() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Pull the first `{...}` block out of a model reply and validate it.
pub fn parse_analysis(reply: &str) -> Result<LlmAnalysis, LlmError> {
  let block = json_block().find(reply).ok_or(LlmError::NoJson)?;
  let raw: RawAnalysis = serde_json::from_str(block.as_str())?;

  let (Some(operator), Some(angka), Some(jawaban)) = (raw.operator, raw.angka_dalam_soal, raw.jawaban) else {
    return Err(LlmError::MissingFields);
  };
  let operator = operator.into_text();
  let mut angka_dalam_soal = angka.into_text();
  // A lone operand gets the same "0" placeholder the local extractor uses.
  if !angka_dalam_soal.contains(',') && Operator::parse(&operator) != Some(Operator::Mixed) {
    angka_dalam_soal.push_str(",0");
  }

  Ok(LlmAnalysis {
    operator,
    angka_dalam_soal,
    jawaban: jawaban.into_text(),
    penjelasan: raw.penjelasan.unwrap_or_default(),
    confidence: raw.confidence.as_deref().map(Confidence::parse).unwrap_or_default(),
    operasi_detail: raw.operasi_detail.unwrap_or_default(),
  })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_json_wrapped_in_prose_and_fences() {
    let reply = "Berikut hasilnya:\n```json\n{\"operator\": \"Perkalian\", \"angka_dalam_soal\": \"4,2000\", \"jawaban\": 8000, \"confidence\": \"high\"}\n```";
    let a = parse_analysis(reply).unwrap();
    assert_eq!(a.operator, "Perkalian");
    assert_eq!(a.angka_dalam_soal, "4,2000");
    assert_eq!(a.jawaban, "8000");
    assert_eq!(a.confidence, Confidence::High);
    assert_eq!(a.penjelasan, "");
  }

  #[test]
  fn single_operand_is_padded_unless_mixed() {
    let a = parse_analysis(r#"{"operator":"Penjumlahan","angka_dalam_soal":"7","jawaban":"7"}"#).unwrap();
    assert_eq!(a.angka_dalam_soal, "7,0");
    assert_eq!(a.confidence, Confidence::Medium);

    let m = parse_analysis(r#"{"operator":"Mix","angka_dalam_soal":"15","jawaban":"5"}"#).unwrap();
    assert_eq!(m.angka_dalam_soal, "15");
  }

  #[test]
  fn missing_fields_are_rejected() {
    let err = parse_analysis(r#"{"operator":"Mix","jawaban":"5"}"#).unwrap_err();
    assert!(matches!(err, LlmError::MissingFields));
  }

  #[test]
  fn replies_without_json_are_rejected() {
    assert!(matches!(parse_analysis("maaf, saya tidak tahu"), Err(LlmError::NoJson)));
    assert!(matches!(parse_analysis("{operator: Mix}"), Err(LlmError::Json(_))));
  }

  #[test]
  fn api_error_message_is_extracted() {
    let body = r#"{"error":{"message":"API key not valid","code":400}}"#;
    assert_eq!(extract_api_error(body).as_deref(), Some("API key not valid"));
    assert_eq!(extract_api_error("<html>"), None);
  }
}
