//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
  routing::{get, post},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/api/v1/health", get(http::http_health))
    .route("/api/v1/llm/status", get(http::http_llm_status))
    .route("/api/v1/solve_text", post(http::http_post_solve_text))
    .route("/api/v1/solve_text_simple", post(http::http_post_solve_text_simple))
    .route("/api/v1/compare_answer", post(http::http_post_compare_answer))
    .route("/api/v1/score_text", post(http::http_post_score_text))
    .route("/api/v1/difficulty", post(http::http_post_difficulty))
    .route("/api/v1/analyze_problem", post(http::http_post_analyze_problem))
    .route("/api/v1/pedagogic/analyze_text", post(http::http_post_pedagogic))
    .route("/api/v1/report/batch", post(http::http_post_batch_report))
    .route("/api/v1/report/class", post(http::http_post_class_report))
    .with_state(state)
    .layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any),
    )
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::llm::{LlmAnalysis, LlmError, MathAnalyzer};
  use async_trait::async_trait;
  use axum::body::{to_bytes, Body};
  use axum::http::{Request, StatusCode};
  use serde_json::Value;
  use tower::ServiceExt;

  fn app(analyzer: Option<Arc<dyn MathAnalyzer>>) -> Router {
    let model = analyzer.as_ref().map(|_| "fake-model".to_string());
    build_router(Arc::new(AppState::with_analyzer(AppConfig::default(), analyzer, model)))
  }

  async fn call(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header("content-type", "application/json")
      .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
      .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    // axum rejections are plain text
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
  }

  struct Fake;

  #[async_trait]
  impl MathAnalyzer for Fake {
    async fn analyze_problem(&self, _text: &str) -> Result<LlmAnalysis, LlmError> {
      crate::llm::parse_analysis(r#"{"operator":"Mix","angka_dalam_soal":"3,5,10","jawaban":"5","confidence":"high","penjelasan":"3x5-10"}"#)
    }
    async fn pedagogic_narrative(&self, _text: &str) -> Result<String, LlmError> {
      Ok("Narasi dari model.".into())
    }
  }

  #[tokio::test]
  async fn health_and_llm_status() {
    let (status, body) = call(app(None), "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (_, body) = call(app(None), "GET", "/api/v1/llm/status", None).await;
    assert_eq!(body["llm_available"], false);
    assert!(body.get("model").is_none());

    let (_, body) = call(app(Some(Arc::new(Fake))), "GET", "/api/v1/llm/status", None).await;
    assert_eq!(body["llm_available"], true);
    assert_eq!(body["model"], "fake-model");
  }

  #[tokio::test]
  async fn solve_text_returns_wire_form() {
    let (status, body) = call(app(None), "POST", "/api/v1/solve_text", Some(r#"{"text_input":"3+2=5"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operator"], "Penjumlahan");
    assert_eq!(body["angka_dalam_soal"], "3,2");
    assert_eq!(body["jawaban"], "5");
    assert_eq!(body["soal_cerita"], "3+2=5");
    assert_eq!(body["enhanced_by_ai"], false);
  }

  #[tokio::test]
  async fn solve_text_uses_llm_for_mixed_problems() {
    let text = r#"{"text_input":"Ana membeli 3 kotak permen, setiap kotak berisi 5 permen, kemudian membagikan 10 permen"}"#;
    let (_, body) = call(app(Some(Arc::new(Fake))), "POST", "/api/v1/solve_text", Some(text)).await;
    assert_eq!(body["operator"], "Mix");
    assert_eq!(body["jawaban"], "5");
    assert_eq!(body["enhanced_by_ai"], true);
    assert_eq!(body["confidence"], "high");
  }

  #[tokio::test]
  async fn blank_text_is_a_bad_request() {
    for (uri, body) in [
      ("/api/v1/solve_text", r#"{"text_input":"   "}"#),
      ("/api/v1/solve_text_simple", "{}"),
      ("/api/v1/analyze_problem", r#"{"soal_text":""}"#),
      ("/api/v1/pedagogic/analyze_text", "{}"),
      ("/api/v1/compare_answer", r#"{"ai_answer":{"operator":"+"}}"#),
      ("/api/v1/score_text", r#"{"soal_text":"3+2=5"}"#),
    ] {
      let (status, json) = call(app(None), "POST", uri, Some(body)).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
      assert!(json["error"].is_string(), "{uri}");
    }
  }

  #[tokio::test]
  async fn compare_answer_scores_submission() {
    let body = r#"{
      "ai_answer": {"operator":"Perkalian","angka_dalam_soal":"6,4","jawaban":"24"},
      "student_answer": {"operator":"x","angka_dalam_soal":[6,4],"jawaban":24.0}
    }"#;
    let (status, json) = call(app(None), "POST", "/api/v1/compare_answer", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["nilai"], 4);
    assert_eq!(json["status"], "excellent");
    assert_eq!(json["persentase"], 100.0);
    assert_eq!(json["koreksi"], Value::Array(vec![]));
  }

  #[tokio::test]
  async fn score_text_scores_the_written_equation() {
    let body = r#"{"soal_text":"48 : 6 = 8","jawaban_text":"48:6=8"}"#;
    let (status, json) = call(app(None), "POST", "/api/v1/score_text", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["kunci_jawaban"]["operator"], "Pembagian");
    assert_eq!(json["hasil"]["nilai"], 4);
    assert_eq!(json["hasil"]["status"], "excellent");
  }

  #[tokio::test]
  async fn analyze_problem_without_llm_is_an_error_body() {
    let (status, json) = call(app(None), "POST", "/api/v1/analyze_problem", Some(r#"{"soal_text":"3 tambah 4"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["confidence"], "low");
  }

  #[tokio::test]
  async fn pedagogic_prefers_the_model() {
    let (_, json) = call(app(Some(Arc::new(Fake))), "POST", "/api/v1/pedagogic/analyze_text", Some(r#"{"text":"6x4=24"}"#)).await;
    assert_eq!(json["generated_by_ai"], true);
    assert_eq!(json["analisis"], "Narasi dari model.");
  }

  #[tokio::test]
  async fn class_report_buckets_grades() {
    let (_, json) = call(app(None), "POST", "/api/v1/report/class", Some(r#"{"grades":[90,70,40,85]}"#)).await;
    assert_eq!(json["statistik_kelas"]["nilai_tinggi"], 2);
    assert_eq!(json["statistik_kelas"]["persentase_rendah"], 25.0);
  }

  #[tokio::test]
  async fn malformed_json_is_rejected() {
    let (status, body) = call(app(None), "POST", "/api/v1/difficulty", Some("{not json")).await;
    assert!(status.is_client_error());
    assert!(body.is_string());
  }
}
