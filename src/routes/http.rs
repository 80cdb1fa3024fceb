//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic result info.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument, warn};

use crate::comparator::ComparisonResult;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

type HttpError = (StatusCode, Json<ErrorOut>);

fn bad_request(msg: &str) -> HttpError {
  warn!(target: "exam_scoring", error = msg, "Rejected request");
  (StatusCode::BAD_REQUEST, Json(ErrorOut { error: msg.to_string() }))
}

/// Non-blank required text field, or a 400.
fn required(field: Option<String>, msg: &str) -> Result<String, HttpError> {
  match field {
    Some(s) if !s.trim().is_empty() => Ok(s),
    _ => Err(bad_request(msg)),
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_llm_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(LlmStatusOut {
    llm_available: state.llm_enabled(),
    model: state.llm_model.clone(),
    pre_call_delay_ms: state.config.llm.pre_call_delay_ms,
    timeout_secs: state.config.llm.timeout_secs,
  })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_solve_text(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SolveTextIn>,
) -> Result<Json<SolveTextOut>, HttpError> {
  let text = required(body.text_input, "text_input is required")?;
  Ok(Json(solve_text(&state, &text).await))
}

#[instrument(level = "info", skip(body))]
pub async fn http_post_solve_text_simple(Json(body): Json<SolveTextIn>) -> Result<Json<SolveTextOut>, HttpError> {
  let text = required(body.text_input, "text_input is required")?;
  Ok(Json(solve_text_simple(&text)))
}

#[instrument(level = "info", skip(body))]
pub async fn http_post_compare_answer(Json(body): Json<CompareIn>) -> Result<Json<ComparisonResult>, HttpError> {
  let (Some(key), Some(submission)) = (body.ai_answer, body.student_answer) else {
    return Err(bad_request("ai_answer and student_answer are required"));
  };
  Ok(Json(compare_answer(key, submission)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_score_text(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ScoreTextIn>,
) -> Result<Json<ScoreTextOut>, HttpError> {
  let soal = required(body.soal_text, "soal_text is required")?;
  let jawaban = required(body.jawaban_text, "jawaban_text is required")?;
  Ok(Json(score_text(&state, &soal, &jawaban).await))
}

#[instrument(level = "info", skip(body), fields(operator = %body.operator))]
pub async fn http_post_difficulty(Json(body): Json<DifficultyIn>) -> impl IntoResponse {
  Json(difficulty(body))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_analyze_problem(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnalyzeProblemIn>,
) -> Result<Json<AnalyzeProblemOut>, HttpError> {
  let soal = required(body.soal_text, "soal_text is required")?;
  Ok(Json(analyze_problem(&state, &soal).await))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_pedagogic(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PedagogicIn>,
) -> Result<Json<PedagogicOut>, HttpError> {
  let text = required(body.text, "Text is required")?;
  let out = pedagogic(&state, &text).await;
  info!(target: "exam_scoring", generated_by_ai = out.generated_by_ai, "Pedagogic analysis served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(body), fields(pairs = body.pairs.len()))]
pub async fn http_post_batch_report(Json(body): Json<BatchIn>) -> impl IntoResponse {
  Json(batch_report(body.pairs))
}

#[instrument(level = "info", skip(body), fields(grades = body.grades.len()))]
pub async fn http_post_class_report(Json(body): Json<ClassIn>) -> impl IntoResponse {
  Json(class_report(&body.grades))
}
