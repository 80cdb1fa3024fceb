//! Exam scoring backend
//!
//! - Axum HTTP API for extracting, scoring and reporting elementary arithmetic answers
//! - Optional Gemini integration (OpenAI-compatible endpoint) for mixed/unknown problems
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   GEMINI_API_KEY      : enables the LLM collaborator if present
//!   GEMINI_BASE_URL     : default "https://generativelanguage.googleapis.com/v1beta/openai"
//!   GEMINI_MODEL        : default "gemini-2.0-flash"
//!   SCORING_CONFIG_PATH : path to TOML config (LLM call policy + prompts)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod difficulty;
mod comparator;
mod extractor;
mod llm;
mod report;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::new());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "exam_scoring", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "exam_scoring", error = %e, "Failed to listen for ctrl-c; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "exam_scoring", "Shutdown signal received");
}
