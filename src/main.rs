//! Clinical case grader backend
//!
//! - Axum HTTP API serving clinical cases and grading free-text answers
//! - Google Gemini as the grading engine, with a ranked model fallback list
//! - Static front-end from ./static
//!
//! Important env variables:
//!   PORT                 : u16 (default 8000)
//!   TASKS_FILE           : cases JSON file (default "data/tasks.json")
//!   STATIC_DIR           : front-end directory (default "static")
//!   GEMINI_API_KEY       : required for grading (GOOGLE_API_KEY also accepted)
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODELS        : comma-separated model ids, tried in order
//!   GEMINI_TEMPERATURE   : default 0.3
//!   GRADER_TIMEOUT_SECS  : per-request timeout to Gemini (default 60)
//!   GRADER_CONFIG_PATH   : optional TOML file (settings + prompt overrides)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod store;
mod render;
mod prompt;
mod gemini;
mod normalize;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::load();

  // Shared, immutable application state (case store, Gemini client, prompts).
  let state = Arc::new(AppState::new(&settings));

  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "clinical_grader", %addr, tasks_file = %settings.tasks_file.display(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "clinical_grader", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "clinical_grader", "Shutdown signal received");
}
