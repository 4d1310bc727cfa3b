//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, response::{Html, IntoResponse}, Json};
use tracing::{debug, info, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

const PLACEHOLDER_INDEX: &str = "<h1>Clinical AI Backend</h1><p>Создайте файл static/index.html</p>";

#[instrument(level = "info", skip(state))]
pub async fn http_index(State(state): State<Arc<AppState>>) -> Html<String> {
  let path = state.static_dir.join("index.html");
  match tokio::fs::read_to_string(&path).await {
    Ok(html) => Html(html),
    Err(e) => {
      debug!(target: "clinical_grader", path = %path.display(), error = %e, "No index.html; serving placeholder");
      Html(PLACEHOLDER_INDEX.to_string())
    }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, grader_configured: state.grader.is_ok() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_tasks(State(state): State<Arc<AppState>>) -> Result<Json<TasksOut>, ApiError> {
  let out = list_tasks(&state).await?;
  info!(target: "clinical_grader", count = out.tasks.len(), "HTTP task list served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_task(
  State(state): State<Arc<AppState>>,
  Path(id): Path<i64>,
) -> Result<Json<TaskOut>, ApiError> {
  let out = get_task(&state, id).await?;
  info!(target: "clinical_grader", %id, text_len = out.task_text.len(), "HTTP task served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(task_id = %body.task_id, answer_len = body.answer.len()))]
pub async fn http_post_check_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<crate::domain::Verdict>, ApiError> {
  match check_answer(&state, body.task_id, &body.answer).await {
    Ok(verdict) => Ok(Json(verdict)),
    Err(e) => {
      tracing::error!(target: "grader", task_id = %body.task_id, error = ?e, "Answer check failed");
      Err(e)
    }
  }
}
