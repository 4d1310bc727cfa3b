//! Core behaviors behind the HTTP handlers: case lookup/rendering and answer grading.
//!
//! Grading pipeline: case lookup → rendering → prompt → Gemini (model fallback) → normalization.

use tracing::{info, instrument};

use crate::error::{ApiError, GradingError};
use crate::normalize::normalize;
use crate::prompt::build_prompt;
use crate::protocol::{TaskOut, TasksOut};
use crate::render::format_case;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn list_tasks(state: &AppState) -> Result<TasksOut, ApiError> {
  let tasks = state.store.list_cases().await?;
  Ok(TasksOut { tasks })
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn get_task(state: &AppState, id: i64) -> Result<TaskOut, ApiError> {
  let case = state.store.get_case(id).await?;
  Ok(TaskOut {
    id: case.id,
    title: case.title.clone(),
    task_text: format_case(&case),
  })
}

/// Grade a free-text answer for the given case.
///
/// Returns a verdict whenever the model answered at all (malformed output is
/// absorbed into a degraded verdict). Lookup and upstream failures propagate.
#[instrument(level = "info", skip(state, answer), fields(%task_id, answer_len = answer.len()))]
pub async fn check_answer(state: &AppState, task_id: i64, answer: &str) -> Result<crate::domain::Verdict, ApiError> {
  let case = state.store.get_case(task_id).await?;
  let grader = state.grader.as_ref().map_err(GradingError::clone)?;

  let case_text = format_case(&case);
  let prompt = build_prompt(&state.prompts, &case_text, &case.reference_answer, answer);

  let raw = grader.grade(&prompt).await?;
  let verdict = normalize(&raw);
  info!(
    target: "grader",
    %task_id,
    overall_score = verdict.overall_score,
    criteria = verdict.criteria_evaluation.len(),
    degraded = verdict.error.is_some(),
    "Answer graded"
  );
  Ok(verdict)
}
