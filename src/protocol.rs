//! Public HTTP request/response structs (serde ready).
//! Field names match what the bundled front-end reads.

use serde::{Deserialize, Serialize};

use crate::domain::CaseSummary;

#[derive(Debug, Serialize, Deserialize)]
pub struct TasksOut {
    pub tasks: Vec<CaseSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskOut {
    pub id: i64,
    pub title: Option<String>,
    /// Rendered case text, identical to what the grading prompt embeds.
    pub task_text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub task_id: i64,
    pub answer: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub grader_configured: bool,
}
