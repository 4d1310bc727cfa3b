//! Minimal Gemini client for grading.
//!
//! We only call `generateContent` with a JSON response mime type and walk a ranked
//! list of models until one answers. Each attempt ends in one of three outcomes:
//! success, retryable failure (try the next model), or fatal failure (stop).
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key; it travels in a header, not in the URL.

use std::time::Instant;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::GraderSettings;
use crate::error::{classify_failure, is_auth_failure, GradingError};
use crate::util::trunc_for_log;

const API_KEY_HEADER: &str = "x-goog-api-key";
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

#[derive(Clone)]
pub struct Gemini {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub models: Vec<String>,
  pub temperature: f32,
}

/// Result of one model attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
  Success(String),
  Retryable(String),
  Fatal(String),
}

impl AttemptOutcome {
  pub fn from_result(result: Result<String, String>) -> Self {
    match result {
      Ok(text) if !text.trim().is_empty() => AttemptOutcome::Success(text),
      Ok(_) => AttemptOutcome::Retryable("empty response from model".into()),
      Err(msg) if is_auth_failure(&msg) => AttemptOutcome::Fatal(msg),
      Err(msg) => AttemptOutcome::Retryable(msg),
    }
  }
}

impl Gemini {
  /// Construct the client. Fails with `NotConfigured` without an API key and
  /// with `ClientInit` when the HTTP client cannot be built.
  pub fn from_settings(settings: &GraderSettings) -> Result<Self, GradingError> {
    let api_key = settings.api_key.clone().ok_or(GradingError::NotConfigured)?;
    let client = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|e| {
        error!(target: "grader", error = %e, "Failed to build HTTP client");
        GradingError::ClientInit(e.to_string())
      })?;
    Ok(Self {
      client,
      api_key,
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      models: settings.models.clone(),
      temperature: settings.temperature,
    })
  }

  /// Send the prompt to each candidate model in order until one yields text.
  /// Authentication failures stop the walk; every other failure moves on.
  #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len(), candidates = self.models.len()))]
  pub async fn grade(&self, prompt: &str) -> Result<String, GradingError> {
    let mut last_error: Option<String> = None;

    for model in &self.models {
      let start = Instant::now();
      let outcome = AttemptOutcome::from_result(self.generate(model, prompt).await);
      let elapsed = start.elapsed();

      match outcome {
        AttemptOutcome::Success(text) => {
          info!(target: "grader", %model, ?elapsed, response_len = text.len(), "Model answered");
          return Ok(text);
        }
        AttemptOutcome::Retryable(msg) => {
          warn!(target: "grader", %model, ?elapsed, error = %msg, "Model attempt failed; trying next candidate");
          last_error = Some(msg);
        }
        AttemptOutcome::Fatal(msg) => {
          error!(target: "grader", %model, ?elapsed, error = %msg, "Authentication failure; not trying other models");
          last_error = Some(msg);
          break;
        }
      }
    }

    let message = last_error.unwrap_or_else(|| "Неизвестная ошибка".into());
    let classified = classify_failure(&message);
    error!(target: "grader", error = %message, class = ?classified, "All grading attempts failed");
    Err(classified)
  }

  /// One `generateContent` call. Errors are plain messages for classification.
  #[instrument(level = "info", skip(self, prompt), fields(%model))]
  async fn generate(&self, model: &str, prompt: &str) -> Result<String, String> {
    let url = format!("{}/{}:generateContent", self.base_url, model_path(model));
    let req = GenerateContentRequest {
      contents: vec![Content {
        role: Some("user".into()),
        parts: vec![Part { text: Some(prompt.to_string()) }],
      }],
      generation_config: GenerationConfig {
        temperature: self.temperature,
        response_mime_type: "application/json".into(),
      },
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "clinical-grader/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, &self.api_key)
      .json(&req).send().await
      .map_err(|e| {
        if e.is_timeout() { format!("request to {} timed out", model) } else { e.to_string() }
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 500));
      return Err(format!("Gemini HTTP {}: {}", status, msg));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    response_text(body)
  }
}

/// Accept model ids with or without the `models/` prefix.
fn model_path(model: &str) -> String {
  if model.starts_with("models/") { model.to_string() } else { format!("models/{}", model) }
}

fn response_text(body: GenerateContentResponse) -> Result<String, String> {
  if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
    return Err(format!("prompt blocked by safety filter: {}", reason));
  }
  let Some(candidate) = body.candidates.into_iter().next() else {
    return Ok(String::new());
  };
  let text: String = candidate
    .content
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
    .unwrap_or_default();

  if text.trim().is_empty() {
    if let Some(reason) = candidate.finish_reason.as_deref() {
      if BLOCKING_FINISH_REASONS.contains(&reason) {
        return Err(format!("response blocked by safety filter: {}", reason));
      }
    }
  }
  Ok(text)
}

// --- Gemini DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f32,
  response_mime_type: String,
}
#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")] role: Option<String>,
  #[serde(default)] parts: Vec<Part>,
}
#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")] text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<Content>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)] block_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract `message (STATUS)` from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String, #[serde(default)] status: Option<String> }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(match w.error.status {
      Some(s) => format!("{} ({})", w.error.message, s),
      None => w.error.message,
    }),
    Err(_) => None,
  }
}
