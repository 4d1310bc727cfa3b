//! Error types and their HTTP mapping.
//!
//! Display strings are the short, client-facing messages; full upstream detail
//! is logged where the error is produced.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::util::truncate_chars;

/// Characters of an unclassified upstream message shown to the client.
pub const UNKNOWN_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Файл {path} не найден. Создайте файл с задачами")]
  FileNotFound { path: String },

  #[error("Задача с ID {id} не найдена")]
  CaseNotFound { id: i64 },

  #[error("не удалось прочитать {path}: {source}")]
  Io { path: String, #[source] source: std::io::Error },

  #[error("некорректный формат {path}: {source}")]
  Parse { path: String, #[source] source: serde_json::Error },
}

/// Classified failure of the grading call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GradingError {
  #[error("GEMINI_API_KEY не найден. Проверьте файл .env")]
  NotConfigured,

  #[error("Не удалось инициализировать HTTP-клиент для Google Gemini API: {0}")]
  ClientInit(String),

  #[error("Ошибка аутентификации Google Gemini API. Проверьте API ключ в файле .env")]
  Authentication,

  #[error("Превышен лимит запросов к Google Gemini API. Подождите немного и попробуйте снова.")]
  QuotaExceeded,

  #[error("Запрос был заблокирован системой безопасности Gemini. Попробуйте переформулировать запрос.")]
  ContentBlocked,

  #[error("Ошибка Google Gemini API: {0}")]
  Unknown(String),
}

const AUTH_KEYWORDS: &[&str] = &["api_key", "api key", "authentication", "unauthenticated", "permission"];
const QUOTA_KEYWORDS: &[&str] = &["quota", "rate limit", "resource_exhausted"];
const BLOCKED_KEYWORDS: &[&str] = &["safety", "blocked"];

fn mentions(message: &str, keywords: &[&str]) -> bool {
  let lower = message.to_lowercase();
  keywords.iter().any(|k| lower.contains(k))
}

/// True when retrying with another model cannot help.
pub fn is_auth_failure(message: &str) -> bool {
  mentions(message, AUTH_KEYWORDS)
}

/// Map the last upstream error message to a failure class.
/// Priority: Authentication, QuotaExceeded, ContentBlocked, Unknown.
pub fn classify_failure(message: &str) -> GradingError {
  if mentions(message, AUTH_KEYWORDS) {
    GradingError::Authentication
  } else if mentions(message, QUOTA_KEYWORDS) {
    GradingError::QuotaExceeded
  } else if mentions(message, BLOCKED_KEYWORDS) {
    GradingError::ContentBlocked
  } else {
    GradingError::Unknown(truncate_chars(message, UNKNOWN_MESSAGE_CHARS))
  }
}

/// Unified API error for route handlers. Body shape `{ "detail": ... }` is what the front-end reads.
#[derive(Debug)]
pub enum ApiError {
  NotFound(String),
  Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
  detail: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, detail) = match self {
      ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
      ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
    };
    (status, Json(ErrorBody { detail })).into_response()
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    if matches!(e, StoreError::FileNotFound { .. } | StoreError::CaseNotFound { .. }) {
      return ApiError::NotFound(e.to_string());
    }
    tracing::error!(target: "clinical_grader", error = %e, "Case store failure");
    ApiError::Internal(e.to_string())
  }
}

impl From<GradingError> for ApiError {
  fn from(e: GradingError) -> Self {
    ApiError::Internal(e.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification_priority_order() {
    assert_eq!(classify_failure("API key not valid. Please pass a valid API key."), GradingError::Authentication);
    assert_eq!(classify_failure("PERMISSION_DENIED"), GradingError::Authentication);
    assert_eq!(classify_failure("quota exceeded; api_key ok?"), GradingError::Authentication);
    assert_eq!(classify_failure("Gemini HTTP 429: Quota exceeded (RESOURCE_EXHAUSTED)"), GradingError::QuotaExceeded);
    assert_eq!(classify_failure("rate limit hit, also blocked"), GradingError::QuotaExceeded);
    assert_eq!(classify_failure("prompt blocked by safety filter: SAFETY"), GradingError::ContentBlocked);
  }

  #[test]
  fn unknown_message_is_truncated() {
    let long = "x".repeat(1000);
    match classify_failure(&long) {
      GradingError::Unknown(m) => assert_eq!(m.chars().count(), UNKNOWN_MESSAGE_CHARS),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn not_found_models_are_not_auth_failures() {
    assert!(!is_auth_failure("Gemini HTTP 404: models/foo is not found (NOT_FOUND)"));
    assert!(is_auth_failure("Gemini HTTP 403: caller does not have permission (PERMISSION_DENIED)"));
  }

  #[test]
  fn store_errors_map_to_status() {
    let r = ApiError::from(StoreError::CaseNotFound { id: 3 }).into_response();
    assert_eq!(r.status(), StatusCode::NOT_FOUND);
    let r = ApiError::from(GradingError::QuotaExceeded).into_response();
    assert_eq!(r.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
