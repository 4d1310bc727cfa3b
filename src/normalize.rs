//! Turning raw model output into a `Verdict`.
//!
//! Two-stage parse: strict parse of the fence-stripped text, then a bounded scan
//! for the first balanced top-level `{...}` span. If both fail, a degraded verdict
//! is synthesized. `normalize` never fails.

use tracing::warn;

use crate::domain::Verdict;
use crate::util::truncate_chars;

/// Upper bound on bytes inspected by the brace scan.
pub const MAX_SCAN_BYTES: usize = 256 * 1024;
/// Characters of raw output quoted in a degraded verdict.
pub const EXCERPT_CHARS: usize = 500;
pub const DEGRADED_SCORE: f64 = 50.0;

pub fn normalize(raw: &str) -> Verdict {
  let text = strip_code_fence(raw);

  let strict_err = match serde_json::from_str::<Verdict>(text) {
    Ok(v) => return v.clamp_scores(),
    Err(e) => e,
  };

  if let Some(span) = first_balanced_object(text) {
    if let Ok(v) = serde_json::from_str::<Verdict>(span) {
      return v.clamp_scores();
    }
  }

  warn!(target: "grader", raw_len = raw.len(), error = %strict_err, "Model output is not a verdict; returning degraded result");
  degraded(text, &strict_err.to_string())
}

/// Strip a surrounding markdown code fence (with or without a language tag) and trim.
pub fn strip_code_fence(raw: &str) -> &str {
  let mut s = raw.trim();
  if let Some(rest) = s.strip_prefix("```") {
    let tag_len = rest
      .char_indices()
      .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
      .map(|(i, _)| i)
      .unwrap_or(rest.len());
    s = &rest[tag_len..];
  }
  if let Some(rest) = s.trim_end().strip_suffix("```") {
    s = rest;
  }
  s.trim()
}

/// Locate the first balanced top-level `{...}` span, honoring JSON string
/// literals and escapes. Gives up after `MAX_SCAN_BYTES`.
pub fn first_balanced_object(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let bytes = text.as_bytes();
  let end_limit = bytes.len().min(start.saturating_add(MAX_SCAN_BYTES));

  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;
  for i in start..end_limit {
    let b = bytes[i];
    if in_string {
      if escaped { escaped = false; }
      else if b == b'\\' { escaped = true; }
      else if b == b'"' { in_string = false; }
      continue;
    }
    match b {
      b'"' => in_string = true,
      b'{' => depth += 1,
      b'}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&text[start..=i]);
        }
      }
      _ => {}
    }
  }
  None
}

fn degraded(text: &str, parse_error: &str) -> Verdict {
  Verdict {
    overall_score: DEGRADED_SCORE,
    detailed_feedback: format!(
      "Ошибка парсинга ответа ИИ. Полученный ответ: {}",
      truncate_chars(text, EXCERPT_CHARS)
    ),
    criteria_evaluation: Default::default(),
    strengths: vec![],
    recommendations: vec!["Попробуйте проверить ответ еще раз".into()],
    error: Some(format!("Не удалось распарсить ответ ИИ: {}", parse_error)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fenced_json_is_parsed() {
    let v = normalize("```json\n{\"overall_score\":80,\"detailed_feedback\":\"ok\"}\n```");
    assert_eq!(v.overall_score, 80.0);
    assert_eq!(v.detailed_feedback, "ok");
    assert!(v.error.is_none());
  }

  #[test]
  fn bare_fence_without_language_tag() {
    let v = normalize("```\n{\"overall_score\": 61}\n```\n");
    assert_eq!(v.overall_score, 61.0);
  }

  #[test]
  fn no_json_yields_degraded_verdict() {
    let v = normalize("no json here");
    assert_eq!(v.overall_score, 50.0);
    assert!(v.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(v.recommendations.len(), 1);
    assert!(v.criteria_evaluation.is_empty());
    assert!(v.strengths.is_empty());
    assert!(v.detailed_feedback.contains("no json here"));
  }

  #[test]
  fn empty_input_yields_degraded_verdict() {
    let v = normalize("");
    assert_eq!(v.overall_score, 50.0);
    assert!(v.error.is_some());
  }

  #[test]
  fn json_embedded_in_prose_is_recovered() {
    let raw = "Вот оценка: {\"overall_score\": 72, \"strengths\": [\"структура {ответа}\"]} Спасибо!";
    let v = normalize(raw);
    assert_eq!(v.overall_score, 72.0);
    assert_eq!(v.strengths, vec!["структура {ответа}".to_string()]);
  }

  #[test]
  fn first_object_wins_over_later_ones() {
    let v = normalize("a {\"overall_score\": 10} b {\"overall_score\": 90}");
    assert_eq!(v.overall_score, 10.0);
  }

  #[test]
  fn excerpt_is_capped() {
    let raw = "ж".repeat(2000);
    let v = normalize(&raw);
    let excerpt = v.detailed_feedback.split("Полученный ответ: ").nth(1).unwrap();
    assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
  }

  #[test]
  fn unbalanced_braces_do_not_panic() {
    let v = normalize("}}}{{{\"overall_score\": 3");
    assert_eq!(v.overall_score, 50.0);
    assert!(first_balanced_object("}{\"a\": \"}\"").is_none());
  }

  #[test]
  fn escaped_quotes_inside_strings() {
    let span = first_balanced_object(r#"x {"a": "q\"}"} y"#).unwrap();
    assert_eq!(span, r#"{"a": "q\"}"}"#);
  }

  #[test]
  fn scan_is_bounded() {
    let mut raw = String::from("{\"overall_score\": 1, \"pad\": \"");
    raw.push_str(&"x".repeat(MAX_SCAN_BYTES));
    raw.push_str("\"}");
    assert!(first_balanced_object(&raw).is_none());
  }

  #[test]
  fn object_without_score_is_not_a_verdict() {
    let v = normalize("{\"detailed_feedback\": \"missing score\"}");
    assert!(v.error.is_some());
  }

  #[test]
  fn strip_code_fence_variants() {
    assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```JSON\n{}\n```"), "{}");
  }

  #[test]
  fn loosely_typed_verdict_keeps_the_model_score() {
    let v = normalize(r#"{"overall_score": 85, "detailed_feedback": "ok", "criteria_evaluation": {"criteria_1": {"score": 80, "feedback": "f", "is_complete": true, "missing_points": null, "incorrect_points": []}}, "strengths": [], "recommendations": []}"#);
    assert!(v.error.is_none());
    assert_eq!(v.overall_score, 85.0);
    assert!(v.criteria_evaluation["criteria_1"].missing_points.is_empty());

    let v = normalize(r#"{"overall_score": "85", "detailed_feedback": "ok"}"#);
    assert!(v.error.is_none());
    assert_eq!(v.overall_score, 85.0);
  }
}
