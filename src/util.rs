//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single pass, so substituted values are never scanned for further keys.
/// Unknown `{...}` spans (e.g. JSON examples in prompts) are copied as-is.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let tail = &rest[open..];
    let hit = pairs.iter().find(|(k, _)| {
      tail.len() > k.len() + 1 && tail[1..].starts_with(k) && tail[1 + k.len()..].starts_with('}')
    });
    match hit {
      Some((k, v)) => {
        out.push_str(v);
        rest = &tail[k.len() + 2..];
      }
      None => {
        out.push('{');
        rest = &tail[1..];
      }
    }
  }
  out.push_str(rest);
  out
}

/// Truncate to at most `max` characters (not bytes), never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((idx, _)) => s[..idx].to_string(),
    None => s.to_string(),
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max { s.to_string() } else { format!("{}… ({} bytes total)", truncate_chars(s, max), s.len()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_known_keys_once() {
    let out = fill_template("a={a} b={b} json={\"k\": 1}", &[("a", "{b}"), ("b", "2")]);
    assert_eq!(out, "a={b} b=2 json={\"k\": 1}");
  }

  #[test]
  fn fill_template_handles_trailing_brace() {
    assert_eq!(fill_template("x{", &[("x", "y")]), "x{");
    assert_eq!(fill_template("{x}", &[("x", "y")]), "y");
  }

  #[test]
  fn truncate_chars_respects_code_points() {
    assert_eq!(truncate_chars("привет", 3), "при");
    assert_eq!(truncate_chars("ok", 10), "ok");
  }

  #[test]
  fn trunc_for_log_marks_truncation() {
    assert_eq!(trunc_for_log("short", 10), "short");
    assert!(trunc_for_log("abcdefghij", 4).starts_with("abcd…"));
  }
}
