//! Service settings: built-in defaults, overlaid by an optional TOML file, overlaid by env.
//!
//! `Settings` is built once in `main` and passed down explicitly; nothing here is global.
//! See `FileConfig` and `Prompts` for the TOML schema.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Candidate models in priority order.
pub const DEFAULT_MODELS: &[&str] = &[
  "models/gemini-2.5-flash",
  "models/gemini-2.0-flash",
  "models/gemini-pro-latest",
  "models/gemini-flash-latest",
];

/// Grader connection settings. `api_key` is never logged.
#[derive(Clone)]
pub struct GraderSettings {
  pub api_key: Option<String>,
  pub base_url: String,
  pub models: Vec<String>,
  pub temperature: f32,
  pub timeout: Duration,
}

impl std::fmt::Debug for GraderSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GraderSettings")
      .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
      .field("base_url", &self.base_url)
      .field("models", &self.models)
      .field("temperature", &self.temperature)
      .field("timeout", &self.timeout)
      .finish()
  }
}

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub tasks_file: PathBuf,
  pub static_dir: PathBuf,
  pub grader: GraderSettings,
  pub prompts: Prompts,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      port: 8000,
      tasks_file: PathBuf::from("data/tasks.json"),
      static_dir: PathBuf::from("static"),
      grader: GraderSettings {
        api_key: None,
        base_url: DEFAULT_BASE_URL.into(),
        models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        temperature: 0.3,
        timeout: Duration::from_secs(60),
      },
      prompts: Prompts::default(),
    }
  }
}

/// TOML overlay. Every key is optional.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)] pub port: Option<u16>,
  #[serde(default)] pub tasks_file: Option<PathBuf>,
  #[serde(default)] pub static_dir: Option<PathBuf>,
  #[serde(default)] pub gemini: GeminiFileConfig,
  #[serde(default)] pub prompts: Option<Prompts>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GeminiFileConfig {
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub models: Option<Vec<String>>,
  #[serde(default)] pub temperature: Option<f32>,
  #[serde(default)] pub timeout_secs: Option<u64>,
}

/// Prompt texts used to build the grading request. Defaults carry the
/// clinical-medicine rubric; override them in TOML to tune tone or language.
///
/// `grading_template` keys: `{case_text}`, `{criteria_1}` .. `{criteria_6}`, `{answer}`.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub system_preamble: String,
  pub grading_template: String,
  pub output_directive: String,
  pub missing_criterion: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system_preamble: "Ты - опытный преподаватель клинической медицины, который проверяет ответы студентов. Всегда отвечай на русском языке в формате JSON.".into(),
      grading_template: DEFAULT_GRADING_TEMPLATE.into(),
      output_directive: "ВАЖНО: Верни ТОЛЬКО валидный JSON без дополнительного текста до или после него.".into(),
      missing_criterion: "Не указано".into(),
    }
  }
}

const DEFAULT_GRADING_TEMPLATE: &str = r#"Ты - опытный преподаватель клинической медицины, который проверяет ответы студентов по клиническим задачам.

КЛИНИЧЕСКАЯ ЗАДАЧА:
{case_text}

ЭТАЛОННЫЙ ОТВЕТ (по 6 критериям оценки):

Критерий 1 - Ведущие синдромы заболевания:
{criteria_1}

Критерий 2 - Эпидемиологические данные:
{criteria_2}

Критерий 3 - Характерные объективные данные:
{criteria_3}

Критерий 4 - Обоснование диагноза:
{criteria_4}

Критерий 5 - План диагностики:
{criteria_5}

Критерий 6 - План лечения:
{criteria_6}

ОТВЕТ СТУДЕНТА:
{answer}

ИНСТРУКЦИЯ:
Проверь ответ студента по каждому из 6 критериев. Учти, что студент может писать своими словами, главное - это правильность и полнота информации. Если что-то отсутствует или неверно, четко укажи это.

Верни ответ в формате JSON со следующей структурой:
{
    "overall_score": число от 0 до 100 (общая оценка),
    "detailed_feedback": "подробный общий отзыв на русском языке с указанием основных замечаний",
    "criteria_evaluation": {
        "criteria_1": {
            "score": число от 0 до 100,
            "feedback": "проверка по критерию 1 - ведущие синдромы. Укажи, что правильно, что отсутствует, что неверно",
            "is_complete": true/false,
            "missing_points": ["что отсутствует в ответе"],
            "incorrect_points": ["что указано неверно"]
        },
        "criteria_2": {
            "score": число от 0 до 100,
            "feedback": "проверка по критерию 2 - эпидемиологические данные",
            "is_complete": true/false,
            "missing_points": ["что отсутствует"],
            "incorrect_points": ["что указано неверно"]
        },
        "criteria_3": {
            "score": число от 0 до 100,
            "feedback": "проверка по критерию 3 - объективные данные",
            "is_complete": true/false,
            "missing_points": ["что отсутствует"],
            "incorrect_points": ["что указано неверно"]
        },
        "criteria_4": {
            "score": число от 0 до 100,
            "feedback": "проверка по критерию 4 - обоснование диагноза",
            "is_complete": true/false,
            "missing_points": ["что отсутствует"],
            "incorrect_points": ["что указано неверно"]
        },
        "criteria_5": {
            "score": число от 0 до 100,
            "feedback": "проверка по критерию 5 - план диагностики",
            "is_complete": true/false,
            "missing_points": ["что отсутствует"],
            "incorrect_points": ["что указано неверно"]
        },
        "criteria_6": {
            "score": число от 0 до 100,
            "feedback": "проверка по критерию 6 - план лечения",
            "is_complete": true/false,
            "missing_points": ["что отсутствует"],
            "incorrect_points": ["что указано неверно"]
        }
    },
    "strengths": ["сильные стороны ответа"],
    "recommendations": ["конкретные рекомендации для улучшения ответа"]
}

ВАЖНО:
- Будь объективным и конструктивным
- Учти, что студент может выражать мысли своими словами - это нормально
- Главное - это правильность медицинской информации и полнота охвата всех критериев
- Четко указывай, что именно отсутствует или неверно
- Давай конкретные рекомендации для улучшения"#;

impl Settings {
  /// Defaults → TOML at `GRADER_CONFIG_PATH` (if any) → environment.
  pub fn load() -> Self {
    let mut s = Settings::default();
    if let Some(file) = load_file_config_from_env() {
      s.apply_file(file);
    }
    s.apply_env(|k| std::env::var(k).ok());
    s
  }

  pub fn apply_file(&mut self, f: FileConfig) {
    if let Some(p) = f.port { self.port = p; }
    if let Some(p) = f.tasks_file { self.tasks_file = p; }
    if let Some(p) = f.static_dir { self.static_dir = p; }
    if let Some(u) = f.gemini.base_url { self.grader.base_url = u; }
    if let Some(m) = f.gemini.models { self.set_models(m); }
    if let Some(t) = f.gemini.temperature { self.grader.temperature = t; }
    if let Some(t) = f.gemini.timeout_secs { self.grader.timeout = Duration::from_secs(t); }
    if let Some(p) = f.prompts { self.prompts = p; }
  }

  /// Overlay values from an env lookup. Unparseable values keep the previous setting.
  pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, get: F) {
    if let Some(p) = get("PORT").and_then(|p| p.parse::<u16>().ok()) { self.port = p; }
    if let Some(p) = get("TASKS_FILE") { self.tasks_file = p.into(); }
    if let Some(p) = get("STATIC_DIR") { self.static_dir = p.into(); }

    let key = get("GEMINI_API_KEY")
      .filter(|k| !k.trim().is_empty())
      .or_else(|| get("GOOGLE_API_KEY").filter(|k| !k.trim().is_empty()));
    if key.is_some() { self.grader.api_key = key; }

    if let Some(u) = get("GEMINI_BASE_URL") { self.grader.base_url = u; }
    if let Some(m) = get("GEMINI_MODELS") {
      self.set_models(m.split(',').map(|s| s.to_string()).collect());
    }
    if let Some(t) = get("GEMINI_TEMPERATURE").and_then(|t| t.parse::<f32>().ok()) { self.grader.temperature = t; }
    if let Some(t) = get("GRADER_TIMEOUT_SECS").and_then(|t| t.parse::<u64>().ok()) {
      self.grader.timeout = Duration::from_secs(t);
    }
  }

  fn set_models(&mut self, models: Vec<String>) {
    let cleaned: Vec<String> = models
      .into_iter()
      .map(|m| m.trim().to_string())
      .filter(|m| !m.is_empty())
      .collect();
    if !cleaned.is_empty() {
      self.grader.models = cleaned;
    }
  }
}

/// Attempt to load `FileConfig` from GRADER_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("GRADER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<FileConfig>(&s) {
      Ok(cfg) => {
        info!(target: "clinical_grader", %path, "Loaded grader config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "clinical_grader", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "clinical_grader", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_match_the_public_gemini_setup() {
    let s = Settings::default();
    assert_eq!(s.port, 8000);
    assert_eq!(s.grader.models.len(), 4);
    assert_eq!(s.grader.models[0], "models/gemini-2.5-flash");
    assert!(s.grader.api_key.is_none());
    assert_eq!(s.grader.timeout, Duration::from_secs(60));
  }

  #[test]
  fn gemini_key_wins_over_google_key() {
    let mut s = Settings::default();
    s.apply_env(env(&[("GEMINI_API_KEY", "g1"), ("GOOGLE_API_KEY", "g2")]));
    assert_eq!(s.grader.api_key.as_deref(), Some("g1"));

    let mut s = Settings::default();
    s.apply_env(env(&[("GEMINI_API_KEY", "  "), ("GOOGLE_API_KEY", "g2")]));
    assert_eq!(s.grader.api_key.as_deref(), Some("g2"));
  }

  #[test]
  fn model_list_is_split_and_blank_list_keeps_defaults() {
    let mut s = Settings::default();
    s.apply_env(env(&[("GEMINI_MODELS", " a , b,,")]));
    assert_eq!(s.grader.models, vec!["a".to_string(), "b".to_string()]);

    let mut s = Settings::default();
    s.apply_env(env(&[("GEMINI_MODELS", " , ")]));
    assert_eq!(s.grader.models.len(), DEFAULT_MODELS.len());
  }

  #[test]
  fn unparseable_env_values_are_ignored() {
    let mut s = Settings::default();
    s.apply_env(env(&[("PORT", "eighty"), ("GRADER_TIMEOUT_SECS", "-1")]));
    assert_eq!(s.port, 8000);
    assert_eq!(s.grader.timeout, Duration::from_secs(60));
  }

  #[test]
  fn toml_overlay_then_env_overlay() {
    let file: FileConfig = toml::from_str(
      r#"
        port = 9000
        tasks_file = "cases.json"
        [gemini]
        models = ["models/x"]
        timeout_secs = 15
      "#,
    ).unwrap();
    let mut s = Settings::default();
    s.apply_file(file);
    assert_eq!(s.port, 9000);
    assert_eq!(s.tasks_file, PathBuf::from("cases.json"));
    assert_eq!(s.grader.models, vec!["models/x".to_string()]);
    assert_eq!(s.grader.timeout, Duration::from_secs(15));

    s.apply_env(env(&[("PORT", "9100")]));
    assert_eq!(s.port, 9100);
  }

  #[test]
  fn debug_output_redacts_the_key() {
    let mut s = Settings::default();
    s.grader.api_key = Some("secret-key".into());
    let dbg = format!("{:?}", s.grader);
    assert!(!dbg.contains("secret-key"));
  }
}
