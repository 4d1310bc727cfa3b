//! Domain models: clinical cases as stored on disk, their reference rubric, and the grading verdict.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize};

/// One clinical case as found in the cases file.
/// Every field except `id` may be absent; formatting substitutes placeholders.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Case {
  pub id: i64,
  #[serde(default)] pub title: Option<String>,

  #[serde(default)] pub patient_info: Option<String>,
  #[serde(default)] pub complaints: Option<String>,
  #[serde(default)] pub anamnesis_morbi: Option<String>,
  #[serde(default)] pub epidemiological_history: Option<String>,
  #[serde(default)] pub objective_data: Option<String>,
  #[serde(default)] pub laboratory_data: Option<String>,

  /// Ordered task prompts shown under the "Задания" header.
  #[serde(default)] pub tasks: Vec<String>,
  #[serde(default)] pub reference_answer: ReferenceAnswer,
}

impl Case {
  /// Title used in listings: the stored title, or "Задача <id>" when absent.
  pub fn display_title(&self) -> String {
    match &self.title {
      Some(t) => t.clone(),
      None => format!("Задача {}", self.id),
    }
  }
}

/// Listing entry for a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
  pub id: i64,
  pub title: String,
}

impl From<&Case> for CaseSummary {
  fn from(c: &Case) -> Self {
    Self { id: c.id, title: c.display_title() }
  }
}

/// Six rubric criteria, one narrative per evaluation dimension.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReferenceAnswer {
  #[serde(default)] pub criteria_1_syndromes: Option<String>,
  #[serde(default)] pub criteria_2_epidemiological: Option<String>,
  #[serde(default)] pub criteria_3_objective_data: Option<String>,
  #[serde(default)] pub criteria_4_diagnosis: Option<String>,
  #[serde(default)] pub criteria_5_examination_plan: Option<String>,
  #[serde(default)] pub criteria_6_treatment_plan: Option<String>,
}

/// Per-criterion evaluation returned by the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionEvaluation {
  #[serde(default, deserialize_with = "optional_score")] pub score: f64,
  #[serde(default, deserialize_with = "null_as_default")] pub feedback: String,
  #[serde(default, deserialize_with = "null_as_default")] pub is_complete: bool,
  #[serde(default, deserialize_with = "null_as_default")] pub missing_points: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")] pub incorrect_points: Vec<String>,
}

/// Grading verdict relayed to the student. Never persisted.
///
/// `overall_score` is the only required field: a JSON object without it is
/// not treated as a verdict. Everything else tolerates `null` and missing
/// values, and scores may arrive as numeric strings. `error` is set only on
/// degraded verdicts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
  #[serde(deserialize_with = "required_score")]
  pub overall_score: f64,
  #[serde(default, deserialize_with = "null_as_default")] pub detailed_feedback: String,
  /// Keyed `criteria_1` .. `criteria_6`; passed through as the model returned it.
  #[serde(default, deserialize_with = "null_as_default")]
  pub criteria_evaluation: BTreeMap<String, CriterionEvaluation>,
  #[serde(default, deserialize_with = "null_as_default")] pub strengths: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")] pub recommendations: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl Verdict {
  /// Clamp every score into 0..=100. Model output occasionally drifts outside the range.
  pub fn clamp_scores(mut self) -> Self {
    self.overall_score = clamp_score(self.overall_score);
    for c in self.criteria_evaluation.values_mut() {
      c.score = clamp_score(c.score);
    }
    self
  }
}

fn clamp_score(s: f64) -> f64 {
  if s.is_nan() { 0.0 } else { s.clamp(0.0, 100.0) }
}

/// `null` deserializes to the type's default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
  Number(f64),
  Text(String),
}

fn parse_score<E: de::Error>(raw: RawScore) -> Result<f64, E> {
  match raw {
    RawScore::Number(n) => Ok(n),
    RawScore::Text(t) => t
      .trim()
      .parse::<f64>()
      .map_err(|_| E::custom(format!("score is not a number: {t:?}"))),
  }
}

/// Number or numeric string. `null` is rejected.
fn required_score<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
  parse_score(RawScore::deserialize(d)?)
}

/// Number or numeric string; `null` becomes 0.
fn optional_score<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
  match Option::<RawScore>::deserialize(d)? {
    Some(raw) => parse_score(raw),
    None => Ok(0.0),
  }
}
