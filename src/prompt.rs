//! Grading prompt assembly. Pure string building: no I/O.

use crate::config::Prompts;
use crate::domain::ReferenceAnswer;
use crate::util::fill_template;

/// Build the full grading request text: preamble, case, six reference criteria,
/// the raw student answer, grading instructions with the output schema, and the
/// "JSON only" directive.
pub fn build_prompt(prompts: &Prompts, case_text: &str, reference: &ReferenceAnswer, answer: &str) -> String {
  let criterion = |v: &Option<String>| -> String {
    match v.as_deref() {
      Some(s) => s.to_string(),
      None => prompts.missing_criterion.clone(),
    }
  };
  let c1 = criterion(&reference.criteria_1_syndromes);
  let c2 = criterion(&reference.criteria_2_epidemiological);
  let c3 = criterion(&reference.criteria_3_objective_data);
  let c4 = criterion(&reference.criteria_4_diagnosis);
  let c5 = criterion(&reference.criteria_5_examination_plan);
  let c6 = criterion(&reference.criteria_6_treatment_plan);

  let body = fill_template(
    &prompts.grading_template,
    &[
      ("case_text", case_text),
      ("criteria_1", &c1),
      ("criteria_2", &c2),
      ("criteria_3", &c3),
      ("criteria_4", &c4),
      ("criteria_5", &c5),
      ("criteria_6", &c6),
      ("answer", answer),
    ],
  );

  format!("{}\n\n{}\n\n{}", prompts.system_preamble, body, prompts.output_directive)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reference() -> ReferenceAnswer {
    ReferenceAnswer {
      criteria_1_syndromes: Some("Интоксикационный синдром".into()),
      criteria_2_epidemiological: Some("Пребывание в эндемичном районе".into()),
      criteria_3_objective_data: Some("Гепатоспленомегалия".into()),
      criteria_4_diagnosis: Some("Тропическая малярия".into()),
      criteria_5_examination_plan: Some("Толстая капля".into()),
      criteria_6_treatment_plan: None,
    }
  }

  #[test]
  fn prompt_contains_every_part_in_order() {
    let p = build_prompt(&Prompts::default(), "ТЕКСТ ЗАДАЧИ", &reference(), "мой ответ");
    let idx = |needle: &str| p.find(needle).unwrap_or_else(|| panic!("missing {needle}"));

    assert!(p.starts_with("Ты - опытный преподаватель клинической медицины"));
    assert!(idx("ТЕКСТ ЗАДАЧИ") < idx("Интоксикационный синдром"));
    assert!(idx("Интоксикационный синдром") < idx("Тропическая малярия"));
    assert!(idx("Толстая капля") < idx("ОТВЕТ СТУДЕНТА:\nмой ответ"));
    assert!(idx("мой ответ") < idx("\"overall_score\""));
    assert!(p.ends_with("Верни ТОЛЬКО валидный JSON без дополнительного текста до или после него."));
  }

  #[test]
  fn missing_criterion_uses_placeholder() {
    let p = build_prompt(&Prompts::default(), "x", &reference(), "y");
    assert!(p.contains("Критерий 6 - План лечения:\nНе указано"));
  }

  #[test]
  fn schema_lists_all_six_criteria_objects() {
    let p = build_prompt(&Prompts::default(), "x", &ReferenceAnswer::default(), "y");
    for i in 1..=6 {
      assert!(p.contains(&format!("\"criteria_{i}\": {{")), "criteria_{i} missing from schema");
    }
    for key in ["\"is_complete\"", "\"missing_points\"", "\"incorrect_points\"", "\"strengths\"", "\"recommendations\""] {
      assert!(p.contains(key));
    }
  }

  #[test]
  fn answer_with_template_keys_is_inserted_verbatim() {
    let p = build_prompt(&Prompts::default(), "x", &reference(), "{criteria_1} {case_text}");
    assert!(p.contains("ОТВЕТ СТУДЕНТА:\n{criteria_1} {case_text}"));
  }
}
