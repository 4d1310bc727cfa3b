//! Case text rendering. The output is shown to the student and embedded verbatim
//! in the grading prompt, so it must stay byte-for-byte stable for a given case.

use crate::domain::Case;

/// Render a case as the numbered narrative block followed by its task list.
/// Missing narrative fields render as empty strings.
pub fn format_case(case: &Case) -> String {
  let field = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();

  let mut out = String::new();
  out.push_str(&format!("1. Кто заболел: {}", field(&case.patient_info)));
  out.push_str(&format!("\n2. Жалобы: {}", field(&case.complaints)));
  out.push_str(&format!("\n3. Anamnesis morbi: {}", field(&case.anamnesis_morbi)));
  out.push_str(&format!("\n4. Эпидемиологический анамнез: {}", field(&case.epidemiological_history)));
  out.push_str(&format!("\n5. Объективные данные: {}", field(&case.objective_data)));
  out.push_str(&format!("\n6. Лабораторные данные: {}", field(&case.laboratory_data)));
  out.push_str("\n\nЗадания:");

  for (i, item) in case.tasks.iter().enumerate() {
    out.push_str(&format!("\n{}. {}", i + 1, item));
  }
  out
}
