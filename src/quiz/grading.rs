use std::collections::BTreeMap;

use crate::domain::{Question, QuestionType, QuizPayload};

/// Highest score a teacher can give an open question
pub const MAX_MANUAL_SCORE: u8 = 20;

/// Result of grading the multiple-choice part of an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoGrade {
  /// Correct multiple-choice answers
  pub correct: usize,
  /// All questions, open ones included
  pub total: usize,
  /// Correctness per multiple-choice question number
  pub per_question: BTreeMap<u32, bool>,
}

/// Reduce a choice to its option letter.
///
/// "B", "b.", "B) dua" and " b. dua " all become "B". Anything else, such as
/// "A lot of water", is returned trimmed and lowercased.
pub fn normalize_choice(raw: &str) -> String {
  let trimmed = raw.trim();
  let mut chars = trimmed.chars();
  if let Some(first) = chars.next() {
    if first.is_ascii_alphabetic() {
      let rest = chars.as_str();
      if rest.is_empty() || rest.starts_with(['.', ')', ':']) {
        return first.to_ascii_uppercase().to_string();
      }
    }
  }
  trimmed.to_lowercase()
}

/// Map an answer to the option letter. An answer equal to an option's text
/// takes precedence over reading a letter off its front.
fn resolve_choice(question: &Question, raw: &str) -> String {
  let raw = raw.trim();
  question
    .options
    .iter()
    .find(|option| option_text(option).eq_ignore_ascii_case(raw))
    .map(|option| normalize_choice(option))
    .unwrap_or_else(|| normalize_choice(raw))
}

/// "B. dua" -> "dua"
fn option_text(option: &str) -> &str {
  let trimmed = option.trim();
  match trimmed.char_indices().nth(1) {
    Some((i, c)) if matches!(c, '.' | ')' | ':') => trimmed[i + 1..].trim(),
    _ => trimmed,
  }
}

/// Grade every multiple-choice question against the answer key.
///
/// Unanswered questions and questions without a key entry count as wrong.
pub fn auto_grade(payload: &QuizPayload, answers: &BTreeMap<u32, String>) -> AutoGrade {
  let mut per_question = BTreeMap::new();
  for question in &payload.latihan_soal {
    if question.kind != QuestionType::MultipleChoice {
      continue;
    }
    let correct = match (answers.get(&question.number), payload.answer_for(question.number)) {
      (Some(given), Some(key)) => {
        !given.trim().is_empty() && resolve_choice(question, given) == resolve_choice(question, &key.answer)
      }
      _ => false,
    };
    per_question.insert(question.number, correct);
  }

  AutoGrade {
    correct: per_question.values().filter(|c| **c).count(),
    total: payload.latihan_soal.len(),
    per_question,
  }
}

pub fn clamp_manual_score(raw: i64) -> u8 {
  raw.clamp(0, MAX_MANUAL_SCORE as i64) as u8
}

/// Composite 0-100 grade.
///
/// Every question carries `100 / total`. A correct multiple-choice answer
/// earns its whole share; an open question earns `score / 20` of it, and
/// nothing until it is scored.
pub fn compose_grade(
  payload: &QuizPayload,
  answers: &BTreeMap<u32, String>,
  manual_scores: &BTreeMap<u32, u8>,
) -> f64 {
  let total = payload.latihan_soal.len();
  if total == 0 {
    return 0.0;
  }
  let share = 100.0 / total as f64;
  let auto = auto_grade(payload, answers);

  let earned: f64 = payload
    .latihan_soal
    .iter()
    .map(|q| {
      if q.kind.is_open() {
        manual_scores
          .get(&q.number)
          .map(|s| share * (*s).min(MAX_MANUAL_SCORE) as f64 / MAX_MANUAL_SCORE as f64)
          .unwrap_or(0.0)
      } else if auto.per_question.get(&q.number).copied().unwrap_or(false) {
        share
      } else {
        0.0
      }
    })
    .sum();

  round2(earned.min(100.0))
}

/// True once every open question has a manual score.
pub fn grading_complete(payload: &QuizPayload, manual_scores: &BTreeMap<u32, u8>) -> bool {
  payload.open_questions().all(|q| manual_scores.contains_key(&q.number))
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}
