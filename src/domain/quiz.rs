use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{PortalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  #[serde(alias = "multiple-choice", alias = "multiplechoice")]
  MultipleChoice,
  #[serde(alias = "short-answer")]
  ShortAnswer,
  Essay,
}

impl QuestionType {
  /// Short-answer and essay questions need a teacher's score.
  pub fn is_open(&self) -> bool {
    !matches!(self, Self::MultipleChoice)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  pub number: u32,
  pub question: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  /// Only present for multiple choice
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
  pub number: u32,
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

/// Generated study content attached to a material (`hasil_materi`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizPayload {
  #[serde(default)]
  pub rencana_belajar: String,
  #[serde(default)]
  pub materi_belajar: String,
  #[serde(default)]
  pub latihan_soal: Vec<Question>,
  #[serde(default)]
  pub kunci_jawaban: Vec<Answer>,
}

impl QuizPayload {
  pub fn question(&self, number: u32) -> Option<&Question> {
    self.latihan_soal.iter().find(|q| q.number == number)
  }

  pub fn answer_for(&self, number: u32) -> Option<&Answer> {
    self.kunci_jawaban.iter().find(|a| a.number == number)
  }

  pub fn open_questions(&self) -> impl Iterator<Item = &Question> {
    self.latihan_soal.iter().filter(|q| q.kind.is_open())
  }

  pub fn has_open_questions(&self) -> bool {
    self.open_questions().next().is_some()
  }

  /// Question numbers are unique and every answer refers to exactly one question.
  pub fn validate(&self) -> Result<()> {
    let mut numbers = HashSet::new();
    for q in &self.latihan_soal {
      if !numbers.insert(q.number) {
        return Err(PortalError::validation(format!(
          "duplicate question number {}",
          q.number
        )));
      }
    }

    let mut answered = HashSet::new();
    for a in &self.kunci_jawaban {
      if !numbers.contains(&a.number) {
        return Err(PortalError::validation(format!(
          "answer key entry {} has no matching question",
          a.number
        )));
      }
      if !answered.insert(a.number) {
        return Err(PortalError::validation(format!(
          "duplicate answer key entry {}",
          a.number
        )));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mc(number: u32) -> Question {
    Question {
      number,
      question: format!("Q{}", number),
      kind: QuestionType::MultipleChoice,
      options: vec!["A. one".into(), "B. two".into()],
    }
  }

  #[test]
  fn test_parse_payload() {
    let json = r#"{
      "rencana_belajar": "Minggu 1",
      "materi_belajar": "Pecahan",
      "latihan_soal": [
        {"number": 1, "question": "1/2 + 1/4?", "type": "multiple_choice", "options": ["A. 3/4", "B. 2/6"]},
        {"number": 2, "question": "Jelaskan pecahan", "type": "essay"}
      ],
      "kunci_jawaban": [
        {"number": 1, "answer": "A", "explanation": "samakan penyebut"},
        {"number": 2, "answer": "Bagian dari keseluruhan"}
      ]
    }"#;
    let payload: QuizPayload = serde_json::from_str(json).unwrap();
    assert_eq!(payload.latihan_soal.len(), 2);
    assert_eq!(payload.latihan_soal[1].kind, QuestionType::Essay);
    assert!(payload.latihan_soal[1].options.is_empty());
    assert!(payload.has_open_questions());
    assert_eq!(payload.answer_for(1).unwrap().answer, "A");
    assert!(payload.validate().is_ok());
  }

  #[test]
  fn test_validate_duplicate_question() {
    let payload = QuizPayload {
      latihan_soal: vec![mc(1), mc(1)],
      ..Default::default()
    };
    assert!(payload.validate().is_err());
  }

  #[test]
  fn test_validate_orphan_and_duplicate_answers() {
    let orphan = QuizPayload {
      latihan_soal: vec![mc(1)],
      kunci_jawaban: vec![Answer { number: 7, answer: "A".into(), explanation: None }],
      ..Default::default()
    };
    assert!(orphan.validate().is_err());

    let twice = QuizPayload {
      latihan_soal: vec![mc(1)],
      kunci_jawaban: vec![
        Answer { number: 1, answer: "A".into(), explanation: None },
        Answer { number: 1, answer: "B".into(), explanation: None },
      ],
      ..Default::default()
    };
    assert!(twice.validate().is_err());
  }

  #[test]
  fn test_question_type_aliases() {
    let kind: QuestionType = serde_json::from_str("\"short-answer\"").unwrap();
    assert_eq!(kind, QuestionType::ShortAnswer);
    assert!(kind.is_open());
    assert!(!QuestionType::MultipleChoice.is_open());
  }
}
