use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one student's attempt at one material's quiz.
///
/// The backend keeps exactly one record per (user_id, materials_id);
/// re-submitting overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
  pub user_id: String,
  #[serde(alias = "material_id")]
  pub materials_id: String,
  /// Composite score, 0-100
  pub grade: f64,
  /// true once every open question has a manual score
  pub status: bool,
  /// Question number -> submitted answer
  #[serde(default, alias = "user_answers")]
  pub answers: BTreeMap<u32, String>,
  /// Question number -> teacher score (0-20), open questions only
  #[serde(default, alias = "manual_grades")]
  pub manual_scores: BTreeMap<u32, u8>,
}

impl GradeRecord {
  pub fn key(&self) -> (&str, &str) {
    (&self.user_id, &self.materials_id)
  }

  pub fn is_fully_graded(&self) -> bool {
    self.status
  }
}
