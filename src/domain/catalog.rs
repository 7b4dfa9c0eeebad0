use serde::{Deserialize, Serialize};

use super::quiz::QuizPayload;
use crate::error::{PortalError, Result};

/// Lowest and highest school grade a subject can be scoped to
pub const MIN_CLASS: u8 = 1;
pub const MAX_CLASS: u8 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub class: u8,
  /// `None` until fetched; `Some(vec![])` means fetched and empty
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub materials: Option<Vec<Material>>,
}

impl Subject {
  pub fn materials_loaded(&self) -> bool {
    self.materials.is_some()
  }

  /// Merge fetched materials by `materials_id`. Existing entries are updated
  /// in place, new ones appended; the list never holds duplicate ids.
  /// Returns the number of newly added materials.
  pub fn merge_materials(&mut self, incoming: Vec<Material>) -> usize {
    let list = self.materials.get_or_insert_with(Vec::new);
    let mut added = 0;
    for mut material in incoming {
      if material.subject_id.is_empty() {
        material.subject_id = self.subject_id.clone();
      }
      match list
        .iter_mut()
        .find(|m| m.materials_id == material.materials_id)
      {
        Some(existing) => *existing = material,
        None => {
          list.push(material);
          added += 1;
        }
      }
    }
    added
  }

  pub fn material(&self, materials_id: &str) -> Option<&Material> {
    self
      .materials
      .as_ref()
      .and_then(|list| list.iter().find(|m| m.materials_id == materials_id))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
  pub materials_id: String,
  pub subject_id: String,
  pub nama_materi: String,
  /// Parsed `hasil_materi`; `None` when absent or unparseable
  #[serde(default, rename = "hasil_materi", skip_serializing_if = "Option::is_none")]
  pub content: Option<QuizPayload>,
}

impl Material {
  pub fn title(&self) -> &str {
    if self.nama_materi.is_empty() {
      "Material"
    } else {
      &self.nama_materi
    }
  }
}

/// Language requested for AI-generated content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bahasa {
  #[default]
  #[serde(alias = "indonesian")]
  Indonesia,
  English,
}

impl Bahasa {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "indonesia" | "indonesian" | "id" => Some(Self::Indonesia),
      "english" | "en" => Some(Self::English),
      _ => None,
    }
  }

  /// Spelling the video service expects ("indonesian" rather than "indonesia")
  pub fn video_code(&self) -> &'static str {
    match self {
      Self::Indonesia => "indonesian",
      Self::English => "english",
    }
  }
}

/// Body for `POST /subject/post-subject`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSubject {
  pub name: String,
  pub description: String,
  pub class: u8,
}

impl NewSubject {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(PortalError::validation("Subject name is required"));
    }
    if !(MIN_CLASS..=MAX_CLASS).contains(&self.class) {
      return Err(PortalError::validation(format!(
        "Class must be between {} and {}",
        MIN_CLASS, MAX_CLASS
      )));
    }
    Ok(())
  }
}

/// Body for `POST /materials/post-ai`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAiMaterial {
  pub title: String,
  pub bahasa: Bahasa,
  pub subject_id: String,
}

impl NewAiMaterial {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(PortalError::validation("Material title is required"));
    }
    if self.subject_id.trim().is_empty() {
      return Err(PortalError::validation("Subject is required"));
    }
    Ok(())
  }
}
