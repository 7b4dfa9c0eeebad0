//! Subject/material catalog cache.
//!
//! Holds the subject collection for the signed-in user and lazily fills in
//! each subject's materials. Fetch failures are recorded as cache state
//! (a global error for subject lists, a per-subject marker for materials)
//! instead of being returned, so every reader observes the same outcome.
//!
//! The state lock is only held between awaits, never across one, so a
//! grade fetch and an admin fetch can be in flight at the same time. Each
//! result is applied whole when it completes: the last one to finish wins.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{Material, NewAiMaterial, NewSubject, Role, Session, Subject};
use crate::endpoints;
use crate::error::{PortalError, Result};
use crate::gateway::Gateway;
use crate::normalize;

/// Which subject list a full load fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
  /// Grade-filtered list for students
  ByGrade,
  /// Unfiltered list for teachers and admins
  AdminAll,
}

impl FetchKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ByGrade => "by_grade",
      Self::AdminAll => "admin_all",
    }
  }
}

#[derive(Debug, Default)]
struct CatalogState {
  subjects: Vec<Subject>,
  loading: HashSet<FetchKind>,
  error: Option<String>,
  /// subject_id -> generation of the outstanding materials fetch
  materials_in_flight: HashMap<String, u64>,
  materials_errors: HashMap<String, String>,
  next_generation: u64,
  /// Bumped every time a full load is applied
  completed_loads: u64,
  last_source: Option<FetchKind>,
  loaded_at: Option<DateTime<Utc>>,
}

/// Shared subject/material cache. Pass it explicitly to whoever needs it.
#[derive(Debug, Default)]
pub struct CatalogCache {
  state: Mutex<CatalogState>,
}

impl CatalogCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> MutexGuard<'_, CatalogState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ==================== Full loads ====================

  /// Pick the loader from the session role: students get their grade's
  /// subjects, teachers and admins get everything.
  pub async fn load_for_session<G: Gateway>(&self, gateway: &G, session: &Session) {
    match session.role() {
      None => tracing::debug!("Not authenticated; catalog left empty"),
      Some(Role::Student) => self.load_for_grade(gateway, session.grade()).await,
      Some(_) => self.load_all_for_admin(gateway).await,
    }
  }

  pub async fn load_for_grade<G: Gateway>(&self, gateway: &G, grade: u8) {
    self
      .load_subjects(gateway, FetchKind::ByGrade, &endpoints::subjects_by_class(grade))
      .await
  }

  pub async fn load_all_for_admin<G: Gateway>(&self, gateway: &G) {
    self
      .load_subjects(gateway, FetchKind::AdminAll, endpoints::SUBJECTS_ALL)
      .await
  }

  async fn load_subjects<G: Gateway>(&self, gateway: &G, kind: FetchKind, path: &str) {
    self.state().loading.insert(kind);
    tracing::debug!(kind = kind.as_str(), "Loading subjects");

    let result = gateway.get(path).await;

    let mut state = self.state();
    state.loading.remove(&kind);
    match result {
      Ok(body) => {
        let mut subjects = normalize::subjects(&body);
        tracing::info!(kind = kind.as_str(), count = subjects.len(), "Subjects loaded");
        // Materials already fetched survive a reload of the same subject
        for subject in subjects.iter_mut() {
          if let Some(previous) = state.subjects.iter_mut().find(|s| s.subject_id == subject.subject_id) {
            if subject.materials.is_none() {
              subject.materials = previous.materials.take();
            }
          }
        }
        state
          .materials_errors
          .retain(|id, _| subjects.iter().any(|s| &s.subject_id == id));
        state.subjects = subjects;
        state.error = None;
        state.completed_loads += 1;
        state.last_source = Some(kind);
        state.loaded_at = Some(Utc::now());
      }
      Err(e) => {
        // Keep the last-known-good collection
        tracing::warn!(kind = kind.as_str(), "Failed to load subjects: {}", e);
        state.error = Some(e.user_message());
      }
    }
  }

  // ==================== Materials ====================

  /// Fetch and merge materials for one subject.
  ///
  /// No-op when the subject's materials are already loaded or a fetch for
  /// it is outstanding. Failures are recorded against that subject only.
  pub async fn load_materials_for<G: Gateway>(&self, gateway: &G, subject_id: &str) {
    let generation = {
      let mut guard = self.state();
      let state = &mut *guard;
      match state.subjects.iter().find(|s| s.subject_id == subject_id) {
        None => {
          tracing::warn!("{}", PortalError::not_found("subject", subject_id));
          return;
        }
        Some(subject) if subject.materials_loaded() => {
          tracing::debug!(subject_id, "Materials already loaded");
          return;
        }
        Some(_) => {}
      }
      if state.materials_in_flight.contains_key(subject_id) {
        tracing::debug!(subject_id, "Materials fetch already in flight");
        return;
      }
      state.next_generation += 1;
      let generation = state.next_generation;
      state.materials_in_flight.insert(subject_id.to_string(), generation);
      state.materials_errors.remove(subject_id);
      generation
    };

    let result = gateway.get(&endpoints::materials_by_subject(subject_id)).await;

    let mut guard = self.state();
    let state = &mut *guard;
    if state.materials_in_flight.get(subject_id) != Some(&generation) {
      tracing::debug!(subject_id, "Discarding stale materials response");
      return;
    }
    state.materials_in_flight.remove(subject_id);

    let Some(subject) = state.subjects.iter_mut().find(|s| s.subject_id == subject_id) else {
      tracing::warn!(subject_id, "Subject left the cache before its materials arrived");
      return;
    };

    match result {
      Ok(body) => {
        let incoming = normalize::materials(&body, subject_id);
        let added = subject.merge_materials(incoming);
        tracing::info!(subject_id, added, "Materials loaded");
      }
      Err(e) => {
        tracing::warn!(subject_id, "Failed to load materials: {}", e);
        state
          .materials_errors
          .insert(subject_id.to_string(), e.user_message());
      }
    }
  }

  /// Forget an outstanding materials fetch; its late result is ignored.
  pub fn discard_pending(&self, subject_id: &str) {
    if self.state().materials_in_flight.remove(subject_id).is_some() {
      tracing::debug!(subject_id, "Discarded pending materials fetch");
    }
  }

  // ==================== Mutations ====================

  /// Create a subject and append it without refetching the collection.
  pub async fn create_subject<G: Gateway>(&self, gateway: &G, new: &NewSubject) -> Result<Subject> {
    new.validate()?;
    let response = gateway
      .post(endpoints::SUBJECT_CREATE, serde_json::to_value(new)?)
      .await?;
    let subject = normalize::subject(unwrap_data(&response))?;

    let mut state = self.state();
    match state
      .subjects
      .iter_mut()
      .find(|s| s.subject_id == subject.subject_id)
    {
      Some(existing) => *existing = subject.clone(),
      None => state.subjects.push(subject.clone()),
    }
    tracing::info!(subject_id = %subject.subject_id, "Subject created");
    Ok(subject)
  }

  /// Request an AI-generated material for a subject.
  ///
  /// The result is merged only if that subject's materials are already
  /// loaded; otherwise the next lazy load picks it up with the rest.
  pub async fn create_ai_material<G: Gateway>(&self, gateway: &G, new: &NewAiMaterial) -> Result<Material> {
    new.validate()?;
    let response = gateway
      .post(endpoints::MATERIAL_CREATE_AI, serde_json::to_value(new)?)
      .await?;
    let material = normalize::material(unwrap_data(&response), &new.subject_id)?;

    let mut state = self.state();
    if let Some(subject) = state
      .subjects
      .iter_mut()
      .find(|s| s.subject_id == material.subject_id)
    {
      if subject.materials_loaded() {
        subject.merge_materials(vec![material.clone()]);
      }
    }
    tracing::info!(materials_id = %material.materials_id, "AI material created");
    Ok(material)
  }

  // ==================== Reads ====================

  pub fn subjects(&self) -> Vec<Subject> {
    self.state().subjects.clone()
  }

  pub fn subject(&self, subject_id: &str) -> Option<Subject> {
    self
      .state()
      .subjects
      .iter()
      .find(|s| s.subject_id == subject_id)
      .cloned()
  }

  /// Locate a material among loaded subjects, with its parent subject.
  pub fn find_material(&self, materials_id: &str) -> Result<(Subject, Material)> {
    let state = self.state();
    state
      .subjects
      .iter()
      .find_map(|s| s.material(materials_id).map(|m| (s.clone(), m.clone())))
      .ok_or_else(|| PortalError::not_found("material", materials_id))
  }

  /// True while any subject-list fetch is outstanding.
  pub fn is_loading(&self) -> bool {
    !self.state().loading.is_empty()
  }

  pub fn is_loading_kind(&self, kind: FetchKind) -> bool {
    self.state().loading.contains(&kind)
  }

  pub fn is_loading_materials(&self, subject_id: &str) -> bool {
    self.state().materials_in_flight.contains_key(subject_id)
  }

  /// Error from the most recent failed subject-list fetch.
  pub fn error(&self) -> Option<String> {
    self.state().error.clone()
  }

  pub fn materials_error(&self, subject_id: &str) -> Option<String> {
    self.state().materials_errors.get(subject_id).cloned()
  }

  pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
    self.state().loaded_at
  }

  /// Which loader produced the current collection, and when.
  pub fn loaded_from(&self) -> Option<(FetchKind, DateTime<Utc>)> {
    let state = self.state();
    state.last_source.zip(state.loaded_at)
  }

  pub fn completed_loads(&self) -> u64 {
    self.state().completed_loads
  }
}

/// Some endpoints wrap the created row as `{data: {...}}`.
fn unwrap_data(value: &Value) -> &Value {
  match value.get("data") {
    Some(inner) if inner.is_object() => inner,
    _ => value,
  }
}
