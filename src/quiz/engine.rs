//! Quiz attempt lifecycle for one (user, material) pair, plus the teacher's
//! submission listing and manual grading form.

use serde_json::json;
use std::collections::BTreeMap;

use super::grading::{self, clamp_manual_score};
use crate::domain::{Answer, GradeRecord, Material, Question, QuizPayload, Role, Session};
use crate::endpoints;
use crate::error::{PortalError, Result};
use crate::gateway::Gateway;
use crate::normalize;

#[derive(Debug, Clone, PartialEq)]
pub enum QuizState {
  NotStarted,
  InProgress,
  Submitted(GradeRecord),
  /// Every open question carries a teacher score
  ManuallyGraded(GradeRecord),
}

impl QuizState {
  pub fn record(&self) -> Option<&GradeRecord> {
    match self {
      Self::Submitted(record) | Self::ManuallyGraded(record) => Some(record),
      _ => None,
    }
  }

  pub fn is_submitted(&self) -> bool {
    self.record().is_some()
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NotStarted => "not_started",
      Self::InProgress => "in_progress",
      Self::Submitted(_) => "submitted",
      Self::ManuallyGraded(_) => "manually_graded",
    }
  }

  fn from_record(record: GradeRecord, payload: &QuizPayload) -> Self {
    if record.status && payload.has_open_questions() {
      Self::ManuallyGraded(record)
    } else {
      Self::Submitted(record)
    }
  }
}

/// What the quiz screen may show to the current user.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizView {
  pub title: String,
  pub rencana_belajar: String,
  pub materi_belajar: String,
  pub questions: Vec<Question>,
  pub answers: BTreeMap<u32, String>,
  pub state: &'static str,
  /// Teachers and admins always; students only after submitting
  pub answer_key: Option<Vec<Answer>>,
  /// Multiple-choice correctness, shown together with the key
  pub per_question: Option<BTreeMap<u32, bool>>,
  /// The viewer's own record
  pub record: Option<GradeRecord>,
}

pub struct QuizEngine {
  user_id: String,
  role: Role,
  material: Material,
  payload: QuizPayload,
  answers: BTreeMap<u32, String>,
  state: QuizState,
}

impl QuizEngine {
  /// Load the quiz for `material`. Students also get their existing record,
  /// if any; a 404 or empty body means they have not attempted it yet.
  pub async fn open<G: Gateway>(gateway: &G, session: &Session, material: &Material) -> Result<Self> {
    let (Some(role), Some(user_id)) = (session.role(), session.user_id()) else {
      return Err(PortalError::Forbidden("Sign in to take a quiz".into()));
    };
    let payload = material
      .content
      .clone()
      .ok_or_else(|| PortalError::not_found("quiz", &material.materials_id))?;
    payload.validate()?;

    let mut engine = Self {
      user_id: user_id.to_string(),
      role,
      material: material.clone(),
      payload,
      answers: BTreeMap::new(),
      state: QuizState::NotStarted,
    };

    if role == Role::Student {
      let path = endpoints::user_grade(user_id, &material.materials_id);
      let existing = match gateway.get(&path).await {
        Ok(body) => normalize::grade_record(&body)?,
        Err(e) if e.status() == Some(404) => None,
        Err(e) => return Err(e),
      };
      if let Some(record) = existing {
        tracing::debug!(user_id, materials_id = %material.materials_id, "Found existing attempt");
        engine.answers = record.answers.clone();
        engine.state = QuizState::from_record(record, &engine.payload);
      }
    }
    Ok(engine)
  }

  pub fn state(&self) -> &QuizState {
    &self.state
  }

  pub fn answers(&self) -> &BTreeMap<u32, String> {
    &self.answers
  }

  pub fn material(&self) -> &Material {
    &self.material
  }

  pub fn set_answer(&mut self, number: u32, answer: impl Into<String>) -> Result<()> {
    if self.state.is_submitted() {
      return Err(PortalError::validation("Quiz already submitted. Retake it to change answers."));
    }
    if self.payload.question(number).is_none() {
      return Err(PortalError::validation(format!("Question {} does not exist", number)));
    }
    self.answers.insert(number, answer.into());
    self.state = QuizState::InProgress;
    Ok(())
  }

  /// Reopen a submitted quiz, keeping the previous answers as a start.
  pub fn retake(&mut self) -> Result<()> {
    if !self.state.is_submitted() {
      return Err(PortalError::validation("Nothing to retake yet"));
    }
    self.state = QuizState::InProgress;
    Ok(())
  }

  /// Grade locally and send the record. The state only moves once the
  /// server has accepted it; a failed submit can simply be retried.
  pub async fn submit<G: Gateway>(&mut self, gateway: &G) -> Result<GradeRecord> {
    match self.state {
      QuizState::InProgress => {}
      QuizState::NotStarted => return Err(PortalError::validation("Answer at least one question first")),
      _ => return Err(PortalError::validation("Quiz already submitted")),
    }

    let no_scores = BTreeMap::new();
    let record = GradeRecord {
      user_id: self.user_id.clone(),
      materials_id: self.material.materials_id.clone(),
      grade: grading::compose_grade(&self.payload, &self.answers, &no_scores),
      status: grading::grading_complete(&self.payload, &no_scores),
      answers: self.answers.clone(),
      manual_scores: no_scores,
    };

    let body = json!({
      "user_id": record.user_id,
      "materials_id": record.materials_id,
      "grade": record.grade,
      "status": record.status,
      "answers": record.answers,
      // a resubmission replaces any earlier teacher scores
      "manual_scores": record.manual_scores,
    });
    gateway.post(endpoints::GRADE_SUBMIT, body).await?;

    tracing::info!(
      user_id = %record.user_id,
      materials_id = %record.materials_id,
      grade = record.grade,
      status = record.status,
      "Quiz submitted"
    );
    self.state = QuizState::Submitted(record.clone());
    Ok(record)
  }

  pub fn view(&self) -> QuizView {
    let reveal = self.role.can_manage() || self.state.is_submitted();
    QuizView {
      title: self.material.title().to_string(),
      rencana_belajar: self.payload.rencana_belajar.clone(),
      materi_belajar: self.payload.materi_belajar.clone(),
      questions: self.payload.latihan_soal.clone(),
      answers: self.answers.clone(),
      state: self.state.as_str(),
      answer_key: reveal.then(|| self.payload.kunci_jawaban.clone()),
      per_question: reveal.then(|| grading::auto_grade(&self.payload, &self.answers).per_question),
      record: self.state.record().cloned(),
    }
  }
}

fn require_manager(session: &Session, action: &str) -> Result<()> {
  match session.role() {
    Some(role) if role.can_manage() => Ok(()),
    _ => Err(PortalError::Forbidden(format!("Only teachers and admins can {}", action))),
  }
}

/// All student records for a material. Teachers and admins only.
pub async fn list_submissions<G: Gateway>(
  gateway: &G,
  session: &Session,
  materials_id: &str,
) -> Result<Vec<GradeRecord>> {
  require_manager(session, "view submissions")?;
  let body = gateway.get(&endpoints::material_grades(materials_id)).await?;
  let records = normalize::grade_records(&body);
  tracing::debug!(materials_id, count = records.len(), "Loaded submissions");
  Ok(records)
}

/// Teacher form for scoring the open questions of one submission.
#[derive(Debug, Clone)]
pub struct ManualGrading {
  record: GradeRecord,
  payload: QuizPayload,
  scores: BTreeMap<u32, u8>,
}

impl ManualGrading {
  /// Seed the form from the record's existing scores, if any.
  pub fn open(record: GradeRecord, payload: QuizPayload) -> Self {
    let scores = record
      .manual_scores
      .iter()
      .filter(|(number, _)| payload.question(**number).is_some_and(|q| q.kind.is_open()))
      .map(|(number, score)| (*number, (*score).min(grading::MAX_MANUAL_SCORE)))
      .collect();
    Self { record, payload, scores }
  }

  pub fn record(&self) -> &GradeRecord {
    &self.record
  }

  pub fn scores(&self) -> &BTreeMap<u32, u8> {
    &self.scores
  }

  /// Open questions that still need a score, in order.
  pub fn pending(&self) -> Vec<&Question> {
    self
      .payload
      .open_questions()
      .filter(|q| !self.scores.contains_key(&q.number))
      .collect()
  }

  /// Record a score, clamped into 0-20. Returns the stored value.
  pub fn set_score(&mut self, number: u32, raw: i64) -> Result<u8> {
    match self.payload.question(number) {
      Some(q) if q.kind.is_open() => {
        let score = clamp_manual_score(raw);
        self.scores.insert(number, score);
        Ok(score)
      }
      Some(_) => Err(PortalError::validation(format!(
        "Question {} is multiple choice and graded automatically",
        number
      ))),
      None => Err(PortalError::validation(format!("Question {} does not exist", number))),
    }
  }

  pub fn preview_grade(&self) -> f64 {
    grading::compose_grade(&self.payload, &self.record.answers, &self.scores)
  }

  pub fn is_complete(&self) -> bool {
    grading::grading_complete(&self.payload, &self.scores)
  }

  /// Recompute the grade with the current scores and update the record.
  pub async fn submit<G: Gateway>(&mut self, gateway: &G, session: &Session) -> Result<GradeRecord> {
    require_manager(session, "grade submissions")?;

    let grade = self.preview_grade();
    let status = self.is_complete();
    let body = json!({
      "grade": grade,
      "status": status,
      "manual_scores": self.scores,
    });
    let path = endpoints::update_grade(&self.record.user_id, &self.record.materials_id);
    gateway.put(&path, body).await?;

    self.record.grade = grade;
    self.record.status = status;
    self.record.manual_scores = self.scores.clone();
    tracing::info!(
      user_id = %self.record.user_id,
      materials_id = %self.record.materials_id,
      grade,
      status,
      "Manual grades saved"
    );
    Ok(self.record.clone())
  }
}
