//! Test utilities: a scripted gateway, sample quiz data and a temp-dir store.

use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use crate::domain::{Answer, Material, Profile, Question, QuestionType, QuizPayload, Role, Session, User};
use crate::error::{PortalError, Result};
use crate::gateway::{Gateway, Method};
use crate::storage::LocalStore;

/// One request seen by [`MockGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
  pub method: Method,
  pub path: String,
  pub body: Option<Value>,
}

type Route = (Method, String);

/// Gateway answering from scripted responses.
///
/// Each route holds a queue; responses are popped in order and the last one
/// repeats. Unscripted routes fail with HTTP 404.
#[derive(Default)]
pub struct MockGateway {
  responses: Mutex<HashMap<Route, VecDeque<Result<Value>>>>,
  delays: Mutex<HashMap<Route, Duration>>,
  calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, method: Method, path: &str, response: Result<Value>) -> &Self {
    self
      .responses
      .lock()
      .unwrap()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(response);
    self
  }

  pub fn ok(&self, method: Method, path: &str, body: Value) -> &Self {
    self.respond(method, path, Ok(body))
  }

  pub fn fail(&self, method: Method, path: &str, status: u16, message: &str) -> &Self {
    self.respond(
      method,
      path,
      Err(PortalError::Http { status, message: message.to_string() }),
    )
  }

  pub fn delay(&self, method: Method, path: &str, delay: Duration) -> &Self {
    self.delays.lock().unwrap().insert((method, path.to_string()), delay);
    self
  }

  pub fn calls(&self) -> Vec<RecordedCall> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self, method: Method, path: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.method == method && c.path == path)
      .count()
  }

  pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .rev()
      .find(|c| c.method == method && c.path == path)
      .and_then(|c| c.body.clone())
  }

  fn next_response(&self, route: &Route) -> Result<Value> {
    let mut responses = self.responses.lock().unwrap();
    match responses.get_mut(route) {
      Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
      Some(queue) if !queue.is_empty() => queue[0].clone(),
      _ => Err(PortalError::Http { status: 404, message: "Not found".to_string() }),
    }
  }
}

impl Gateway for MockGateway {
  async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
    self.calls.lock().unwrap().push(RecordedCall {
      method: method.clone(),
      path: path.to_string(),
      body,
    });
    let route = (method, path.to_string());
    let delay = self.delays.lock().unwrap().get(&route).copied();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    self.next_response(&route)
  }
}

/// Test environment with a file-backed store in a temporary directory.
pub struct TestEnv {
  /// Kept alive so the store file survives for the test's duration
  temp: TempDir,
  pub store: LocalStore,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let store = LocalStore::open(&temp.path().join("portal.db")).unwrap();
    Self { temp, store }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }
}

// ==================== Sample data ====================

pub fn mc_question(number: u32) -> Question {
  Question {
    number,
    question: format!("Soal {}", number),
    kind: QuestionType::MultipleChoice,
    options: vec!["A. satu".into(), "B. dua".into(), "C. tiga".into(), "D. empat".into()],
  }
}

pub fn open_question(number: u32, kind: QuestionType) -> Question {
  Question {
    number,
    question: format!("Jelaskan {}", number),
    kind,
    options: Vec::new(),
  }
}

pub fn key(number: u32, answer: &str) -> Answer {
  Answer { number, answer: answer.to_string(), explanation: None }
}

/// `mc` multiple-choice questions (keys cycle A, B, C, D) followed by
/// `essays` essay questions.
pub fn quiz(mc: u32, essays: u32) -> QuizPayload {
  let letters = ["A", "B", "C", "D"];
  let mut payload = QuizPayload {
    rencana_belajar: "Rencana".into(),
    materi_belajar: "Materi".into(),
    ..Default::default()
  };
  for n in 1..=mc {
    payload.latihan_soal.push(mc_question(n));
    payload.kunci_jawaban.push(key(n, letters[((n - 1) % 4) as usize]));
  }
  for n in (mc + 1)..=(mc + essays) {
    payload.latihan_soal.push(open_question(n, QuestionType::Essay));
    payload.kunci_jawaban.push(key(n, "Jawaban contoh"));
  }
  payload
}

pub fn material_with(materials_id: &str, payload: QuizPayload) -> Material {
  Material {
    materials_id: materials_id.to_string(),
    subject_id: "s1".to_string(),
    nama_materi: "Pecahan".to_string(),
    content: Some(payload),
  }
}

pub fn session_for(role: Role, user_id: &str, grade: u8) -> Session {
  Session {
    is_authenticated: true,
    token: Some(format!("token-{}", user_id)),
    user: Some(User { id: user_id.to_string(), email: format!("{}@sekolah.id", user_id), grade: None }),
    profile: Some(Profile {
      role,
      grade,
      school_name: "SD 1".to_string(),
      name: user_id.to_string(),
      user_id: Some(user_id.to_string()),
    }),
  }
}

pub fn subject_json(id: &str, name: &str, class: u8) -> Value {
  json!({"subject_id": id, "name": name, "description": "", "class": class})
}

pub fn material_json(id: &str, subject_id: &str, title: &str) -> Value {
  json!({"materials_id": id, "subject_id": subject_id, "nama_materi": title})
}
