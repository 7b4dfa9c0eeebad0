//! HttpGateway against a local axum backend.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

use edu_portal::PortalError;
use edu_portal::catalog::CatalogCache;
use edu_portal::config::PortalConfig;
use edu_portal::gateway::{Gateway, HttpGateway};
use edu_portal::quiz::{QuizEngine, QuizState};
use edu_portal::session::SessionStore;
use edu_portal::storage::LocalStore;
use edu_portal::validation::Credentials;

#[derive(Clone, Default)]
struct Seen {
  auth: Arc<Mutex<Vec<Option<String>>>>,
  submitted: Arc<Mutex<Option<Value>>>,
}

impl Seen {
  fn record_auth(&self, headers: &HeaderMap) {
    let auth = headers
      .get("authorization")
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    self.auth.lock().unwrap().push(auth);
  }

  fn last_auth(&self) -> Option<String> {
    self.auth.lock().unwrap().last().cloned().flatten()
  }
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
  if body["password"] != "rahasia" {
    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid login credentials"})));
  }
  (
    StatusCode::OK,
    Json(json!({
      "session": {"access_token": "tok-live"},
      "user": {"id": "u1", "email": body["email"]},
      "profile": {"role": "student", "grade": 4, "school_name": "SD 1", "name": "Ani"}
    })),
  )
}

async fn logout() -> impl IntoResponse {
  (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "logout exploded"})))
}

async fn subjects(State(seen): State<Seen>, headers: HeaderMap, Path(class): Path<u8>) -> Json<Value> {
  seen.record_auth(&headers);
  Json(json!([{"subject_id": "s1", "name": "Matematika", "description": "", "class": class}]))
}

async fn materials(State(seen): State<Seen>, headers: HeaderMap, Path(subject_id): Path<String>) -> Json<Value> {
  seen.record_auth(&headers);
  // content arrives as an encoded JSON string
  let content = json!({
    "rencana_belajar": "Rencana",
    "materi_belajar": "Pecahan adalah bagian dari keseluruhan",
    "latihan_soal": [
      {"number": 1, "question": "1/2 + 1/2 = ?", "type": "multiple_choice", "options": ["A. 1", "B. 2"]},
      {"number": 2, "question": "Jelaskan pecahan", "type": "essay"}
    ],
    "kunci_jawaban": [
      {"number": 1, "answer": "A"},
      {"number": 2, "answer": "Bagian dari keseluruhan"}
    ]
  });
  Json(json!([{
    "materials_id": "m1",
    "subject_id": subject_id,
    "nama_materi": "Pecahan",
    "hasil_materi": content.to_string()
  }]))
}

async fn user_grade() -> impl IntoResponse {
  (StatusCode::NOT_FOUND, Json(json!({"error": "Grade not found"})))
}

async fn grade_quiz(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
  seen.record_auth(&headers);
  *seen.submitted.lock().unwrap() = Some(body);
  Json(json!({"message": "Grade saved"}))
}

async fn whoami(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
  seen.record_auth(&headers);
  Json(json!({"ok": true}))
}

fn app(seen: Seen) -> Router {
  Router::new()
    .route("/login", post(login))
    .route("/logout", post(logout))
    .route("/subject/get-subjects-by-class/{class}", get(subjects))
    .route("/materials/get-materials-by-subject/{subject_id}", get(materials))
    .route("/grade/user/{user_id}/{materials_id}", get(user_grade))
    .route("/grade/grade-quiz", post(grade_quiz))
    .route("/whoami", get(whoami))
    .route("/broken", get(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }))
    .route("/not-json", get(|| async { "hello" }))
    .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
    .with_state(seen)
}

async fn spawn(app: Router) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  format!("http://{}", addr)
}

fn gateway_for(base_url: &str, store: &LocalStore) -> HttpGateway {
  let config = PortalConfig::with_base_url(base_url).unwrap();
  HttpGateway::new(&config, store.clone()).unwrap()
}

#[tokio::test]
async fn test_student_flow_end_to_end() {
  let seen = Seen::default();
  let base = spawn(app(seen.clone())).await;
  let store = LocalStore::open_in_memory().unwrap();
  let gateway = gateway_for(&base, &store);
  let mut sessions = SessionStore::restore(store.clone());

  let session = sessions
    .login(&gateway, &Credentials::new("ani@sekolah.id", "rahasia"))
    .await
    .unwrap();
  assert_eq!(session.grade(), 4);

  let cache = CatalogCache::new();
  cache.load_for_session(&gateway, &session).await;
  assert_eq!(seen.last_auth().as_deref(), Some("Bearer tok-live"));
  assert_eq!(cache.subjects().len(), 1);

  cache.load_materials_for(&gateway, "s1").await;
  let (_, material) = cache.find_material("m1").unwrap();
  assert_eq!(material.content.as_ref().map(|c| c.latihan_soal.len()), Some(2));

  let mut engine = QuizEngine::open(&gateway, &session, &material).await.unwrap();
  assert_eq!(engine.state(), &QuizState::NotStarted);
  assert!(engine.view().answer_key.is_none());

  engine.set_answer(1, "a. 1").unwrap();
  engine.set_answer(2, "Bagian dari satu benda").unwrap();
  let record = engine.submit(&gateway).await.unwrap();
  assert_eq!(record.grade, 50.0);
  assert!(!record.status);

  let submitted = seen.submitted.lock().unwrap().clone().unwrap();
  assert_eq!(submitted["user_id"], "u1");
  assert_eq!(submitted["materials_id"], "m1");
  assert_eq!(submitted["answers"]["1"], "a. 1");

  sessions.logout(&gateway).await;
  assert!(store.keys().unwrap().is_empty());

  gateway.get("/whoami").await.unwrap();
  assert_eq!(seen.last_auth(), None);
}

#[tokio::test]
async fn test_rejected_login_surfaces_server_message() {
  let base = spawn(app(Seen::default())).await;
  let store = LocalStore::open_in_memory().unwrap();
  let gateway = gateway_for(&base, &store);
  let mut sessions = SessionStore::restore(store.clone());

  let err = sessions
    .login(&gateway, &Credentials::new("ani@sekolah.id", "salah"))
    .await
    .unwrap_err();
  assert_eq!(
    err,
    PortalError::Http { status: 401, message: "Invalid login credentials".into() }
  );
  assert!(store.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_error_bodies_and_empty_responses() {
  let base = spawn(app(Seen::default())).await;
  let store = LocalStore::open_in_memory().unwrap();
  let gateway = gateway_for(&base, &store);

  let err = gateway.get("/broken").await.unwrap_err();
  assert_eq!(err, PortalError::Http { status: 502, message: "API request failed".into() });

  assert!(matches!(gateway.get("/not-json").await, Err(PortalError::Network(_))));
  assert_eq!(gateway.get("/empty").await.unwrap(), Value::Null);

  let err = gateway.get("/no-such-route").await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let store = LocalStore::open_in_memory().unwrap();
  let gateway = gateway_for(&format!("http://{}", addr), &store);
  assert!(matches!(gateway.get("/login").await, Err(PortalError::Network(_))));
}
