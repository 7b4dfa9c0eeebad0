//! Client session store.
//!
//! Holds the one live [`Session`] and mirrors every change into the durable
//! store under `session_token`, `user_data` and `user_profile`. On start the
//! session is rehydrated from those keys; anything missing or malformed
//! yields an unauthenticated session.

use serde_json::Value;

use crate::domain::{Profile, Session, User};
use crate::endpoints;
use crate::error::{LogOnError, Result};
use crate::gateway::{Gateway, Method};
use crate::normalize;
use crate::storage::{LocalStore, SESSION_KEYS, SESSION_TOKEN_KEY, USER_DATA_KEY, USER_PROFILE_KEY};
use crate::validation::{Credentials, RegistrationForm};

pub struct SessionStore {
  store: LocalStore,
  current: Session,
}

impl SessionStore {
  /// Rehydrate the session persisted in `store`.
  pub fn restore(store: LocalStore) -> Self {
    let current = load_persisted(&store);
    if current.is_authenticated {
      tracing::info!(user_id = current.user_id().unwrap_or("?"), "Restored persisted session");
    } else {
      tracing::debug!("No persisted session");
    }
    Self { store, current }
  }

  pub fn current(&self) -> &Session {
    &self.current
  }

  pub fn store(&self) -> &LocalStore {
    &self.store
  }

  /// Authenticate and persist the new session.
  ///
  /// On failure the previous session (and its stored keys) is left as is.
  /// Concurrent logins are last-write-wins.
  pub async fn login<G: Gateway>(&mut self, gateway: &G, credentials: &Credentials) -> Result<Session> {
    credentials.validate()?;

    let response = gateway
      .post(endpoints::LOGIN, serde_json::to_value(credentials)?)
      .await?;
    let session = normalize::login_response(&response)?;

    persist(&self.store, &session)?;
    tracing::info!(
      user_id = session.user_id().unwrap_or("?"),
      role = session.role().map(|r| r.as_str()).unwrap_or("none"),
      "Logged in"
    );
    self.current = session.clone();
    Ok(session)
  }

  /// Register a new account. Does not log in.
  pub async fn signup<G: Gateway>(&self, gateway: &G, form: &RegistrationForm) -> Result<Value> {
    form.validate()?;
    let response = gateway
      .post(endpoints::SIGNUP, serde_json::to_value(form.to_signup())?)
      .await?;
    tracing::info!("Signup accepted for {}", form.email.trim());
    Ok(response)
  }

  /// Notify the backend, then clear the local session no matter how the
  /// notification went. The request still carries the old token.
  pub async fn logout<G: Gateway>(&mut self, gateway: &G) {
    match gateway.request(Method::POST, endpoints::LOGOUT, None).await {
      Ok(_) => tracing::info!("Logout successful"),
      Err(e) => tracing::warn!("Logout API error (local session cleared anyway): {}", e),
    }
    self.invalidate();
  }

  /// Drop the local session without contacting the backend.
  pub fn invalidate(&mut self) {
    self
      .store
      .remove_many(&SESSION_KEYS)
      .log_warn("Failed to clear persisted session");
    self.current = Session::unauthenticated();
  }
}

fn persist(store: &LocalStore, session: &Session) -> Result<()> {
  match &session.token {
    Some(token) => store.set(SESSION_TOKEN_KEY, token)?,
    None => store.remove(SESSION_TOKEN_KEY)?,
  }
  match &session.user {
    Some(user) => store.set(USER_DATA_KEY, &serde_json::to_string(user)?)?,
    None => store.remove(USER_DATA_KEY)?,
  }
  match &session.profile {
    Some(profile) => store.set(USER_PROFILE_KEY, &serde_json::to_string(profile)?)?,
    None => store.remove(USER_PROFILE_KEY)?,
  }
  Ok(())
}

fn load_persisted(store: &LocalStore) -> Session {
  let Some(token) = store
    .get(SESSION_TOKEN_KEY)
    .log_warn("Failed to read session token")
    .flatten()
  else {
    return Session::unauthenticated();
  };

  let user = store
    .get(USER_DATA_KEY)
    .log_warn("Failed to read user_data")
    .flatten()
    .and_then(|raw| serde_json::from_str::<User>(&raw).log_warn("Malformed user_data"));

  let Some(user) = user else {
    return Session::unauthenticated();
  };

  let profile = store
    .get(USER_PROFILE_KEY)
    .log_warn("Failed to read user_profile")
    .flatten()
    .and_then(|raw| serde_json::from_str::<Profile>(&raw).log_warn("Malformed user_profile"));

  Session {
    is_authenticated: true,
    token: Some(token),
    user: Some(user),
    profile,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Role;
  use crate::error::PortalError;
  use crate::testing::{MockGateway, TestEnv};
  use serde_json::json;

  fn login_body() -> Value {
    json!({
      "session": {"access_token": "tok-1"},
      "user": {"id": "u1", "email": "ani@sekolah.id"},
      "profile": {"role": "student", "grade": 4, "school_name": "SD 1", "name": "Ani"}
    })
  }

  #[tokio::test]
  async fn test_login_persists_all_keys() {
    let env = TestEnv::new();
    let gateway = MockGateway::new();
    gateway.ok(Method::POST, endpoints::LOGIN, login_body());

    let mut sessions = SessionStore::restore(env.store.clone());
    assert!(!sessions.current().is_authenticated);

    let session = sessions
      .login(&gateway, &Credentials::new("ani@sekolah.id", "rahasia"))
      .await
      .unwrap();
    assert_eq!(session.role(), Some(Role::Student));

    let mut keys = env.store.keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["session_token", "user_data", "user_profile"]);

    let body = gateway.last_body(Method::POST, endpoints::LOGIN).unwrap();
    assert_eq!(body["email"], "ani@sekolah.id");
  }

  #[tokio::test]
  async fn test_restore_after_reload() {
    let env = TestEnv::new();
    let gateway = MockGateway::new();
    gateway.ok(Method::POST, endpoints::LOGIN, login_body());
    {
      let mut sessions = SessionStore::restore(env.store.clone());
      sessions.login(&gateway, &Credentials::new("ani@sekolah.id", "rahasia")).await.unwrap();
    }

    // a fresh connection to the same file, as after a restart
    let reopened = LocalStore::open(&env.path().join("portal.db")).unwrap();
    let reloaded = SessionStore::restore(reopened);
    let session = reloaded.current();
    assert!(session.is_authenticated);
    assert_eq!(session.user_id(), Some("u1"));
    assert_eq!(session.grade(), 4);
  }

  #[test]
  fn test_restore_malformed_is_unauthenticated() {
    let env = TestEnv::new();
    env.store.set(SESSION_TOKEN_KEY, "tok").unwrap();
    env.store.set(USER_DATA_KEY, "{not json").unwrap();

    let sessions = SessionStore::restore(env.store.clone());
    assert_eq!(sessions.current(), &Session::unauthenticated());
  }

  #[tokio::test]
  async fn test_failed_login_keeps_previous_session() {
    let env = TestEnv::new();
    let gateway = MockGateway::new();
    gateway.ok(Method::POST, endpoints::LOGIN, login_body());
    let mut sessions = SessionStore::restore(env.store.clone());
    sessions.login(&gateway, &Credentials::new("ani@sekolah.id", "rahasia")).await.unwrap();

    let failing = MockGateway::new();
    failing.fail(Method::POST, endpoints::LOGIN, 401, "Invalid login credentials");
    let err = sessions
      .login(&failing, &Credentials::new("ani@sekolah.id", "salah"))
      .await
      .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(sessions.current().user_id(), Some("u1"));
    assert_eq!(env.store.get(SESSION_TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));
  }

  #[tokio::test]
  async fn test_login_validation_skips_network() {
    let env = TestEnv::new();
    let gateway = MockGateway::new();
    let mut sessions = SessionStore::restore(env.store.clone());
    let err = sessions.login(&gateway, &Credentials::new("", "")).await.unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
    assert!(gateway.calls().is_empty());
  }

  #[tokio::test]
  async fn test_logout_clears_keys_even_when_server_fails() {
    let env = TestEnv::new();
    let gateway = MockGateway::new();
    gateway.ok(Method::POST, endpoints::LOGIN, login_body());
    gateway.respond(
      Method::POST,
      endpoints::LOGOUT,
      Err(PortalError::Network("connection refused".into())),
    );

    let mut sessions = SessionStore::restore(env.store.clone());
    sessions.login(&gateway, &Credentials::new("ani@sekolah.id", "rahasia")).await.unwrap();
    sessions.logout(&gateway).await;

    assert_eq!(gateway.call_count(Method::POST, endpoints::LOGOUT), 1);
    assert!(env.store.keys().unwrap().is_empty());
    assert!(!sessions.current().is_authenticated);
  }

  #[tokio::test]
  async fn test_signup_validates_before_posting() {
    let env = TestEnv::new();
    let gateway = MockGateway::new();
    gateway.ok(Method::POST, endpoints::SIGNUP, json!({"user_id": "u9"}));
    let sessions = SessionStore::restore(env.store.clone());

    let mut form = RegistrationForm {
      email: "budi@sekolah.id".into(),
      password: "rahasia".into(),
      confirm_password: "rahasia".into(),
      name: "Budi".into(),
      role: Role::Student,
      grade: 3,
      school_name: "SD 2".into(),
    };
    sessions.signup(&gateway, &form).await.unwrap();
    assert_eq!(gateway.call_count(Method::POST, endpoints::SIGNUP), 1);

    form.confirm_password = "lain".into();
    assert!(sessions.signup(&gateway, &form).await.is_err());
    assert_eq!(gateway.call_count(Method::POST, endpoints::SIGNUP), 1);
    assert!(!sessions.current().is_authenticated);
  }
}
