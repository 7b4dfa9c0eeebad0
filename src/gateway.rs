//! Remote data gateway - the single chokepoint for network access.
//!
//! Components never issue HTTP requests themselves; they take a [`Gateway`]
//! and call [`Gateway::request`]. [`HttpGateway`] is the production
//! implementation; tests substitute a scripted gateway.

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::future::Future;

use crate::config::PortalConfig;
use crate::error::{GENERIC_REQUEST_FAILED, LogOnError, PortalError, Result};
use crate::storage::{LocalStore, SESSION_TOKEN_KEY};

pub use reqwest::Method;

/// Issues authenticated JSON requests against the backend.
///
/// No retries: the caller decides whether to invoke the action again.
pub trait Gateway: Send + Sync {
  fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> impl Future<Output = Result<Value>> + Send;

  fn get(&self, path: &str) -> impl Future<Output = Result<Value>> + Send {
    self.request(Method::GET, path, None)
  }

  fn post(&self, path: &str, body: Value) -> impl Future<Output = Result<Value>> + Send {
    self.request(Method::POST, path, Some(body))
  }

  fn put(&self, path: &str, body: Value) -> impl Future<Output = Result<Value>> + Send {
    self.request(Method::PUT, path, Some(body))
  }

  fn delete(&self, path: &str) -> impl Future<Output = Result<Value>> + Send {
    self.request(Method::DELETE, path, None)
  }
}

/// reqwest-backed gateway. The bearer token is read from the durable store
/// on every request, so login/logout take effect without rebuilding it.
#[derive(Clone)]
pub struct HttpGateway {
  http: reqwest::Client,
  base_url: String,
  store: LocalStore,
}

impl HttpGateway {
  pub fn new(config: &PortalConfig, store: LocalStore) -> Result<Self> {
    let http = reqwest::Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      http,
      base_url: config.base_url.clone(),
      store,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    if path.starts_with('/') {
      format!("{}{}", self.base_url, path)
    } else {
      format!("{}/{}", self.base_url, path)
    }
  }
}

impl Gateway for HttpGateway {
  async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
    let token = self
      .store
      .get(SESSION_TOKEN_KEY)
      .log_warn("Failed to read session token")
      .flatten();

    let mut req = self.http.request(method.clone(), self.url(path));
    if let Some(token) = token {
      req = req.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(body) = body {
      req = req.json(&body);
    }

    tracing::debug!(%method, path, "Gateway request");
    let resp = req.send().await.map_err(|e| {
      tracing::warn!(%method, path, error = %e, "Request did not complete");
      PortalError::from(e)
    })?;

    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
      let message = error_message(&text);
      tracing::warn!(%method, path, status = status.as_u16(), "Request failed: {}", message);
      return Err(PortalError::Http {
        status: status.as_u16(),
        message,
      });
    }

    decode_body(&text)
  }
}

/// Pull a human-readable message out of an error body.
pub fn error_message(body: &str) -> String {
  let Ok(value) = serde_json::from_str::<Value>(body) else {
    return GENERIC_REQUEST_FAILED.to_string();
  };
  ["error", "message", "detail"]
    .iter()
    .find_map(|key| match value.get(key) {
      Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
      Some(Value::Object(inner)) => inner
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string),
      _ => None,
    })
    .unwrap_or_else(|| GENERIC_REQUEST_FAILED.to_string())
}

/// Decode a successful body; empty bodies become `null`.
fn decode_body(body: &str) -> Result<Value> {
  if body.trim().is_empty() {
    return Ok(Value::Null);
  }
  Ok(serde_json::from_str(body)?)
}
