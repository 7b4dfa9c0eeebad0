//! Crate-wide error type.
//!
//! Every fallible operation returns [`PortalError`]. Variants map onto the
//! failure classes callers have to react to differently: transport problems,
//! server rejections, client-side validation, and lookups that miss the
//! local cache. All of them are recoverable by re-invoking the action.

/// Errors surfaced by the portal client core.
#[derive(Debug, Clone, PartialEq)]
pub enum PortalError {
  /// Request never reached the server, timed out, or the body was not JSON
  Network(String),
  /// Server answered with a non-2xx status
  Http { status: u16, message: String },
  /// Client-side field checks failed
  Validation(String),
  /// Referenced id is not present in the local cache after loading
  NotFoundLocal { kind: &'static str, id: String },
  /// Advisory role check failed; the server stays authoritative
  Forbidden(String),
  /// Durable key-value storage failed
  Storage(String),
  /// Missing or invalid configuration
  Config(String),
}

pub type Result<T> = std::result::Result<T, PortalError>;

/// Fallback message when an error body cannot be decoded.
pub const GENERIC_REQUEST_FAILED: &str = "API request failed";

impl PortalError {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
    Self::NotFoundLocal { kind, id: id.into() }
  }

  /// HTTP status if the server produced this error.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Http { status: 404, .. } | Self::NotFoundLocal { .. })
  }

  /// Returns a user-facing message without storage or transport internals.
  pub fn user_message(&self) -> String {
    match self {
      Self::Network(_) => "Could not reach the server. Please try again.".to_string(),
      Self::Http { message, .. } => message.clone(),
      Self::Validation(msg) => msg.clone(),
      Self::NotFoundLocal { kind, .. } => format!("{} not found", capitalize(kind)),
      Self::Forbidden(_) => "You do not have permission to do that.".to_string(),
      Self::Storage(_) => "Local storage is unavailable".to_string(),
      Self::Config(msg) => msg.clone(),
    }
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

impl std::fmt::Display for PortalError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Network(err) => write!(f, "Network error: {}", err),
      Self::Http { status, message } => write!(f, "HTTP {}: {}", status, message),
      Self::Validation(msg) => write!(f, "Validation error: {}", msg),
      Self::NotFoundLocal { kind, id } => write!(f, "{} '{}' not found in cache", kind, id),
      Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
      Self::Storage(err) => write!(f, "Storage error: {}", err),
      Self::Config(msg) => write!(f, "Configuration error: {}", msg),
    }
  }
}

impl std::error::Error for PortalError {}

impl From<rusqlite::Error> for PortalError {
  fn from(err: rusqlite::Error) -> Self {
    Self::Storage(err.to_string())
  }
}

impl From<reqwest::Error> for PortalError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Network(format!("request timed out: {}", err))
    } else {
      Self::Network(err.to_string())
    }
  }
}

impl From<serde_json::Error> for PortalError {
  fn from(err: serde_json::Error) -> Self {
    Self::Network(format!("invalid JSON: {}", err))
  }
}

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
  /// Log the error at warn level and return None
  fn log_warn(self, context: &str) -> Option<T>;
  /// Log the error at warn level and return the default
  fn log_warn_default(self, context: &str) -> T
  where
    T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
  fn log_warn(self, context: &str) -> Option<T> {
    match self {
      Ok(v) => Some(v),
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        None
      }
    }
  }

  fn log_warn_default(self, context: &str) -> T
  where
    T: Default,
  {
    match self {
      Ok(v) => v,
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        T::default()
      }
    }
  }
}
