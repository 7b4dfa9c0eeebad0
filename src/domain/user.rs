use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
  #[default]
  Student,
  Teacher,
  Admin,
}

impl Role {
  /// Unknown roles fall back to the least privileged one.
  pub fn from_str(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "teacher" => Self::Teacher,
      "admin" => Self::Admin,
      _ => Self::Student,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::Teacher => "teacher",
      Self::Admin => "admin",
    }
  }

  /// Teachers and admins see answer keys, all submissions and the full catalog.
  pub fn can_manage(&self) -> bool {
    matches!(self, Self::Teacher | Self::Admin)
  }
}

impl From<String> for Role {
  fn from(s: String) -> Self {
    Self::from_str(&s)
  }
}

impl From<Role> for String {
  fn from(role: Role) -> Self {
    role.as_str().to_string()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub email: String,
  /// Some backends put the grade on the user record instead of the profile
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grade: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub role: Role,
  pub grade: u8,
  pub school_name: String,
  #[serde(default)]
  pub name: String,
  /// Owner id as reported on the profile row
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
}

/// Client-side authentication state. Exactly one exists per `SessionStore`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
  pub is_authenticated: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token: Option<String>,
  pub user: Option<User>,
  pub profile: Option<Profile>,
}

impl Session {
  pub fn unauthenticated() -> Self {
    Self::default()
  }

  /// Role from the cached profile. Advisory only: the backend re-checks.
  pub fn role(&self) -> Option<Role> {
    if !self.is_authenticated {
      return None;
    }
    self.profile.as_ref().map(|p| p.role)
  }

  pub fn user_id(&self) -> Option<&str> {
    self
      .user
      .as_ref()
      .map(|u| u.id.as_str())
      .or_else(|| self.profile.as_ref().and_then(|p| p.user_id.as_deref()))
  }

  /// Grade used for the student catalog: user record first, then profile, else 0.
  pub fn grade(&self) -> u8 {
    self
      .user
      .as_ref()
      .and_then(|u| u.grade)
      .filter(|g| *g > 0)
      .or_else(|| self.profile.as_ref().map(|p| p.grade).filter(|g| *g > 0))
      .unwrap_or(0)
  }
}

/// Normalized row of the admin user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
  pub id: String,
  pub email: String,
  pub name: String,
  pub role: Role,
  pub grade: u8,
  pub school_name: String,
}
