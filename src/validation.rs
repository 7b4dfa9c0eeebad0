//! Client-side form validation.
//!
//! These checks only spare a round trip; the backend validates again.

use serde::Serialize;

use crate::domain::Role;
use crate::domain::catalog::{MAX_CLASS, MIN_CLASS};
use crate::error::{PortalError, Result};

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// `local@domain.tld` with no whitespace, one `@`, and a dot in the domain.
pub fn is_valid_email(email: &str) -> bool {
  let email = email.trim();
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let mut parts = email.split('@');
  let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
    return false;
  };
  if local.is_empty() {
    return false;
  }
  match domain.rsplit_once('.') {
    Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
    None => false,
  }
}

fn require(value: &str, message: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(PortalError::validation(message))
  } else {
    Ok(())
  }
}

fn check_grade(grade: u8) -> Result<()> {
  if (MIN_CLASS..=MAX_CLASS).contains(&grade) {
    Ok(())
  } else {
    Err(PortalError::validation(format!(
      "Grade must be between {} and {}",
      MIN_CLASS, MAX_CLASS
    )))
  }
}

// ============================================================================
// Forms
// ============================================================================

/// Body for `POST /login`
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

impl Credentials {
  pub fn new(email: &str, password: &str) -> Self {
    Self {
      email: email.trim().to_string(),
      password: password.to_string(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.email.trim().is_empty() || self.password.is_empty() {
      return Err(PortalError::validation("Please enter both email and password."));
    }
    Ok(())
  }
}

/// Self-service registration form
#[derive(Debug, Clone)]
pub struct RegistrationForm {
  pub email: String,
  pub password: String,
  pub confirm_password: String,
  pub name: String,
  pub role: Role,
  pub grade: u8,
  pub school_name: String,
}

impl RegistrationForm {
  pub fn validate(&self) -> Result<()> {
    if [&self.email, &self.password, &self.confirm_password, &self.name, &self.school_name]
      .iter()
      .any(|field| field.trim().is_empty())
    {
      return Err(PortalError::validation("All fields are required."));
    }
    if self.password.chars().count() < MIN_PASSWORD_LEN {
      return Err(PortalError::validation(format!(
        "Password must be at least {} characters long.",
        MIN_PASSWORD_LEN
      )));
    }
    if self.password != self.confirm_password {
      return Err(PortalError::validation("Passwords do not match."));
    }
    if !is_valid_email(&self.email) {
      return Err(PortalError::validation("Please enter a valid email address."));
    }
    check_grade(self.grade)
  }

  pub fn to_signup(&self) -> SignupRequest {
    SignupRequest {
      email: self.email.trim().to_string(),
      password: self.password.clone(),
      name: self.name.trim().to_string(),
      role: self.role,
      grade: self.grade,
      school_name: self.school_name.trim().to_string(),
    }
  }
}

/// Body for `POST /signup`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignupRequest {
  pub email: String,
  pub password: String,
  pub name: String,
  pub role: Role,
  pub grade: u8,
  pub school_name: String,
}

/// Admin create/edit user form (no password; see `AdminConsole::create_user`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserForm {
  pub name: String,
  pub email: String,
  pub role: Role,
  pub grade: u8,
  pub school_name: String,
}

impl UserForm {
  pub fn validate(&self) -> Result<()> {
    require(&self.name, "Name is required")?;
    require(&self.email, "Email is required")?;
    if !is_valid_email(&self.email) {
      return Err(PortalError::validation("Email is invalid"));
    }
    check_grade(self.grade)?;
    require(&self.school_name, "School is required")
  }
}
