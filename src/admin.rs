//! Admin user management over `/admin/users`.
//!
//! Role checks here are advisory; the backend enforces them too.

use serde_json::json;

use crate::domain::{AdminUser, Role, Session};
use crate::endpoints;
use crate::error::{PortalError, Result};
use crate::gateway::Gateway;
use crate::normalize;
use crate::validation::{MIN_PASSWORD_LEN, UserForm};

const TEMP_PASSWORD_LEN: usize = 12;

/// A user created by an admin, with the password to hand over.
#[derive(Debug, Clone)]
pub struct CreatedUser {
  pub email: String,
  pub temporary_password: String,
}

/// Cached user table for the admin dashboard.
#[derive(Debug, Default)]
pub struct AdminConsole {
  users: Vec<AdminUser>,
}

impl AdminConsole {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn users(&self) -> &[AdminUser] {
    &self.users
  }

  pub async fn list_users<G: Gateway>(&mut self, gateway: &G, session: &Session) -> Result<&[AdminUser]> {
    require_admin(session)?;
    let body = gateway.get(endpoints::ADMIN_USERS).await?;
    self.users = normalize::admin_users(&body);
    tracing::debug!(count = self.users.len(), "Loaded users");
    Ok(&self.users)
  }

  pub async fn update_user<G: Gateway>(
    &mut self,
    gateway: &G,
    session: &Session,
    user_id: &str,
    form: &UserForm,
  ) -> Result<()> {
    require_admin(session)?;
    form.validate()?;
    gateway
      .put(&endpoints::admin_user(user_id), serde_json::to_value(form)?)
      .await?;

    if let Some(row) = self.users.iter_mut().find(|u| u.id == user_id) {
      row.name = form.name.trim().to_string();
      row.email = form.email.trim().to_string();
      row.role = form.role;
      row.grade = form.grade;
      row.school_name = form.school_name.trim().to_string();
    }
    tracing::info!(user_id, "User updated");
    Ok(())
  }

  pub async fn delete_user<G: Gateway>(&mut self, gateway: &G, session: &Session, user_id: &str) -> Result<()> {
    require_admin(session)?;
    if session.user_id() == Some(user_id) {
      return Err(PortalError::validation("You cannot delete your own account"));
    }
    gateway.delete(&endpoints::admin_user(user_id)).await?;
    self.users.retain(|u| u.id != user_id);
    tracing::info!(user_id, "User deleted");
    Ok(())
  }

  /// Register a user through `/signup` with a generated temporary password,
  /// then reload the table.
  pub async fn create_user<G: Gateway>(&mut self, gateway: &G, session: &Session, form: &UserForm) -> Result<CreatedUser> {
    require_admin(session)?;
    form.validate()?;

    let password = temporary_password();
    let body = json!({
      "email": form.email.trim(),
      "password": password,
      "name": form.name.trim(),
      "role": form.role,
      "grade": form.grade,
      "school_name": form.school_name.trim(),
    });
    gateway.post(endpoints::SIGNUP, body).await?;
    tracing::info!(email = form.email.trim(), role = form.role.as_str(), "User created");

    if let Err(e) = self.list_users(gateway, session).await {
      tracing::warn!("User created but reloading the list failed: {}", e);
    }
    Ok(CreatedUser {
      email: form.email.trim().to_string(),
      temporary_password: password,
    })
  }
}

fn require_admin(session: &Session) -> Result<()> {
  match session.role() {
    Some(Role::Admin) => Ok(()),
    _ => Err(PortalError::Forbidden("Admin access required".into())),
  }
}

/// Random alphanumeric password
fn temporary_password() -> String {
  (0..TEMP_PASSWORD_LEN.max(MIN_PASSWORD_LEN))
    .map(|_| {
      let idx = rand::random::<u8>() % 62;
      match idx {
        0..=9 => (b'0' + idx) as char,
        10..=35 => (b'a' + idx - 10) as char,
        _ => (b'A' + idx - 36) as char,
      }
    })
    .collect()
}
