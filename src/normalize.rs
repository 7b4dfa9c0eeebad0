//! Boundary normalization from backend JSON to canonical domain types.
//!
//! The backend has shipped several field-name variants for the same data
//! over time (`material_id` vs `materials_id`, names nested under `profile`
//! or `user.user_metadata`, grades sent as strings). All of those fallbacks
//! live here so the rest of the crate only ever sees one shape per entity.

use serde_json::Value;

use crate::domain::{AdminUser, GradeRecord, Material, Profile, QuizPayload, Role, Session, Subject, User};
use crate::error::{PortalError, Result};

// ============================================================================
// Field helpers
// ============================================================================

/// Follow a dotted path like `user.user_metadata.name`.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(value, |v, key| v.get(key))
}

/// First non-empty string (or number rendered as string) among `paths`.
fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
  paths.iter().find_map(|path| match lookup(value, path)? {
    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  })
}

/// First positive integer among `paths`, accepting numeric strings.
fn first_u8(value: &Value, paths: &[&str]) -> Option<u8> {
  paths.iter().find_map(|path| {
    let n = match lookup(value, path)? {
      Value::Number(n) => n.as_u64(),
      Value::String(s) => s.trim().parse::<u64>().ok(),
      _ => None,
    }?;
    u8::try_from(n).ok().filter(|n| *n > 0)
  })
}

fn malformed(what: &str) -> PortalError {
  PortalError::Network(format!("malformed {} in response", what))
}

// ============================================================================
// Catalog
// ============================================================================

pub fn subject(value: &Value) -> Result<Subject> {
  let subject_id = first_string(value, &["subject_id", "id"]).ok_or_else(|| malformed("subject"))?;
  let materials = value
    .get("materials")
    .and_then(Value::as_array)
    .map(|list| materials_for(list, &subject_id));

  Ok(Subject {
    name: first_string(value, &["name", "title"]).unwrap_or_default(),
    description: first_string(value, &["description"]).unwrap_or_default(),
    class: first_u8(value, &["class", "grade"]).unwrap_or(0),
    materials,
    subject_id,
  })
}

/// Normalize a subject list. Non-array bodies load as an empty list;
/// entries without an id are dropped.
pub fn subjects(value: &Value) -> Vec<Subject> {
  let Some(list) = value.as_array() else {
    tracing::warn!("Expected subject array, got {}", kind_of(value));
    return Vec::new();
  };
  list
    .iter()
    .filter_map(|item| match subject(item) {
      Ok(s) => Some(s),
      Err(e) => {
        tracing::warn!("Skipping subject entry: {}", e);
        None
      }
    })
    .collect()
}

pub fn material(value: &Value, default_subject_id: &str) -> Result<Material> {
  let materials_id =
    first_string(value, &["materials_id", "material_id", "id"]).ok_or_else(|| malformed("material"))?;

  Ok(Material {
    subject_id: first_string(value, &["subject_id"]).unwrap_or_else(|| default_subject_id.to_string()),
    nama_materi: first_string(value, &["nama_materi", "title"]).unwrap_or_default(),
    content: value.get("hasil_materi").and_then(|raw| quiz_payload(raw, &materials_id)),
    materials_id,
  })
}

/// Normalize a material list; non-array bodies load as empty.
pub fn materials(value: &Value, subject_id: &str) -> Vec<Material> {
  match value.as_array() {
    Some(list) => materials_for(list, subject_id),
    None => {
      tracing::warn!(subject_id, "Expected material array, got {}", kind_of(value));
      Vec::new()
    }
  }
}

fn materials_for(list: &[Value], subject_id: &str) -> Vec<Material> {
  list
    .iter()
    .filter_map(|item| match material(item, subject_id) {
      Ok(m) => Some(m),
      Err(e) => {
        tracing::warn!(subject_id, "Skipping material entry: {}", e);
        None
      }
    })
    .collect()
}

/// `hasil_materi` arrives either as an object or as a JSON-encoded string.
fn quiz_payload(raw: &Value, materials_id: &str) -> Option<QuizPayload> {
  let parsed = match raw {
    Value::Null => return None,
    Value::String(s) if s.trim().is_empty() => return None,
    Value::String(s) => serde_json::from_str::<QuizPayload>(s),
    other => serde_json::from_value::<QuizPayload>(other.clone()),
  };
  match parsed {
    Ok(payload) => Some(payload),
    Err(e) => {
      tracing::warn!(materials_id, "Unparseable hasil_materi: {}", e);
      None
    }
  }
}

// ============================================================================
// Session
// ============================================================================

/// Build a session from a `/login` response `{session, user, profile}`.
pub fn login_response(value: &Value) -> Result<Session> {
  let token = first_string(
    value,
    &["session.access_token", "session.token", "access_token", "token"],
  )
  .ok_or_else(|| malformed("login session token"))?;

  let user_value = value.get("user").unwrap_or(&Value::Null);
  let user_id = first_string(user_value, &["id", "user_id"])
    .or_else(|| first_string(value, &["profile.user_id", "profile.id"]))
    .ok_or_else(|| malformed("login user"))?;

  let user = User {
    id: user_id.clone(),
    email: first_string(user_value, &["email"])
      .or_else(|| first_string(value, &["profile.email"]))
      .unwrap_or_default(),
    grade: first_u8(user_value, &["grade", "user_metadata.grade"]),
  };

  let profile = value
    .get("profile")
    .filter(|p| p.is_object())
    .map(|p| profile(p, &user_id));

  Ok(Session {
    is_authenticated: true,
    token: Some(token),
    user: Some(user),
    profile,
  })
}

fn profile(value: &Value, fallback_user_id: &str) -> Profile {
  Profile {
    role: first_string(value, &["role"])
      .map(|r| Role::from_str(&r))
      .unwrap_or_default(),
    grade: first_u8(value, &["grade"]).unwrap_or(0),
    school_name: first_string(value, &["school_name"]).unwrap_or_default(),
    name: first_string(value, &["name"]).unwrap_or_default(),
    user_id: profile_user_id(value).or_else(|| Some(fallback_user_id.to_string())),
  }
}

/// Owner id of a profile row under any of its historical names.
pub fn profile_user_id(value: &Value) -> Option<String> {
  first_string(value, &["user_id", "_id", "userid", "userId", "id"])
}

// ============================================================================
// Admin users
// ============================================================================

/// Normalize one `/admin/users` row; `index` seeds the placeholder id.
pub fn admin_user(value: &Value, index: usize) -> AdminUser {
  let name = first_string(value, &["name", "profile.name", "user.user_metadata.name"])
    .or_else(|| {
      let first = first_string(value, &["first_name"]).unwrap_or_default();
      let last = first_string(value, &["last_name"]).unwrap_or_default();
      let joined = format!("{} {}", first, last).trim().to_string();
      (!joined.is_empty()).then_some(joined)
    })
    .unwrap_or_default();

  AdminUser {
    id: first_string(value, &["user_id", "id"]).unwrap_or_else(|| format!("temp-{}", index + 1)),
    email: first_string(value, &["email", "user.email", "profile.email"]).unwrap_or_default(),
    name,
    role: first_string(value, &["role", "profile.role", "user.role"])
      .map(|r| Role::from_str(&r))
      .unwrap_or_default(),
    grade: first_u8(value, &["grade", "profile.grade"]).unwrap_or(1),
    school_name: first_string(value, &["school_name", "profile.school_name"]).unwrap_or_default(),
  }
}

pub fn admin_users(value: &Value) -> Vec<AdminUser> {
  match value.as_array() {
    Some(list) => list.iter().enumerate().map(|(i, v)| admin_user(v, i)).collect(),
    None => {
      tracing::warn!("Expected user array, got {}", kind_of(value));
      Vec::new()
    }
  }
}

// ============================================================================
// Grades
// ============================================================================

/// Decode a grade record. `null`, `{}` and `[]` mean "no record yet";
/// a `{data: ...}` envelope or single-element array is unwrapped.
pub fn grade_record(value: &Value) -> Result<Option<GradeRecord>> {
  let inner = match value {
    Value::Null => return Ok(None),
    Value::Array(list) => match list.first() {
      Some(first) => first,
      None => return Ok(None),
    },
    Value::Object(map) if map.is_empty() => return Ok(None),
    Value::Object(map) => match map.get("data") {
      Some(data) if !map.contains_key("user_id") => return grade_record(data),
      _ => value,
    },
    _ => return Err(malformed("grade record")),
  };
  if !inner.is_object() {
    return Err(malformed("grade record"));
  }

  let mut fixed = inner.clone();
  // Grades have been sent as strings by older backends
  if let Some(Value::String(s)) = fixed.get("grade") {
    let parsed = s.trim().parse::<f64>().map_err(|_| malformed("grade value"))?;
    fixed["grade"] = Value::from(parsed);
  }
  if fixed.get("status").is_none() {
    fixed["status"] = Value::Bool(false);
  }
  Ok(Some(serde_json::from_value(fixed)?))
}

pub fn grade_records(value: &Value) -> Vec<GradeRecord> {
  let list = match value {
    Value::Array(list) => list.as_slice(),
    Value::Object(map) => match map.get("data").and_then(Value::as_array) {
      Some(list) => list.as_slice(),
      None => return Vec::new(),
    },
    _ => return Vec::new(),
  };
  list
    .iter()
    .filter_map(|item| match grade_record(item) {
      Ok(record) => record,
      Err(e) => {
        tracing::warn!("Skipping grade entry: {}", e);
        None
      }
    })
    .collect()
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
