//! Backend endpoint paths - single source of truth for every route the
//! client calls. Dynamic segments are percent-encoded.

use urlencoding::encode;

pub const LOGIN: &str = "/login";
pub const SIGNUP: &str = "/signup";
pub const LOGOUT: &str = "/logout";

pub const SUBJECTS_ALL: &str = "/subject/get-subjects";
pub const SUBJECT_CREATE: &str = "/subject/post-subject";

pub const MATERIAL_CREATE_AI: &str = "/materials/post-ai";

pub const GRADE_SUBMIT: &str = "/grade/grade-quiz";

pub const ADMIN_USERS: &str = "/admin/users";

pub const VIDEO_CREATE: &str = "/math-video/create";

pub fn subjects_by_class(grade: u8) -> String {
  format!("/subject/get-subjects-by-class/{}", grade)
}

pub fn materials_by_subject(subject_id: &str) -> String {
  format!("/materials/get-materials-by-subject/{}", encode(subject_id))
}

pub fn user_grade(user_id: &str, materials_id: &str) -> String {
  format!("/grade/user/{}/{}", encode(user_id), encode(materials_id))
}

pub fn material_grades(materials_id: &str) -> String {
  format!("/grade/material/{}", encode(materials_id))
}

pub fn update_grade(user_id: &str, materials_id: &str) -> String {
  format!("/grade/update-grade/{}/{}", encode(user_id), encode(materials_id))
}

pub fn admin_user(user_id: &str) -> String {
  format!("{}/{}", ADMIN_USERS, encode(user_id))
}

pub fn user_videos(user_id: &str) -> String {
  format!("/math-video/user/{}", encode(user_id))
}
