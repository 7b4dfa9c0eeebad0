pub mod catalog;
pub mod grade;
pub mod quiz;
pub mod user;

pub use catalog::{Bahasa, Material, NewAiMaterial, NewSubject, Subject};
pub use grade::GradeRecord;
pub use quiz::{Answer, Question, QuestionType, QuizPayload};
pub use user::{AdminUser, Profile, Role, Session, User};
