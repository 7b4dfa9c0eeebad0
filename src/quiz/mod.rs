pub mod engine;
pub mod grading;

pub use engine::{ManualGrading, QuizEngine, QuizState, QuizView, list_submissions};
pub use grading::{AutoGrade, auto_grade, clamp_manual_score, compose_grade, grading_complete, normalize_choice};
