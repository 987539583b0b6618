// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use validator::Validate;

/// Represents the 'student_quiz_results' table in the database.
/// At most one row per (student, quiz) pair; immutable after creation except
/// through the explicit regrade path.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentQuizResult {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub score: i64,
    pub total_points: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub completion_time_seconds: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// A result joined with the student who produced it.
/// Used by teachers reviewing a quiz.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultWithStudent {
    pub id: i64,
    pub student_id: i64,
    pub username: String,
    pub full_name: String,
    pub score: i64,
    pub total_points: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub completion_time_seconds: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// A result joined with its quiz name. Used for a student's own history.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultWithQuiz {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub score: i64,
    pub total_points: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub completion_time_seconds: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregate statistics over one quiz's results.
#[derive(Debug, Serialize)]
pub struct QuizStatistics {
    pub total_students: i64,
    pub average_score: Option<f64>,
    pub highest_score: Option<i64>,
    pub lowest_score: Option<i64>,
}

/// DTO for submitting a finished attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// The student's answers.
    /// Key: Question ID
    /// Value: selected option letter (A-D). Unanswered questions are absent.
    pub answers: HashMap<i64, String>,

    /// Wall-clock seconds the attempt took, as measured by the client timer.
    pub completion_time_seconds: i64,
}

/// DTO for the explicit regrade path.
#[derive(Debug, Deserialize, Validate)]
pub struct RegradeRequest {
    #[validate(range(min = 0))]
    pub score: i64,
}
