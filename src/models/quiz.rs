// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    pub name: String,

    /// Time budget for one attempt, in minutes.
    pub time_limit_minutes: i64,

    /// Denormalized cache of the number of joined questions.
    pub question_count: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
/// Includes the correct answer; only ever serialized for teachers.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The problem text shown to the student.
    pub problem: String,

    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    /// Correct option letter: A, B, C or D.
    pub correct_answer: String,
}

/// DTO for sending a question to a student taking a quiz
/// (excludes the correct answer).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub problem: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            problem: q.problem,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
        }
    }
}

/// One question inside a quiz-creation batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub problem: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
}

/// DTO for creating a quiz together with its question batch.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(
        length(min = 1, max = 200, message = "Quiz name must not be empty."),
        custom(function = validate_quiz_name)
    )]
    pub name: String,
    #[validate(range(min = 1, max = 600, message = "Time limit must be a positive minute count."))]
    pub time_limit_minutes: i64,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<NewQuestion>,
}

/// The result export format has no quoting, so a comma inside a quiz name
/// would corrupt its CSV row. Rejected here, at the only place names enter.
fn validate_quiz_name(name: &str) -> Result<(), validator::ValidationError> {
    if name.contains(',') {
        return Err(validator::ValidationError::new(
            "quiz_name_must_not_contain_commas",
        ));
    }
    Ok(())
}

fn validate_questions(questions: &[NewQuestion]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new(
            "quiz_must_have_at_least_one_question",
        ));
    }
    for q in questions {
        if q.problem.trim().is_empty() {
            return Err(validator::ValidationError::new("problem_cannot_be_empty"));
        }
        if q.problem.len() > 2000 {
            return Err(validator::ValidationError::new("problem_too_long"));
        }
        for opt in [&q.option_a, &q.option_b, &q.option_c, &q.option_d] {
            if opt.len() > 500 {
                return Err(validator::ValidationError::new("option_too_long"));
            }
        }
        let letter = q.correct_answer.trim();
        if !matches!(
            letter.to_ascii_uppercase().as_str(),
            "A" | "B" | "C" | "D"
        ) {
            return Err(validator::ValidationError::new(
                "correct_answer_must_be_a_letter_a_to_d",
            ));
        }
    }
    Ok(())
}

/// DTO for assigning a quiz to a student by username.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignStudentRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
}

/// Everything a student needs to start an attempt: quiz metadata plus the
/// question list with the answer key stripped.
#[derive(Debug, Serialize)]
pub struct QuizPaper {
    pub quiz: Quiz,
    pub questions: Vec<PublicQuestion>,
}
