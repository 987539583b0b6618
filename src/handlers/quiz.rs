// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        quiz::{AssignStudentRequest, CreateQuizRequest, PublicQuestion, Question, Quiz, QuizPaper},
        user::Student,
    },
    utils::jwt::Claims,
};

const QUIZ_COLUMNS: &str = "id, name, time_limit_minutes, question_count, created_at";

pub(crate) async fn fetch_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Quiz, AppError> {
    let quiz: Option<Quiz> = sqlx::query_as(
        "SELECT id, name, time_limit_minutes, question_count, created_at
         FROM quizzes
         WHERE id = ?",
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?;

    quiz.ok_or(AppError::NotFound(format!(
        "Quiz not found with ID: {}",
        quiz_id
    )))
}

async fn fetch_student_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Student, AppError> {
    let student: Option<Student> = sqlx::query_as(
        "SELECT id, username, password, full_name, student_code, created_at
         FROM students
         WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    student.ok_or(AppError::NotFound(format!(
        "Student not found with username: {}",
        username
    )))
}

/// Creates a quiz together with its question batch.
///
/// * Rejects an empty batch (a quiz must have at least one question).
/// * Inserts the quiz row, every question row and one join row per question
///   inside a single transaction: any failure rolls the whole batch back.
/// Teacher only.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let now = chrono::Utc::now();

    let mut tx = pool.begin().await?;

    let quiz: Quiz = sqlx::query_as(
        "INSERT INTO quizzes (name, time_limit_minutes, question_count, created_at)
         VALUES (?, ?, ?, ?)
         RETURNING id, name, time_limit_minutes, question_count, created_at",
    )
    .bind(&payload.name)
    .bind(payload.time_limit_minutes)
    .bind(payload.questions.len() as i64)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for question in &payload.questions {
        let question_id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (problem, option_a, option_b, option_c, option_d, correct_answer)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&question.problem)
        .bind(&question.option_a)
        .bind(&question.option_b)
        .bind(&question.option_c)
        .bind(&question.option_d)
        .bind(question.correct_answer.trim().to_ascii_uppercase())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO quiz_questions (quiz_id, question_id) VALUES (?, ?)")
            .bind(quiz.id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Created quiz '{}' with {} questions",
        quiz.name,
        quiz.question_count
    );

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Lists all quizzes, newest first. Teacher only.
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes: Vec<Quiz> = sqlx::query_as(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes ORDER BY id DESC"
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: String,
}

/// Case-insensitive substring search over quiz names. Teacher only.
pub async fn search_quizzes(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = format!("%{}%", params.name);
    let quizzes: Vec<Quiz> = sqlx::query_as(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE name LIKE ? COLLATE NOCASE ORDER BY id DESC"
    ))
    .bind(pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Fetches one quiz by id. Teacher only.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    Ok(Json(quiz))
}

/// Deletes a quiz and its join rows. Questions themselves are kept: they may
/// be shared with other quizzes. Teacher only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, quiz_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM student_quizzes WHERE quiz_id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "message": "Quiz deleted" })))
}

/// Lists a quiz's questions including correct answers. Teacher only.
pub async fn quiz_questions(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, quiz_id).await?;

    let questions: Vec<Question> = sqlx::query_as(
        "SELECT q.id, q.problem, q.option_a, q.option_b, q.option_c, q.option_d, q.correct_answer
         FROM questions q
         JOIN quiz_questions qq ON qq.question_id = q.id
         WHERE qq.quiz_id = ?
         ORDER BY q.id",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// Assigns a quiz to a student by username, making it visible to them.
///
/// * 404 when the quiz or the student does not exist.
/// * 409 when the pair is already assigned.
/// Teacher only.
pub async fn assign_student(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<AssignStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_quiz(&pool, quiz_id).await?;
    let student = fetch_student_by_username(&pool, &payload.username).await?;

    sqlx::query("INSERT INTO student_quizzes (student_id, quiz_id, assigned_at) VALUES (?, ?, ?)")
        .bind(student.id)
        .bind(quiz_id)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Student is already assigned to this quiz".to_string())
            } else {
                AppError::from(e)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Quiz assigned" })),
    ))
}

/// Removes a student's assignment from a quiz. Teacher only.
pub async fn unassign_student(
    State(pool): State<SqlitePool>,
    Path((quiz_id, username)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, quiz_id).await?;
    let student = fetch_student_by_username(&pool, &username).await?;

    sqlx::query("DELETE FROM student_quizzes WHERE student_id = ? AND quiz_id = ?")
        .bind(student.id)
        .bind(quiz_id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Assignment removed" })))
}

/// Lists the students a quiz is assigned to. Teacher only.
pub async fn quiz_students(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, quiz_id).await?;

    let students: Vec<Student> = sqlx::query_as(
        "SELECT s.id, s.username, s.password, s.full_name, s.student_code, s.created_at
         FROM students s
         JOIN student_quizzes sq ON sq.student_id = s.id
         WHERE sq.quiz_id = ?
         ORDER BY s.username",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(students))
}

/// Lists the quizzes assigned to the calling student.
/// Visibility is assignment-gated: nothing outside `student_quizzes` shows up.
pub async fn my_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let quizzes: Vec<Quiz> = sqlx::query_as(
        "SELECT q.id, q.name, q.time_limit_minutes, q.question_count, q.created_at
         FROM quizzes q
         JOIN student_quizzes sq ON sq.quiz_id = q.id
         WHERE sq.student_id = ?
         ORDER BY q.id DESC",
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Returns the paper for an attempt: quiz metadata plus the question list with
/// the answer key stripped. 404 unless the quiz is assigned to the caller.
pub async fn quiz_paper(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let quiz = fetch_assigned_quiz(&pool, student_id, quiz_id).await?;

    let questions: Vec<PublicQuestion> = sqlx::query_as(
        "SELECT q.id, q.problem, q.option_a, q.option_b, q.option_c, q.option_d
         FROM questions q
         JOIN quiz_questions qq ON qq.question_id = q.id
         WHERE qq.quiz_id = ?
         ORDER BY q.id",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(QuizPaper { quiz, questions }))
}

/// Fetches a quiz only if it is assigned to the given student.
pub(crate) async fn fetch_assigned_quiz(
    pool: &SqlitePool,
    student_id: i64,
    quiz_id: i64,
) -> Result<Quiz, AppError> {
    let quiz: Option<Quiz> = sqlx::query_as(
        "SELECT q.id, q.name, q.time_limit_minutes, q.question_count, q.created_at
         FROM quizzes q
         JOIN student_quizzes sq ON sq.quiz_id = q.id
         WHERE sq.student_id = ? AND q.id = ?",
    )
    .bind(student_id)
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?;

    quiz.ok_or(AppError::NotFound(format!(
        "Quiz not found with ID: {}",
        quiz_id
    )))
}
