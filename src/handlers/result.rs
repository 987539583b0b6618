// src/handlers/result.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    attempt::{self, POINTS_PER_QUESTION},
    error::{AppError, is_unique_violation},
    models::{
        quiz::Question,
        result::{
            QuizStatistics, RegradeRequest, ResultWithQuiz, ResultWithStudent, StudentQuizResult,
            SubmitQuizRequest,
        },
    },
    utils::{csv, jwt::Claims},
};

const RESULT_COLUMNS: &str = "id, student_id, quiz_id, score, total_points, correct_answers, \
                              total_questions, completion_time_seconds, submitted_at";

/// Existence check for a (student, quiz) result pair.
async fn has_completed(pool: &SqlitePool, student_id: i64, quiz_id: i64) -> Result<bool, AppError> {
    let row: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM student_quiz_results WHERE student_id = ? AND quiz_id = ?",
    )
    .bind(student_id)
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Submits a finished attempt and persists its result.
///
/// * Grades server-side with the shared scoring rules: case-insensitive letter
///   match, 10 points per question, unanswered counts as incorrect.
/// * Rejects a second submission for the same (student, quiz) pair with 409:
///   submission is idempotent-by-rejection, never merged. The pre-check is
///   backed by the UNIQUE constraint on the results table.
/// Student only.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let quiz = super::quiz::fetch_assigned_quiz(&pool, student_id, quiz_id).await?;

    if has_completed(&pool, student_id, quiz_id).await? {
        return Err(AppError::Conflict(
            "Student has already completed this quiz".to_string(),
        ));
    }

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

    if questions.is_empty() {
        return Err(AppError::BadRequest(
            "This quiz has no questions".to_string(),
        ));
    }

    let correct_answers = attempt::count_correct(
        &questions,
        questions
            .iter()
            .map(|q| payload.answers.get(&q.id).map(String::as_str)),
    );
    let total_questions = questions.len() as i64;
    let score = correct_answers * POINTS_PER_QUESTION;
    let total_points = total_questions * POINTS_PER_QUESTION;

    let submitted_at = chrono::Utc::now();
    let completion_time = payload.completion_time_seconds.max(0);

    let result: StudentQuizResult = sqlx::query_as(&format!(
        "INSERT INTO student_quiz_results
             (student_id, quiz_id, score, total_points, correct_answers, total_questions,
              completion_time_seconds, submitted_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING {RESULT_COLUMNS}"
    ))
    .bind(student_id)
    .bind(quiz_id)
    .bind(score)
    .bind(total_points)
    .bind(correct_answers)
    .bind(total_questions)
    .bind(completion_time)
    .bind(submitted_at)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Student has already completed this quiz".to_string())
        } else {
            tracing::error!("Failed to save result: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(
        "Student {} completed quiz '{}': {}/{} ({} of {} correct)",
        student_id,
        quiz.name,
        result.score,
        result.total_points,
        result.correct_answers,
        result.total_questions
    );

    Ok((StatusCode::CREATED, Json(result)))
}

/// Tells the calling student whether they already completed a quiz.
/// Backs the Join / Completed badge.
pub async fn my_completion(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let completed = has_completed(&pool, student_id, quiz_id).await?;
    Ok(Json(json!({ "completed": completed })))
}

/// The calling student's result for one quiz.
pub async fn my_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let result: Option<StudentQuizResult> = sqlx::query_as(&format!(
        "SELECT {RESULT_COLUMNS} FROM student_quiz_results WHERE student_id = ? AND quiz_id = ?"
    ))
    .bind(student_id)
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?;

    let result = result.ok_or(AppError::NotFound(
        "No result for this quiz yet".to_string(),
    ))?;

    Ok(Json(result))
}

/// The calling student's full history, newest first.
pub async fn my_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let results: Vec<ResultWithQuiz> = sqlx::query_as(
        "SELECT r.id, r.quiz_id, q.name AS quiz_name, r.score, r.total_points,
                r.correct_answers, r.total_questions, r.completion_time_seconds, r.submitted_at
         FROM student_quiz_results r
         JOIN quizzes q ON q.id = r.quiz_id
         WHERE r.student_id = ?
         ORDER BY r.submitted_at DESC",
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

/// All results for one quiz, newest first, joined with student identities.
/// Teacher only.
pub async fn quiz_results(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    super::quiz::fetch_quiz(&pool, quiz_id).await?;
    let results = fetch_quiz_results(&pool, quiz_id).await?;
    Ok(Json(results))
}

async fn fetch_quiz_results(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Vec<ResultWithStudent>, AppError> {
    let results: Vec<ResultWithStudent> = sqlx::query_as(
        "SELECT r.id, r.student_id, s.username, s.full_name, r.score, r.total_points,
                r.correct_answers, r.total_questions, r.completion_time_seconds, r.submitted_at
         FROM student_quiz_results r
         JOIN students s ON s.id = r.student_id
         WHERE r.quiz_id = ?
         ORDER BY r.submitted_at DESC",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;
    Ok(results)
}

/// Aggregate statistics for one quiz: participant count, average, highest and
/// lowest score. Teacher only.
pub async fn quiz_statistics(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    super::quiz::fetch_quiz(&pool, quiz_id).await?;

    let (total_students, average_score, highest_score, lowest_score): (
        i64,
        Option<f64>,
        Option<i64>,
        Option<i64>,
    ) = sqlx::query_as(
        "SELECT COUNT(*), AVG(score), MAX(score), MIN(score)
         FROM student_quiz_results
         WHERE quiz_id = ?",
    )
    .bind(quiz_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(QuizStatistics {
        total_students,
        average_score,
        highest_score,
        lowest_score,
    }))
}

/// Exports a quiz's results as CSV with header `Quiz Name,Username,Score`.
/// Teacher only.
pub async fn export_quiz_results(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = super::quiz::fetch_quiz(&pool, quiz_id).await?.name;
    let results = fetch_quiz_results(&pool, quiz_id).await?;

    let rows: Vec<(String, String, i64)> = results
        .into_iter()
        .map(|r| (quiz.clone(), r.username, r.score))
        .collect();
    let body = csv::export_results(&rows);

    let filename: String = quiz
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}_results.csv\"", filename),
            ),
        ],
        body,
    ))
}

/// The explicit regrade path: the only legal mutation of a saved result.
/// Teacher only.
pub async fn regrade_result(
    State(pool): State<SqlitePool>,
    Path(result_id): Path<i64>,
    Json(payload): Json<RegradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let result: Option<StudentQuizResult> = sqlx::query_as(&format!(
        "UPDATE student_quiz_results SET score = ? WHERE id = ? RETURNING {RESULT_COLUMNS}"
    ))
    .bind(payload.score)
    .bind(result_id)
    .fetch_optional(&pool)
    .await?;

    let result = result.ok_or(AppError::NotFound("Result not found".to_string()))?;

    tracing::info!("Regraded result {} to score {}", result.id, result.score);

    Ok(Json(result))
}

/// Deletes a result. Teacher only.
pub async fn delete_result(
    State(pool): State<SqlitePool>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = sqlx::query("DELETE FROM student_quiz_results WHERE id = ?")
        .bind(result_id)
        .execute(&pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    Ok(Json(json!({ "message": "Result deleted" })))
}
