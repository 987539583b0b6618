// src/handlers/student.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    models::user::{ImportReport, Student},
    utils::{csv, hash::hash_password, jwt::Claims},
};

/// Lists all students. Teacher only.
pub async fn list_students(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let students: Vec<Student> = sqlx::query_as(
        "SELECT id, username, password, full_name, student_code, created_at
         FROM students
         ORDER BY username",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(students))
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    /// When set, every imported row is also enrolled into this class.
    pub class_id: Option<i64>,
}

/// Imports students from a CSV body (`username,full_name,student_code`).
///
/// * Header row auto-detected (first cell equals "username", any case).
/// * Faulty rows are reported per line; the import continues.
/// * New students get the configured default password; usernames that already
///   exist are reused rather than duplicated.
/// * With `?class_id=`, each row is additionally enrolled into that class,
///   which must belong to the calling teacher.
/// Teacher only.
pub async fn import_students(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("CSV file is empty".to_string()));
    }

    if let Some(class_id) = params.class_id {
        super::class::fetch_owned_class(&pool, claims.user_id()?, class_id).await?;
    }

    let (rows, parse_errors) = csv::parse_student_import(&body);

    let mut report = ImportReport {
        errors: parse_errors,
        ..Default::default()
    };

    // Hash once: every newly created student gets the same default password.
    let default_hash = hash_password(&config.default_student_password)?;

    for row in rows {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE username = ?")
            .bind(&row.username)
            .fetch_optional(&pool)
            .await?;

        let student_id = match existing {
            Some(id) => {
                report.reused += 1;
                id
            }
            None => {
                let taken_by_teacher: Option<i64> =
                    sqlx::query_scalar("SELECT id FROM teachers WHERE username = ?")
                        .bind(&row.username)
                        .fetch_optional(&pool)
                        .await?;
                if taken_by_teacher.is_some() {
                    report.errors.push(format!(
                        "Line {}: username '{}' belongs to a teacher account",
                        row.line, row.username
                    ));
                    continue;
                }

                let id: i64 = sqlx::query_scalar(
                    "INSERT INTO students (username, password, full_name, student_code, created_at)
                     VALUES (?, ?, ?, ?, ?)
                     RETURNING id",
                )
                .bind(&row.username)
                .bind(&default_hash)
                .bind(&row.full_name)
                .bind(&row.student_code)
                .bind(chrono::Utc::now())
                .fetch_one(&pool)
                .await?;
                report.created += 1;
                id
            }
        };

        if let Some(class_id) = params.class_id {
            let enrolled = sqlx::query(
                "INSERT OR IGNORE INTO class_students (class_id, student_id) VALUES (?, ?)",
            )
            .bind(class_id)
            .bind(student_id)
            .execute(&pool)
            .await?;
            if enrolled.rows_affected() == 0 {
                report.errors.push(format!(
                    "Line {}: student '{}' is already in the class",
                    row.line, row.username
                ));
            }
        }
    }

    tracing::info!(
        "Student import finished: {} created, {} reused, {} errors",
        report.created,
        report.reused,
        report.errors.len()
    );

    Ok(Json(report))
}
