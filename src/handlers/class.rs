// src/handlers/class.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        class::{Class, CreateClassRequest, EnrollStudentRequest},
        user::Student,
    },
    utils::jwt::Claims,
};

/// Fetches a class and verifies the caller owns it.
pub(crate) async fn fetch_owned_class(
    pool: &SqlitePool,
    teacher_id: i64,
    class_id: i64,
) -> Result<Class, AppError> {
    let class: Option<Class> = sqlx::query_as(
        "SELECT id, name, description, teacher_id, created_at FROM classes WHERE id = ?",
    )
    .bind(class_id)
    .fetch_optional(pool)
    .await?;

    let class = class.ok_or(AppError::NotFound(format!(
        "Class not found with ID: {}",
        class_id
    )))?;

    if class.teacher_id != teacher_id {
        return Err(AppError::Forbidden(
            "You do not own this class".to_string(),
        ));
    }

    Ok(class)
}

/// Creates a class owned by the calling teacher.
pub async fn create_class(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher_id = claims.user_id()?;

    let class: Class = sqlx::query_as(
        "INSERT INTO classes (name, description, teacher_id, created_at)
         VALUES (?, ?, ?, ?)
         RETURNING id, name, description, teacher_id, created_at",
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(teacher_id)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(class)))
}

/// Lists the calling teacher's classes.
pub async fn my_classes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id()?;

    let classes: Vec<Class> = sqlx::query_as(
        "SELECT id, name, description, teacher_id, created_at
         FROM classes
         WHERE teacher_id = ?
         ORDER BY id DESC",
    )
    .bind(teacher_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(classes))
}

/// Deletes an owned class together with its roster rows.
pub async fn delete_class(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_class(&pool, claims.user_id()?, class_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM class_students WHERE class_id = ?")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM classes WHERE id = ?")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "message": "Class deleted" })))
}

/// Lists the students enrolled in an owned class.
pub async fn class_students(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_class(&pool, claims.user_id()?, class_id).await?;

    let students: Vec<Student> = sqlx::query_as(
        "SELECT s.id, s.username, s.password, s.full_name, s.student_code, s.created_at
         FROM students s
         JOIN class_students cs ON cs.student_id = s.id
         WHERE cs.class_id = ?
         ORDER BY s.username",
    )
    .bind(class_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(students))
}

/// Enrolls a student into an owned class by username.
/// Duplicate enrollment is a 409 conflict.
pub async fn enroll_student(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
    Json(payload): Json<EnrollStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_owned_class(&pool, claims.user_id()?, class_id).await?;

    let student_id: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE username = ?")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await?;
    let student_id = student_id.ok_or(AppError::NotFound(format!(
        "Student not found with username: {}",
        payload.username
    )))?;

    sqlx::query("INSERT INTO class_students (class_id, student_id) VALUES (?, ?)")
        .bind(class_id)
        .bind(student_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Student is already in this class".to_string())
            } else {
                AppError::from(e)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Student enrolled" })),
    ))
}

/// Removes a student from an owned class.
pub async fn remove_student(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((class_id, username)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_class(&pool, claims.user_id()?, class_id).await?;

    let student_id: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE username = ?")
        .bind(&username)
        .fetch_optional(&pool)
        .await?;
    let student_id = student_id.ok_or(AppError::NotFound(format!(
        "Student not found with username: {}",
        username
    )))?;

    sqlx::query("DELETE FROM class_students WHERE class_id = ? AND student_id = ?")
        .bind(class_id)
        .bind(student_id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Student removed from class" })))
}
