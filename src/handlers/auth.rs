// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{LoginRequest, RegisterRequest, Role, Student, Teacher, UserView},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// True when the username exists in either identity table.
/// Usernames are globally unique across both roles.
async fn username_taken(pool: &SqlitePool, username: &str) -> Result<bool, AppError> {
    let in_teachers: Option<i64> =
        sqlx::query_scalar("SELECT id FROM teachers WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    if in_teachers.is_some() {
        return Ok(true);
    }

    let in_students: Option<i64> =
        sqlx::query_scalar("SELECT id FROM students WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(in_students.is_some())
}

/// Registers a new teacher or student account.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the public user view.
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if username_taken(&pool, &payload.username).await? {
        return Err(AppError::Conflict(format!(
            "Username '{}' already exists",
            payload.username
        )));
    }

    let hashed_password = hash_password(&payload.password)?;
    let now = chrono::Utc::now();

    // The UNIQUE column backs the pre-check above against races.
    let id: i64 = match payload.role {
        Role::Teacher => sqlx::query_scalar(
            "INSERT INTO teachers (username, password, full_name, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&payload.username)
        .bind(&hashed_password)
        .bind(&payload.full_name)
        .bind(now),
        Role::Student => sqlx::query_scalar(
            "INSERT INTO students (username, password, full_name, student_code, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&payload.username)
        .bind(&hashed_password)
        .bind(&payload.full_name)
        .bind(&payload.student_code)
        .bind(now),
    }
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UserView {
            id,
            username: payload.username,
            full_name: payload.full_name,
            role: payload.role,
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Looks the username up in the teacher table first, then the student table,
/// matching how accounts were partitioned at registration. The signed claims
/// carry the full session record {id, username, role, full name}.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher: Option<Teacher> = sqlx::query_as(
        "SELECT id, username, password, full_name, created_at
         FROM teachers
         WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?;

    if let Some(teacher) = teacher {
        if !verify_password(&payload.password, &teacher.password)? {
            return Err(AppError::AuthError("Invalid password".to_string()));
        }
        let token = sign_jwt(
            teacher.id,
            &teacher.username,
            Role::Teacher,
            &teacher.full_name,
            &config.jwt_secret,
            config.jwt_expiration,
        )?;
        return Ok(Json(json!({
            "token": token,
            "type": "Bearer",
            "user": UserView {
                id: teacher.id,
                username: teacher.username,
                full_name: teacher.full_name,
                role: Role::Teacher,
            },
        })));
    }

    let student: Option<Student> = sqlx::query_as(
        "SELECT id, username, password, full_name, student_code, created_at
         FROM students
         WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?;

    let student = student.ok_or(AppError::AuthError("User not found".to_string()))?;

    if !verify_password(&payload.password, &student.password)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(
        student.id,
        &student.username,
        Role::Student,
        &student.full_name,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": UserView {
            id: student.id,
            username: student.username,
            full_name: student.full_name,
            role: Role::Student,
        },
    })))
}

/// Ends the session. Sessions live in the bearer token, so there is no server
/// state to clear; the client discards its token on this acknowledgment.
pub async fn logout(Extension(claims): Extension<Claims>) -> Result<impl IntoResponse, AppError> {
    tracing::info!("User '{}' logged out", claims.username);
    Ok(Json(json!({ "message": "Logged out" })))
}
