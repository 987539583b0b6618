// src/models/class.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'classes' table in the database.
/// A class is a student roster owned by one teacher.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub teacher_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a class.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 100, message = "Class name must not be empty."))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// DTO for enrolling a student into a class by username.
#[derive(Debug, Deserialize, Validate)]
pub struct EnrollStudentRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
}
