// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Account role. Usernames are globally unique across both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

/// Represents the 'teachers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub full_name: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'students' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub full_name: String,

    /// Optional institutional student code (filled by CSV import).
    pub student_code: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name length must be between 1 and 100 characters."
    ))]
    pub full_name: String,
    pub role: Role,
    /// Only meaningful for student registrations.
    pub student_code: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Public view of an account, returned by register/login.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

/// Outcome report of a CSV student import.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    /// Students created with the default password.
    pub created: usize,
    /// Rows whose username already existed; the existing account was reused.
    pub reused: usize,
    /// Per-line problems; the import continues past them.
    pub errors: Vec<String>,
}
