// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Password assigned to students created through CSV import.
    pub default_student_password: String,
    /// Optional teacher account seeded on first start.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quiz.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let default_student_password =
            env::var("DEFAULT_STUDENT_PASSWORD").unwrap_or_else(|_| "123456".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            default_student_password,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}
