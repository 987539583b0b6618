// src/main.rs

use dotenvy::dotenv;
use quiz_backend::config::Config;
use quiz_backend::routes;
use quiz_backend::state::AppState;
use quiz_backend::utils::hash::hash_password;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("Failed to open the database");

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Seed Admin Teacher Account
    if let Err(e) = seed_admin_teacher(&pool, &config).await {
        tracing::error!("Failed to seed admin teacher: {:?}", e);
    }

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

async fn seed_admin_teacher(
    pool: &SqlitePool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM teachers WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;

        if exists.is_none() {
            tracing::info!("Seeding admin teacher: {}", username);
            let hashed_password = hash_password(password)?;

            sqlx::query(
                "INSERT INTO teachers (username, password, full_name, created_at)
                 VALUES (?, ?, 'Administrator', ?)",
            )
            .bind(username)
            .bind(hashed_password)
            .bind(chrono::Utc::now())
            .execute(pool)
            .await?;
            tracing::info!("Admin teacher created successfully.");
        }
    }
    Ok(())
}
