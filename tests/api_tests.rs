// tests/api_tests.rs

use quiz_backend::{config::Config, routes, state::AppState};
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    spawn_app_with_pool().await.0
}

/// Like `spawn_app`, but also hands back the pool so a test can inspect or
/// sabotage the database directly.
///
/// Each test gets its own in-memory SQLite database, kept alive by pinning
/// the pool to a single connection.
async fn spawn_app_with_pool() -> (String, sqlx::SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        default_student_password: "123456".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn register(client: &reqwest::Client, address: &str, username: &str, role: &str) {
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "full_name": "Test User",
            "role": role
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
}

async fn login(client: &reqwest::Client, address: &str, username: &str) -> serde_json::Value {
    client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request")
        .json::<serde_json::Value>()
        .await
        .unwrap()
}

async fn login_token(client: &reqwest::Client, address: &str, username: &str) -> String {
    login(client, address, username).await["token"]
        .as_str()
        .expect("login must return a token")
        .to_string()
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works_for_both_roles() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    register(&client, &address, &unique_name("t"), "teacher").await;
    register(&client, &address, &unique_name("s"), "student").await;
}

#[tokio::test]
async fn register_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Username too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123",
            "full_name": "Short Name",
            "role": "student"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn usernames_are_unique_across_roles() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("dup");

    register(&client, &address, &username, "teacher").await;

    // Same username as a student must conflict: the identity space is global.
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "full_name": "Other User",
            "role": "student"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // And the original teacher account is the one that logs in.
    let body = login(&client, &address, &username).await;
    assert_eq!(body["user"]["role"], "teacher");
}

#[tokio::test]
async fn login_returns_the_role_the_account_was_created_with() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let teacher = unique_name("t");
    let student = unique_name("s");
    register(&client, &address, &teacher, "teacher").await;
    register(&client, &address, &student, "student").await;

    assert_eq!(login(&client, &address, &teacher).await["user"]["role"], "teacher");
    assert_eq!(login(&client, &address, &student).await["user"]["role"], "student");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");
    register(&client, &address, &username, "student").await;

    let wrong_password = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": username, "password": "not-the-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status().as_u16(), 401);

    let unknown_user = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": "nobody_here", "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_user.status().as_u16(), 401);
}

#[tokio::test]
async fn quiz_management_requires_a_teacher_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // No token at all
    let response = client
        .get(format!("{}/api/quizzes", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Student token
    let student = unique_name("s");
    register(&client, &address, &student, "student").await;
    let token = login_token(&client, &address, &student).await;

    let response = client
        .get(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

fn sample_question(problem: &str, correct: &str) -> serde_json::Value {
    serde_json::json!({
        "problem": problem,
        "option_a": "Option A",
        "option_b": "Option B",
        "option_c": "Option C",
        "option_d": "Option D",
        "correct_answer": correct
    })
}

#[tokio::test]
async fn empty_question_batch_is_rejected_and_nothing_is_persisted() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher = unique_name("t");
    register(&client, &address, &teacher, "teacher").await;
    let token = login_token(&client, &address, &teacher).await;

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "name": "Empty Quiz",
            "time_limit_minutes": 10,
            "questions": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let quizzes = client
        .get(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(quizzes.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn creating_a_quiz_persists_quiz_questions_and_joins() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher = unique_name("t");
    register(&client, &address, &teacher, "teacher").await;
    let token = login_token(&client, &address, &teacher).await;

    let created = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "name": "Midterm",
            "time_limit_minutes": 30,
            "questions": [
                sample_question("Q1", "A"),
                sample_question("Q2", "B"),
                sample_question("Q3", "C")
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let quiz = created.json::<serde_json::Value>().await.unwrap();
    assert_eq!(quiz["question_count"], 3);
    let quiz_id = quiz["id"].as_i64().unwrap();

    let questions = client
        .get(format!("{}/api/quizzes/{}/questions", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(questions.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn mid_batch_failure_rolls_the_whole_quiz_back() {
    let (address, pool) = spawn_app_with_pool().await;
    let client = reqwest::Client::new();
    let teacher = unique_name("t");
    register(&client, &address, &teacher, "teacher").await;
    let token = login_token(&client, &address, &teacher).await;

    // Make the second question insert fail at the storage layer, after the
    // quiz row and the first question have already gone in.
    sqlx::query(
        "CREATE TRIGGER reject_poison_question BEFORE INSERT ON questions
         WHEN NEW.problem = 'poison'
         BEGIN SELECT RAISE(ABORT, 'forced insert failure'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "name": "Doomed",
            "time_limit_minutes": 10,
            "questions": [sample_question("Q1", "A"), sample_question("poison", "B")]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);

    // The quiz row, the first question and its join must roll back too:
    // either the whole batch is visible or none of it is.
    for table in ["quizzes", "questions", "quiz_questions"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "{} must be empty after the rollback", table);
    }
}

#[tokio::test]
async fn quiz_name_with_comma_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher = unique_name("t");
    register(&client, &address, &teacher, "teacher").await;
    let token = login_token(&client, &address, &teacher).await;

    // The export format has no quoting, so a comma in the name would corrupt
    // that quiz's CSV row.
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "name": "Midterm, Part 1",
            "time_limit_minutes": 10,
            "questions": [sample_question("Q1", "A")]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn invalid_correct_answer_letter_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher = unique_name("t");
    register(&client, &address, &teacher, "teacher").await;
    let token = login_token(&client, &address, &teacher).await;

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "name": "Broken",
            "time_limit_minutes": 10,
            "questions": [sample_question("Q1", "E")]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn assignment_gates_quiz_visibility() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let teacher = unique_name("t");
    let assigned = unique_name("sa");
    let unassigned = unique_name("sb");
    register(&client, &address, &teacher, "teacher").await;
    register(&client, &address, &assigned, "student").await;
    register(&client, &address, &unassigned, "student").await;
    let teacher_token = login_token(&client, &address, &teacher).await;

    let quiz = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&teacher_token)
        .json(&serde_json::json!({
            "name": "Visibility",
            "time_limit_minutes": 5,
            "questions": [sample_question("Q1", "A")]
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Assign one of the two students.
    let response = client
        .post(format!("{}/api/quizzes/{}/students", address, quiz_id))
        .bearer_auth(&teacher_token)
        .json(&serde_json::json!({"username": assigned}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // Assigning twice is a conflict, not a crash.
    let response = client
        .post(format!("{}/api/quizzes/{}/students", address, quiz_id))
        .bearer_auth(&teacher_token)
        .json(&serde_json::json!({"username": assigned}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Unknown student is 404.
    let response = client
        .post(format!("{}/api/quizzes/{}/students", address, quiz_id))
        .bearer_auth(&teacher_token)
        .json(&serde_json::json!({"username": "ghost_student"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // The assigned student sees the quiz, the other does not.
    let assigned_token = login_token(&client, &address, &assigned).await;
    let visible = client
        .get(format!("{}/api/student/quizzes", address))
        .bearer_auth(&assigned_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(visible.as_array().unwrap().len(), 1);

    let unassigned_token = login_token(&client, &address, &unassigned).await;
    let hidden = client
        .get(format!("{}/api/student/quizzes", address))
        .bearer_auth(&unassigned_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(hidden.as_array().unwrap().len(), 0);

    // Removing the assignment hides the quiz again.
    let response = client
        .delete(format!(
            "{}/api/quizzes/{}/students/{}",
            address, quiz_id, assigned
        ))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let visible = client
        .get(format!("{}/api/student/quizzes", address))
        .bearer_auth(&assigned_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(visible.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn student_import_creates_and_reuses_accounts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher = unique_name("t");
    register(&client, &address, &teacher, "teacher").await;
    let token = login_token(&client, &address, &teacher).await;

    let existing = unique_name("s");
    register(&client, &address, &existing, "student").await;

    let csv = format!(
        "username,full_name,student_code\n{},Existing Student,S001\nnew_import_a,New A,S002\nbroken-row\n",
        existing
    );

    let report = client
        .post(format!("{}/api/students/import", address))
        .bearer_auth(&token)
        .body(csv)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(report["created"], 1);
    assert_eq!(report["reused"], 1);
    assert_eq!(report["errors"].as_array().unwrap().len(), 1);

    // Imported students can log in with the default password.
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": "new_import_a", "password": "123456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn class_roster_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let owner = unique_name("t");
    let other = unique_name("t");
    let student = unique_name("s");
    register(&client, &address, &owner, "teacher").await;
    register(&client, &address, &other, "teacher").await;
    register(&client, &address, &student, "student").await;
    let owner_token = login_token(&client, &address, &owner).await;
    let other_token = login_token(&client, &address, &other).await;

    let class = client
        .post(format!("{}/api/classes", address))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({"name": "SE101", "description": "Intro"}))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let class_id = class["id"].as_i64().unwrap();

    // Enroll, then duplicate enrollment conflicts.
    let response = client
        .post(format!("{}/api/classes/{}/students", address, class_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({"username": student}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .post(format!("{}/api/classes/{}/students", address, class_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({"username": student}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // A different teacher cannot touch the class.
    let response = client
        .get(format!("{}/api/classes/{}/students", address, class_id))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let roster = client
        .get(format!("{}/api/classes/{}/students", address, class_id))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(roster.as_array().unwrap().len(), 1);
}
