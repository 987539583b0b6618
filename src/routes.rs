// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, class, quiz, result, student},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, students, classes, results).
/// * Role gates: `/api/quizzes`, `/api/students`, `/api/classes` and
///   `/api/results` are teacher-only; `/api/student` is student-only.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz).get(quiz::list_quizzes))
        .route("/search", get(quiz::search_quizzes))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/{id}/questions", get(quiz::quiz_questions))
        .route(
            "/{id}/students",
            get(quiz::quiz_students).post(quiz::assign_student),
        )
        .route("/{id}/students/{username}", delete(quiz::unassign_student))
        .route("/{id}/results", get(result::quiz_results))
        .route("/{id}/results/export", get(result::export_quiz_results))
        .route("/{id}/statistics", get(result::quiz_statistics))
        // Double middleware protection: Auth first, then role check
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let result_routes = Router::new()
        .route("/{id}/score", put(result::regrade_result))
        .route("/{id}", delete(result::delete_result))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let student_admin_routes = Router::new()
        .route("/", get(student::list_students))
        .route("/import", post(student::import_students))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let class_routes = Router::new()
        .route("/", post(class::create_class).get(class::my_classes))
        .route("/{id}", delete(class::delete_class))
        .route(
            "/{id}/students",
            get(class::class_students).post(class::enroll_student),
        )
        .route("/{id}/students/{username}", delete(class::remove_student))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let student_routes = Router::new()
        .route("/quizzes", get(quiz::my_quizzes))
        .route("/quizzes/{id}/paper", get(quiz::quiz_paper))
        .route("/quizzes/{id}/completed", get(result::my_completion))
        .route("/quizzes/{id}/submit", post(result::submit_quiz))
        .route("/quizzes/{id}/result", get(result::my_result))
        .route("/results", get(result::my_results))
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/results", result_routes)
        .nest("/api/students", student_admin_routes)
        .nest("/api/classes", class_routes)
        .nest("/api/student", student_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
