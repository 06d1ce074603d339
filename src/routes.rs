// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, quiz, session},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Everything below operates on the caller's own quiz, so the whole scope
    // sits behind the bearer-token middleware.
    let protected_quiz_routes = Router::new()
        .route("/generate", post(quiz::generate))
        .route(
            "/upload",
            post(quiz::upload).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route("/session", get(session::view))
        .route("/session/answer", post(session::answer))
        .route("/session/next", post(session::next_question))
        .route("/session/previous", post(session::previous_question))
        .route("/session/submit", post(session::submit))
        .route("/session/reset", post(session::reset))
        .route("/export/txt", get(quiz::export_txt))
        .route("/export/csv", get(quiz::export_csv))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let quiz_routes = Router::new()
        .route("/leaderboard", get(quiz::leaderboard))
        .merge(protected_quiz_routes);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
