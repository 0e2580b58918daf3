use crate::{
    AppState,
    handlers::{self, news, notes, users},
};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints accessible to any client, anonymous or logged in. The news detail
/// path also accepts POST for new comments; that handler asks the policy itself
/// so that the GET stays public.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Monitoring and load balancer checks.
        .route("/health", get(handlers::health))
        // GET /
        // The latest news, newest first, capped at the configured page size.
        .route("/", get(news::home))
        // GET/POST /news/{id}/
        // News with its thread; POST adds a comment (authenticated only).
        .route("/news/{id}/", get(news::news_detail).post(news::add_comment))
        // GET /notes/
        // Landing page of the notes application.
        .route("/notes/", get(notes::notes_home))
        // --- Auth pages ---
        .route("/auth/login/", get(users::login_page))
        .route("/auth/logout/", get(users::logout).post(users::logout))
        .route("/auth/signup/", get(users::signup_page).post(users::signup))
}
