use axum::{
    extract::{FromRef, OriginalUri, Request, State},
    http::HeaderName,
    Router,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod memory;
pub mod models;
pub mod policy;
pub mod repository;
pub mod validation;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use auth::Identity;
use policy::{Action, Resource};
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, RepoError};
pub use memory::InMemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every handler decorated with `#[utoipa::path]` and the page
/// schemas they return. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::news::home, handlers::news::news_detail, handlers::news::add_comment,
        handlers::news::edit_comment_form, handlers::news::edit_comment,
        handlers::news::delete_comment_confirm, handlers::news::delete_comment,
        handlers::notes::notes_home, handlers::notes::note_list, handlers::notes::note_success,
        handlers::notes::add_note_form, handlers::notes::add_note, handlers::notes::note_detail,
        handlers::notes::edit_note_form, handlers::notes::edit_note,
        handlers::notes::delete_note_confirm, handlers::notes::delete_note,
        handlers::users::login_page, handlers::users::logout, handlers::users::signup_page,
        handlers::users::signup
    ),
    components(
        schemas(
            models::User, models::Note, models::NewsItem, models::Comment,
            models::NoteForm, models::CommentForm, models::SignupForm,
            models::NoteFormContext, models::CommentFormContext, models::SignupFormContext,
            models::NewsHomePage, models::NewsDetailPage, models::CommentEditPage,
            models::CommentDeletePage, models::NotesHomePage, models::NoteListPage,
            models::NoteFormPage, models::NoteDetailPage, models::NoteDeletePage,
            models::SuccessPage, models::LoginPage, models::LogoutPage, models::SignupPage,
        )
    ),
    tags(
        (name = "ya-portal", description = "News with comments and personal notes")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by all requests: the store and the
/// configuration loaded at startup.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// require_login
///
/// Guards the `authenticated_routes`. Anonymous visitors are redirected to the
/// login page with the requested URL in `next`; the handler never runs, so no
/// lookup or mutation happens on their behalf.
async fn require_login(
    identity: Identity,
    State(config): State<AppConfig>,
    OriginalUri(uri): OriginalUri,
    request: Request,
    next: Next,
) -> Response {
    let decision = policy::authorize(&identity, &Resource::MemberArea, Action::View);
    match decision.require(&config.login_url, handlers::requested(&uri)) {
        Ok(()) => next.run(request).await,
        Err(denied) => denied.into_response(),
    }
}

/// create_router
///
/// Assembles the routing table, applies the login guard and the observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_login)),
        )
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            // Generates a unique UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // Wraps the request/response lifecycle in a span carrying the request ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Returns the x-request-id header to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request is correlated
/// by its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
