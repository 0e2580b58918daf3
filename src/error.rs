use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// RepoError
///
/// Failures raised by a `Repository` implementation. A `UniqueViolation` is a
/// recoverable condition that handlers turn into a form error; everything else
/// ends the request.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{field} `{value}` is already taken")]
    UniqueViolation { field: &'static str, value: String },
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// AppError
///
/// Terminal outcomes of a request. Denials never carry the reason: a visitor
/// who does not own a resource gets the same 404 as one asking for a resource
/// that does not exist.
#[derive(Debug, Error)]
pub enum AppError {
    /// The visitor is anonymous; `location` is the login page with `next` set.
    #[error("authentication required")]
    MustAuthenticate { location: String },
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Repository(RepoError),
}

impl AppError {
    /// Builds the login redirect for an anonymous visitor of `next`.
    pub fn must_authenticate(login_url: &str, next: &str) -> Self {
        Self::MustAuthenticate {
            location: login_redirect(login_url, next),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::MustAuthenticate { location } => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "detail": "Not found." })),
            )
                .into_response(),
            Self::Repository(err) => {
                // Log the underlying storage error but return a generic internal error.
                tracing::error!(error = %err, "repository failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "detail": "Internal server error." })),
                )
                    .into_response()
            }
        }
    }
}

/// login_redirect
///
/// `<login_url>?next=<next>`. Path separators stay readable so the `next`
/// value matches the requested path verbatim.
pub fn login_redirect(login_url: &str, next: &str) -> String {
    let encoded = urlencoding::encode(next).replace("%2F", "/");
    format!("{login_url}?next={encoded}")
}
