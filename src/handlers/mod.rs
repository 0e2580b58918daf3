//! Request handlers, grouped by application.
//!
//! Every handler that touches a protected resource goes through
//! [`policy::authorize`]; the helpers below turn its decision into the
//! redirect or 404 the visitor sees.

use axum::{
    extract::{FromRequestParts, Path},
    http::{StatusCode, Uri, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::{AuthUser, Identity},
    error::AppError,
    policy::{self, Action, Owned, Resource},
};

pub mod news;
pub mod notes;
pub mod users;

/// RecordId
///
/// Numeric id taken from the path. Anything that is not an `i64` addresses no
/// record, so it is answered with 404 rather than a 400 rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(%rejection, path = parts.uri.path(), "path id does not match");
                AppError::NotFound
            })?;
        Ok(Self(id))
    }
}

/// 302 Found to `location`.
pub(crate) fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

/// The path and query the visitor asked for, used as the login `next` target.
pub(crate) fn requested(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|path_and_query| path_and_query.as_str())
        .unwrap_or_else(|| uri.path())
}

/// member
///
/// Authorizes `action` on a non-owned resource and returns the signed-in user.
pub(crate) fn member(
    state: &AppState,
    identity: &Identity,
    resource: Resource<'_>,
    action: Action,
    uri: &Uri,
) -> Result<AuthUser, AppError> {
    policy::authorize(identity, &resource, action).require(&state.config.login_url, requested(uri))?;
    identity
        .user()
        .cloned()
        .ok_or_else(|| AppError::must_authenticate(&state.config.login_url, requested(uri)))
}

/// owned
///
/// Authorizes `action` on a looked-up note or comment and hands it back.
/// Missing and foreign resources both end in `AppError::NotFound`.
pub(crate) fn owned<T: Owned>(
    state: &AppState,
    identity: &Identity,
    item: Option<T>,
    action: Action,
    uri: &Uri,
) -> Result<T, AppError> {
    let decision = policy::authorize(identity, &Resource::owned(item.as_ref()), action);
    if !decision.is_allowed() {
        tracing::debug!(?decision, ?action, path = uri.path(), "access denied");
    }
    decision.require(&state.config.login_url, requested(uri))?;
    item.ok_or(AppError::NotFound)
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
