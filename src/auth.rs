use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    repository::{Repository, RepositoryState},
};

/// Header accepted in `Env::Local` to act as an existing profile without a token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the identity provider's JSON Web Token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the profile id.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// Identity
///
/// Who is asking. Resolving an identity never fails: a missing, malformed or
/// expired credential simply yields `Anonymous`, and the access policy decides
/// what an anonymous visitor may do.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Anonymous,
    User(AuthUser),
}

impl Identity {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        Ok(resolve_identity(&parts.headers, repo.as_ref(), &config).await)
    }
}

/// resolve_identity
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing
///    profile is accepted as that user.
/// 2. Token: `Authorization: Bearer <jwt>` signed with the configured secret.
/// 3. Profile lookup: the subject must still have a profile.
pub async fn resolve_identity(
    headers: &HeaderMap,
    repo: &dyn Repository,
    config: &AppConfig,
) -> Identity {
    if config.env == Env::Local {
        if let Some(user_id) = dev_user_id(headers) {
            if let Some(identity) = load_identity(repo, user_id).await {
                return identity;
            }
        }
    }

    match bearer_subject(headers, &config.jwt_secret) {
        Some(user_id) => load_identity(repo, user_id)
            .await
            .unwrap_or(Identity::Anonymous),
        None => Identity::Anonymous,
    }
}

/// token_subject
///
/// The subject a request speaks for, without requiring a profile to exist yet.
/// Used by signup, which creates that profile.
pub fn token_subject(headers: &HeaderMap, config: &AppConfig) -> Option<Uuid> {
    if config.env == Env::Local {
        if let Some(user_id) = dev_user_id(headers) {
            return Some(user_id);
        }
    }
    bearer_subject(headers, &config.jwt_secret)
}

fn dev_user_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(DEV_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

fn bearer_subject(headers: &HeaderMap, secret: &str) -> Option<Uuid> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?
        .strip_prefix("Bearer ")?;

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims.sub),
        Err(e) => {
            tracing::debug!(reason = ?e.kind(), "rejected bearer token");
            None
        }
    }
}

async fn load_identity(repo: &dyn Repository, user_id: Uuid) -> Option<Identity> {
    match repo.get_user(user_id).await {
        Ok(Some(user)) => Some(Identity::User(AuthUser {
            id: user.id,
            username: user.username,
        })),
        Ok(None) => None,
        Err(e) => {
            tracing::error!(error = %e, %user_id, "profile lookup failed");
            None
        }
    }
}
