use axum::{
    Form, Json,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    AppState,
    auth,
    error::{AppError, RepoError},
    handlers::found,
    models::{FormErrors, LoginPage, LogoutPage, SignupForm, SignupFormContext, SignupPage, User},
    validation::{self, NON_FIELD_ERRORS, add_error},
};

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const NO_CREDENTIALS: &str = "Sign in with the identity provider before creating a profile.";
const PROFILE_EXISTS: &str = "This account already has a profile.";

/// LoginQuery
///
/// `next` is where the visitor was headed before being asked to log in.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// login_page
///
/// [Public Route] Credentials are checked by the external identity provider;
/// this page only carries the `next` target through the sign-in round trip.
#[utoipa::path(
    get,
    path = "/auth/login/",
    params(LoginQuery),
    responses((status = 200, description = "Login page", body = LoginPage))
)]
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<LoginPage> {
    Json(LoginPage { next: query.next })
}

/// logout
///
/// [Public Route] Sessions live with the identity provider, so there is
/// nothing to tear down server side.
#[utoipa::path(
    get,
    path = "/auth/logout/",
    responses((status = 200, description = "Logged out", body = LogoutPage))
)]
pub async fn logout() -> Json<LogoutPage> {
    Json(LogoutPage {
        message: "Вы вышли из своей учётной записи.".to_string(),
    })
}

/// signup_page
#[utoipa::path(
    get,
    path = "/auth/signup/",
    responses((status = 200, description = "Signup form", body = SignupPage))
)]
pub async fn signup_page() -> Json<SignupPage> {
    Json(SignupPage {
        form: SignupFormContext::default(),
    })
}

/// signup
///
/// [Public Route] Creates the local profile for the identity provider's
/// subject so it can own notes and comments. Problems are reported on the form.
#[utoipa::path(
    post,
    path = "/auth/signup/",
    request_body(content = SignupForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Profile created"),
        (status = 200, description = "Form errors", body = SignupPage)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let username = match validation::clean_signup(&form) {
        Ok(username) => username,
        Err(errors) => return Ok(signup_errors(form, errors)),
    };

    let Some(subject) = auth::token_subject(&headers, &state.config) else {
        let mut errors = FormErrors::new();
        add_error(&mut errors, NON_FIELD_ERRORS, NO_CREDENTIALS);
        return Ok(signup_errors(form, errors));
    };

    if state.repo.get_user(subject).await?.is_some() {
        let mut errors = FormErrors::new();
        add_error(&mut errors, NON_FIELD_ERRORS, PROFILE_EXISTS);
        return Ok(signup_errors(form, errors));
    }

    let user = User {
        id: subject,
        username,
    };
    match state.repo.create_user(user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, "profile created");
            Ok(found(state.config.login_url.clone()))
        }
        Err(RepoError::UniqueViolation { .. }) => {
            let mut errors = FormErrors::new();
            add_error(&mut errors, "username", USERNAME_TAKEN);
            Ok(signup_errors(form, errors))
        }
        Err(e) => Err(e.into()),
    }
}

fn signup_errors(data: SignupForm, errors: FormErrors) -> Response {
    Json(SignupPage {
        form: SignupFormContext { data, errors },
    })
    .into_response()
}
