use axum::{
    http::{StatusCode, header},
    response::IntoResponse,
};
use ya_portal::{AppError, RepoError, error::login_redirect};

#[test]
fn test_login_redirect_keeps_path_verbatim() {
    assert_eq!(
        login_redirect("/auth/login/", "/notes/edit/test-slug/"),
        "/auth/login/?next=/notes/edit/test-slug/"
    );
}

#[test]
fn test_login_redirect_escapes_query_separators() {
    assert_eq!(
        login_redirect("/auth/login/", "/notes/list/?page=2&x=1"),
        "/auth/login/?next=/notes/list/%3Fpage%3D2%26x%3D1"
    );
}

#[test]
fn test_missing_record_maps_to_not_found() {
    assert!(matches!(
        AppError::from(RepoError::NotFound),
        AppError::NotFound
    ));
}

#[test]
fn test_not_found_response_is_404() {
    let response = AppError::NotFound.into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_must_authenticate_response_redirects() {
    let response = AppError::must_authenticate("/auth/login/", "/notes/add/").into_response();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/auth/login/?next=/notes/add/"
    );
}
