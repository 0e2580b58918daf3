#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, Response, StatusCode, header},
};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use ya_portal::{
    AppConfig, AppState, InMemoryRepository, RepositoryState, create_router,
    auth::DEV_USER_HEADER,
    models::{NewNewsItem, NewsItem, Note, NoteDraft, User},
    repository::Repository,
};

/// TestApp
///
/// The full router over an in-memory store. Requests are sent in process and
/// users are impersonated with the local `x-user-id` header.
pub struct TestApp {
    pub repo: Arc<InMemoryRepository>,
    pub config: AppConfig,
    router: Router,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default())
}

pub fn spawn_app_with(config: AppConfig) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: config.clone(),
    };
    TestApp {
        repo,
        config,
        router: create_router(state),
    }
}

impl TestApp {
    pub fn state(&self) -> AppState {
        AppState {
            repo: self.repo.clone() as RepositoryState,
            config: self.config.clone(),
        }
    }

    pub async fn create_user(&self, username: &str) -> User {
        self.repo
            .create_user(User {
                id: Uuid::new_v4(),
                username: username.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn create_news(&self, title: &str, date: NaiveDate) -> NewsItem {
        self.repo
            .create_news(NewNewsItem {
                title: title.to_string(),
                text: "Просто текст.".to_string(),
                date: Some(date),
            })
            .await
            .unwrap()
    }

    pub async fn create_note(&self, author: &User, slug: &str) -> Note {
        self.repo
            .create_note(
                author.id,
                NoteDraft {
                    title: "Заголовок".to_string(),
                    text: "Текст заметки".to_string(),
                    slug: slug.to_string(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, as_user: Option<&User>) -> Response<Body> {
        self.send(request(Method::GET, uri, as_user, Body::empty()))
            .await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        as_user: Option<&User>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let mut req = request(Method::POST, uri, as_user, Body::from(encode_form(fields)));
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        self.send(req).await
    }

    pub async fn delete(&self, uri: &str, as_user: Option<&User>) -> Response<Body> {
        self.send(request(Method::DELETE, uri, as_user, Body::empty()))
            .await
    }
}

pub fn request(method: Method, uri: &str, as_user: Option<&User>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = as_user {
        builder = builder.header(DEV_USER_HEADER, user.id.to_string());
    }
    builder.body(body).unwrap()
}

pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub async fn json_body(response: Response<Body>) -> Value {
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    assert_eq!(response.status(), StatusCode::FOUND);
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Where an anonymous visitor of `path` is sent.
pub fn login_redirect(path: &str) -> String {
    format!("/auth/login/?next={path}")
}

pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 31).unwrap() - chrono::Duration::days(offset)
}
