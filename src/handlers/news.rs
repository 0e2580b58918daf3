use axum::{
    Form, Json,
    extract::{OriginalUri, State},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::Identity,
    error::AppError,
    handlers::{RecordId, found, member, owned},
    listing,
    models::{
        Comment, CommentDeletePage, CommentEditPage, CommentForm, CommentFormContext,
        NewsDetailPage, NewsHomePage,
    },
    policy::{Action, Resource},
    validation,
};

/// Where the visitor lands after a comment changes: the thread of its news item.
fn thread_url(news_id: i64) -> String {
    format!("/news/{news_id}/#comments")
}

/// home
///
/// [Public Route] The newest news, capped at `NEWS_COUNT_ON_HOME_PAGE`.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home page", body = NewsHomePage))
)]
pub async fn home(State(state): State<AppState>) -> Result<Json<NewsHomePage>, AppError> {
    let object_list = listing::home_page(state.repo.as_ref(), state.config.news_page_size).await?;
    Ok(Json(NewsHomePage { object_list }))
}

/// news_detail
///
/// [Public Route] A news item with its comment thread, oldest comment first.
/// The comment form is only offered to authenticated visitors.
#[utoipa::path(
    get,
    path = "/news/{id}/",
    params(("id" = i64, Path, description = "News ID")),
    responses(
        (status = 200, description = "News detail", body = NewsDetailPage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn news_detail(
    identity: Identity,
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<NewsDetailPage>, AppError> {
    let news = state.repo.get_news(id).await?.ok_or(AppError::NotFound)?;
    let comments = listing::thread(state.repo.as_ref(), id).await?;
    let form = identity
        .is_authenticated()
        .then(CommentFormContext::default);

    Ok(Json(NewsDetailPage {
        news,
        comments,
        form,
    }))
}

/// add_comment
///
/// [Authenticated Action] Posts a comment from the news detail page.
/// Anonymous visitors are sent to the login page and nothing is stored.
/// A comment containing a banned word re-renders the page with the error and
/// the submitted text.
#[utoipa::path(
    post,
    path = "/news/{id}/",
    params(("id" = i64, Path, description = "News ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Comment added, or login required"),
        (status = 200, description = "Form errors", body = NewsDetailPage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_comment(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RecordId(id): RecordId,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let user = member(&state, &identity, Resource::PublicPage, Action::Create, &uri)?;
    let news = state.repo.get_news(id).await?.ok_or(AppError::NotFound)?;

    match validation::clean_comment(&state.config.moderation, &form) {
        Ok(text) => {
            let comment = state.repo.add_comment(news.id, user.id, text).await?;
            tracing::info!(comment_id = comment.id, news_id = news.id, author = %user.id, "comment added");
            Ok(found(thread_url(news.id)))
        }
        Err(errors) => {
            let comments = listing::thread(state.repo.as_ref(), news.id).await?;
            let page = NewsDetailPage {
                news,
                comments,
                form: Some(CommentFormContext { data: form, errors }),
            };
            Ok(Json(page).into_response())
        }
    }
}

async fn load_comment(state: &AppState, id: i64) -> Result<Option<Comment>, AppError> {
    Ok(state.repo.get_comment(id).await?)
}

/// edit_comment_form
///
/// [Owner Route] The edit form prefilled with the comment's text.
#[utoipa::path(
    get,
    path = "/edit_comment/{id}/",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Edit form", body = CommentEditPage),
        (status = 302, description = "Login required"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn edit_comment_form(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RecordId(id): RecordId,
) -> Result<Json<CommentEditPage>, AppError> {
    let comment = owned(&state, &identity, load_comment(&state, id).await?, Action::Edit, &uri)?;
    let form = CommentFormContext {
        data: CommentForm {
            text: comment.text.clone(),
        },
        ..CommentFormContext::default()
    };
    Ok(Json(CommentEditPage { comment, form }))
}

/// edit_comment
///
/// [Owner Route] Saves the new text and returns to the thread. The same
/// banned-word filter as for new comments applies.
#[utoipa::path(
    post,
    path = "/edit_comment/{id}/",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Updated, or login required"),
        (status = 200, description = "Form errors", body = CommentEditPage),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn edit_comment(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RecordId(id): RecordId,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let comment = owned(&state, &identity, load_comment(&state, id).await?, Action::Edit, &uri)?;

    match validation::clean_comment(&state.config.moderation, &form) {
        Ok(text) => {
            let updated = state.repo.update_comment(comment.id, text).await?;
            tracing::info!(comment_id = updated.id, "comment updated");
            Ok(found(thread_url(updated.news_id)))
        }
        Err(errors) => {
            let page = CommentEditPage {
                comment,
                form: CommentFormContext { data: form, errors },
            };
            Ok(Json(page).into_response())
        }
    }
}

/// delete_comment_confirm
///
/// [Owner Route] Confirmation page before deleting.
#[utoipa::path(
    get,
    path = "/delete_comment/{id}/",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Confirmation", body = CommentDeletePage),
        (status = 302, description = "Login required"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn delete_comment_confirm(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RecordId(id): RecordId,
) -> Result<Json<CommentDeletePage>, AppError> {
    let comment = owned(&state, &identity, load_comment(&state, id).await?, Action::Delete, &uri)?;
    Ok(Json(CommentDeletePage { comment }))
}

/// delete_comment
///
/// [Owner Route] Deletes the comment and returns to the thread.
#[utoipa::path(
    post,
    path = "/delete_comment/{id}/",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 302, description = "Deleted, or login required"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn delete_comment(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RecordId(id): RecordId,
) -> Result<Response, AppError> {
    let comment = owned(&state, &identity, load_comment(&state, id).await?, Action::Delete, &uri)?;
    state.repo.delete_comment(comment.id).await?;
    tracing::info!(comment_id = comment.id, "comment deleted");
    Ok(found(thread_url(comment.news_id)))
}
