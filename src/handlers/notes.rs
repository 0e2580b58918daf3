use axum::{
    Form, Json,
    extract::{OriginalUri, Path, State},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::Identity,
    error::{AppError, RepoError},
    handlers::{found, member, owned},
    models::{
        FormErrors, Note, NoteDeletePage, NoteDetailPage, NoteDraft, NoteForm, NoteFormContext,
        NoteFormPage, NoteListPage, NotesHomePage, SuccessPage,
    },
    policy::{Action, Resource},
    validation::{self, add_error, slug_taken_message},
};

/// Every successful note change lands here.
pub const SUCCESS_URL: &str = "/notes/done/";

/// notes_home
///
/// [Public Route] Landing page of the notes application.
#[utoipa::path(
    get,
    path = "/notes/",
    responses((status = 200, description = "Notes home", body = NotesHomePage))
)]
pub async fn notes_home(identity: Identity) -> Json<NotesHomePage> {
    Json(NotesHomePage {
        username: identity.user().map(|user| user.username.clone()),
    })
}

/// note_list
///
/// [Authenticated Route] The requester's own notes, nobody else's.
#[utoipa::path(
    get,
    path = "/notes/list/",
    responses(
        (status = 200, description = "My notes", body = NoteListPage),
        (status = 302, description = "Login required")
    )
)]
pub async fn note_list(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<NoteListPage>, AppError> {
    let user = member(&state, &identity, Resource::MemberArea, Action::View, &uri)?;
    let object_list = state.repo.list_notes_by_owner(user.id).await?;
    Ok(Json(NoteListPage { object_list }))
}

/// note_success
///
/// [Authenticated Route] Shown after a note is added, edited or deleted.
#[utoipa::path(
    get,
    path = "/notes/done/",
    responses(
        (status = 200, description = "Success", body = SuccessPage),
        (status = 302, description = "Login required")
    )
)]
pub async fn note_success(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<SuccessPage>, AppError> {
    member(&state, &identity, Resource::MemberArea, Action::View, &uri)?;
    Ok(Json(SuccessPage {
        message: "Успешно!".to_string(),
    }))
}

/// add_note_form
///
/// [Authenticated Route] An empty note form.
#[utoipa::path(
    get,
    path = "/notes/add/",
    responses(
        (status = 200, description = "Note form", body = NoteFormPage),
        (status = 302, description = "Login required")
    )
)]
pub async fn add_note_form(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<NoteFormPage>, AppError> {
    member(&state, &identity, Resource::MemberArea, Action::View, &uri)?;
    Ok(Json(NoteFormPage {
        form: NoteFormContext::default(),
        note: None,
    }))
}

/// add_note
///
/// [Authenticated Route] Creates a note owned by the requester. A slug already
/// used by any note, whoever owns it, re-renders the form with an error on `slug`.
#[utoipa::path(
    post,
    path = "/notes/add/",
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Created, or login required"),
        (status = 200, description = "Form errors", body = NoteFormPage)
    )
)]
pub async fn add_note(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    let user = member(&state, &identity, Resource::MemberArea, Action::Create, &uri)?;

    let draft = match clean_unique(&state, &form, None).await? {
        Ok(draft) => draft,
        Err(errors) => return Ok(form_page(form, errors, None)),
    };

    match state.repo.create_note(user.id, draft).await {
        Ok(note) => {
            tracing::info!(note_id = note.id, slug = %note.slug, author = %user.id, "note created");
            Ok(found(SUCCESS_URL))
        }
        Err(RepoError::UniqueViolation { value, .. }) => Ok(slug_conflict(form, &value, None)),
        Err(e) => Err(e.into()),
    }
}

/// note_detail
///
/// [Owner Route] A single note. Other users get 404.
#[utoipa::path(
    get,
    path = "/notes/note/{slug}/",
    params(("slug" = String, Path, description = "Note slug")),
    responses(
        (status = 200, description = "Note", body = NoteDetailPage),
        (status = 302, description = "Login required"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn note_detail(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
) -> Result<Json<NoteDetailPage>, AppError> {
    let note = owned(&state, &identity, load_note(&state, &slug).await?, Action::View, &uri)?;
    Ok(Json(NoteDetailPage { note }))
}

/// edit_note_form
///
/// [Owner Route] The note form prefilled with the current values.
#[utoipa::path(
    get,
    path = "/notes/edit/{slug}/",
    params(("slug" = String, Path, description = "Note slug")),
    responses(
        (status = 200, description = "Note form", body = NoteFormPage),
        (status = 302, description = "Login required"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn edit_note_form(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
) -> Result<Json<NoteFormPage>, AppError> {
    let note = owned(&state, &identity, load_note(&state, &slug).await?, Action::Edit, &uri)?;
    let data = NoteForm {
        title: note.title.clone(),
        text: note.text.clone(),
        slug: note.slug.clone(),
    };
    Ok(Json(NoteFormPage {
        form: NoteFormContext {
            data,
            errors: FormErrors::new(),
        },
        note: Some(note),
    }))
}

/// edit_note
///
/// [Owner Route] Updates title, text and slug. The note may keep its own slug;
/// taking one used by another note is refused like on creation.
#[utoipa::path(
    post,
    path = "/notes/edit/{slug}/",
    params(("slug" = String, Path, description = "Note slug")),
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Updated, or login required"),
        (status = 200, description = "Form errors", body = NoteFormPage),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn edit_note(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    let note = owned(&state, &identity, load_note(&state, &slug).await?, Action::Edit, &uri)?;

    let draft = match clean_unique(&state, &form, Some(note.id)).await? {
        Ok(draft) => draft,
        Err(errors) => return Ok(form_page(form, errors, Some(note))),
    };

    match state.repo.update_note(note.id, draft).await {
        Ok(updated) => {
            tracing::info!(note_id = updated.id, slug = %updated.slug, "note updated");
            Ok(found(SUCCESS_URL))
        }
        Err(RepoError::UniqueViolation { value, .. }) => {
            Ok(slug_conflict(form, &value, Some(note)))
        }
        Err(e) => Err(e.into()),
    }
}

/// delete_note_confirm
///
/// [Owner Route] Confirmation page before deleting.
#[utoipa::path(
    get,
    path = "/notes/delete/{slug}/",
    params(("slug" = String, Path, description = "Note slug")),
    responses(
        (status = 200, description = "Confirmation", body = NoteDeletePage),
        (status = 302, description = "Login required"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn delete_note_confirm(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
) -> Result<Json<NoteDeletePage>, AppError> {
    let note = owned(&state, &identity, load_note(&state, &slug).await?, Action::Delete, &uri)?;
    Ok(Json(NoteDeletePage { note }))
}

/// delete_note
///
/// [Owner Route] Deletes the note. Reachable with POST from the confirmation
/// form and with DELETE.
#[utoipa::path(
    post,
    path = "/notes/delete/{slug}/",
    params(("slug" = String, Path, description = "Note slug")),
    responses(
        (status = 302, description = "Deleted, or login required"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn delete_note(
    identity: Identity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let note = owned(&state, &identity, load_note(&state, &slug).await?, Action::Delete, &uri)?;
    state.repo.delete_note(note.id).await?;
    tracing::info!(note_id = note.id, slug = %note.slug, "note deleted");
    Ok(found(SUCCESS_URL))
}

async fn load_note(state: &AppState, slug: &str) -> Result<Option<Note>, AppError> {
    Ok(state.repo.get_note_by_slug(slug).await?)
}

/// clean_unique
///
/// Form validation plus the slug pre-check. The outer `Result` carries
/// storage failures, the inner one form errors.
async fn clean_unique(
    state: &AppState,
    form: &NoteForm,
    except: Option<i64>,
) -> Result<Result<NoteDraft, FormErrors>, AppError> {
    let draft = match validation::clean_note(form) {
        Ok(draft) => draft,
        Err(errors) => return Ok(Err(errors)),
    };

    if state.repo.slug_exists(&draft.slug, except).await? {
        let mut errors = FormErrors::new();
        add_error(&mut errors, "slug", slug_taken_message(&draft.slug));
        return Ok(Err(errors));
    }
    Ok(Ok(draft))
}

// The store refused a slug the pre-check accepted: another note took it meanwhile.
fn slug_conflict(form: NoteForm, slug: &str, note: Option<Note>) -> Response {
    let mut errors = FormErrors::new();
    add_error(&mut errors, "slug", slug_taken_message(slug));
    form_page(form, errors, note)
}

fn form_page(data: NoteForm, errors: FormErrors, note: Option<Note>) -> Response {
    Json(NoteFormPage {
        form: NoteFormContext { data, errors },
        note,
    })
    .into_response()
}
