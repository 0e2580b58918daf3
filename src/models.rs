use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Field name to error messages, in the shape a form template would receive.
/// Errors that do not belong to a single field are stored under `__all__`.
pub type FormErrors = BTreeMap<String, Vec<String>>;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A profile in the `profiles` table. The `id` is the subject of the identity
/// provider's token; the username is unique and shown next to comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// Note
///
/// A personal note from the `notes` table. Only its author may see or change it.
/// The slug is globally unique and addresses the note in URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub slug: String,
    // FK to profiles.id (Owner). Never changes after creation.
    pub author_id: Uuid,
}

/// NewsItem
///
/// A row from the `news` table. News is published by administrators and is
/// read-only for the web application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub date: NaiveDate,
}

/// Comment
///
/// A comment from the `comments` table, augmented with the author's username
/// (a join operation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub news_id: i64,
    pub author_id: Uuid,
    // Loaded via a JOIN in the repository query.
    #[sqlx(default)]
    pub author_username: Option<String>,
    pub text: String,
    #[ts(type = "string")]
    pub created: DateTime<Utc>,
}

/// --- Request Payloads (Input Schemas) ---

/// NoteForm
///
/// Raw note form as submitted. Every field defaults to an empty string so that
/// a missing field is reported as a form error instead of a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NoteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// Left empty to derive the slug from the title.
    #[serde(default)]
    pub slug: String,
}

/// NoteDraft
///
/// A cleaned note ready to be stored: title and text validated, slug final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub text: String,
    pub slug: String,
}

/// CommentForm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// SignupForm
///
/// Creates the local profile for the identity provider's subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
}

/// NewNewsItem
///
/// Input used to publish news. A missing date
/// means "today".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct NewNewsItem {
    pub title: String,
    pub text: String,
    pub date: Option<NaiveDate>,
}

// --- Bound Forms ---
// A bound form carries the submitted data back to the page together with the
// errors it produced, so the visitor can correct the input and resubmit.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NoteFormContext {
    pub data: NoteForm,
    pub errors: FormErrors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentFormContext {
    pub data: CommentForm,
    pub errors: FormErrors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignupFormContext {
    pub data: SignupForm,
    pub errors: FormErrors,
}

// --- Page Contexts (Output) ---

/// NewsHomePage
///
/// The freshest news, newest first, capped at the configured page size.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NewsHomePage {
    pub object_list: Vec<NewsItem>,
}

/// NewsDetailPage
///
/// A news item with its thread. `form` is only present for authenticated visitors.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NewsDetailPage {
    pub news: NewsItem,
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<CommentFormContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentEditPage {
    pub comment: Comment,
    pub form: CommentFormContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentDeletePage {
    pub comment: Comment,
}

/// NotesHomePage
///
/// Public landing page of the notes application.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NotesHomePage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// NoteListPage
///
/// The requester's own notes. Notes of other users never appear here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteListPage {
    pub object_list: Vec<Note>,
}

/// NoteFormPage
///
/// Shared by the add and edit pages; `note` is set when editing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteFormPage {
    pub form: NoteFormContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Note>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteDetailPage {
    pub note: Note,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteDeletePage {
    pub note: Note,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SuccessPage {
    pub message: String,
}

/// LoginPage
///
/// Echoes the `next` location the visitor is sent back to after signing in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LogoutPage {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignupPage {
    pub form: SignupFormContext,
}
