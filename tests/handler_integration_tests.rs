mod common;

use async_trait::async_trait;
use axum::{
    Form,
    extract::{OriginalUri, Path, Query, State},
    http::{StatusCode, Uri, header},
    response::IntoResponse,
};
use common::{day, json_body, spawn_app};
use std::sync::Arc;
use uuid::Uuid;
use ya_portal::{
    AppConfig, AppError, AppState, InMemoryRepository, RepoError,
    auth::{AuthUser, Identity},
    handlers::{self, RecordId},
    models::{
        Comment, CommentForm, NewNewsItem, NewsItem, Note, NoteDraft, NoteForm, User,
    },
    repository::Repository,
    validation::slug_taken_message,
};

// --- FAILING REPOSITORY ---

// Every call fails the way a lost database connection would.
struct UnavailableRepo;

fn unavailable<T>() -> Result<T, RepoError> {
    Err(RepoError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Repository for UnavailableRepo {
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, RepoError> {
        unavailable()
    }
    async fn get_user_by_username(&self, _username: &str) -> Result<Option<User>, RepoError> {
        unavailable()
    }
    async fn create_user(&self, _user: User) -> Result<User, RepoError> {
        unavailable()
    }
    async fn create_note(&self, _author_id: Uuid, _draft: NoteDraft) -> Result<Note, RepoError> {
        unavailable()
    }
    async fn update_note(&self, _id: i64, _draft: NoteDraft) -> Result<Note, RepoError> {
        unavailable()
    }
    async fn delete_note(&self, _id: i64) -> Result<(), RepoError> {
        unavailable()
    }
    async fn get_note_by_slug(&self, _slug: &str) -> Result<Option<Note>, RepoError> {
        unavailable()
    }
    async fn list_notes_by_owner(&self, _author_id: Uuid) -> Result<Vec<Note>, RepoError> {
        unavailable()
    }
    async fn slug_exists(&self, _slug: &str, _except: Option<i64>) -> Result<bool, RepoError> {
        unavailable()
    }
    async fn count_notes(&self) -> Result<i64, RepoError> {
        unavailable()
    }
    async fn create_news(&self, _item: NewNewsItem) -> Result<NewsItem, RepoError> {
        unavailable()
    }
    async fn get_news(&self, _id: i64) -> Result<Option<NewsItem>, RepoError> {
        unavailable()
    }
    async fn list_news(&self, _limit: usize) -> Result<Vec<NewsItem>, RepoError> {
        unavailable()
    }
    async fn add_comment(&self, _news_id: i64, _author_id: Uuid, _text: String) -> Result<Comment, RepoError> {
        unavailable()
    }
    async fn get_comment(&self, _id: i64) -> Result<Option<Comment>, RepoError> {
        unavailable()
    }
    async fn update_comment(&self, _id: i64, _text: String) -> Result<Comment, RepoError> {
        unavailable()
    }
    async fn delete_comment(&self, _id: i64) -> Result<(), RepoError> {
        unavailable()
    }
    async fn list_comments(&self, _news_id: i64) -> Result<Vec<Comment>, RepoError> {
        unavailable()
    }
    async fn count_comments(&self) -> Result<i64, RepoError> {
        unavailable()
    }
}

// --- RACING REPOSITORY ---

// Answers every slug lookup with "free", as if another request took the slug
// between the handler's check and the insert. Only the store's own
// constraint is left to catch the duplicate.
struct LateSlugCheck(InMemoryRepository);

#[async_trait]
impl Repository for LateSlugCheck {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        self.0.get_user(id).await
    }
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.0.get_user_by_username(username).await
    }
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        self.0.create_user(user).await
    }
    async fn create_note(&self, author_id: Uuid, draft: NoteDraft) -> Result<Note, RepoError> {
        self.0.create_note(author_id, draft).await
    }
    async fn update_note(&self, id: i64, draft: NoteDraft) -> Result<Note, RepoError> {
        self.0.update_note(id, draft).await
    }
    async fn delete_note(&self, id: i64) -> Result<(), RepoError> {
        self.0.delete_note(id).await
    }
    async fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, RepoError> {
        self.0.get_note_by_slug(slug).await
    }
    async fn list_notes_by_owner(&self, author_id: Uuid) -> Result<Vec<Note>, RepoError> {
        self.0.list_notes_by_owner(author_id).await
    }
    async fn slug_exists(&self, _slug: &str, _except: Option<i64>) -> Result<bool, RepoError> {
        Ok(false)
    }
    async fn count_notes(&self) -> Result<i64, RepoError> {
        self.0.count_notes().await
    }
    async fn create_news(&self, item: NewNewsItem) -> Result<NewsItem, RepoError> {
        self.0.create_news(item).await
    }
    async fn get_news(&self, id: i64) -> Result<Option<NewsItem>, RepoError> {
        self.0.get_news(id).await
    }
    async fn list_news(&self, limit: usize) -> Result<Vec<NewsItem>, RepoError> {
        self.0.list_news(limit).await
    }
    async fn add_comment(&self, news_id: i64, author_id: Uuid, text: String) -> Result<Comment, RepoError> {
        self.0.add_comment(news_id, author_id, text).await
    }
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        self.0.get_comment(id).await
    }
    async fn update_comment(&self, id: i64, text: String) -> Result<Comment, RepoError> {
        self.0.update_comment(id, text).await
    }
    async fn delete_comment(&self, id: i64) -> Result<(), RepoError> {
        self.0.delete_comment(id).await
    }
    async fn list_comments(&self, news_id: i64) -> Result<Vec<Comment>, RepoError> {
        self.0.list_comments(news_id).await
    }
    async fn count_comments(&self) -> Result<i64, RepoError> {
        self.0.count_comments().await
    }
}

/// A state whose store holds `taken` (owned by `owner`) and `mine` (owned by `author`).
async fn late_slug_check_state() -> (AppState, Arc<LateSlugCheck>, User) {
    let repo = Arc::new(LateSlugCheck(InMemoryRepository::new()));
    let owner = repo
        .create_user(User {
            id: Uuid::new_v4(),
            username: "Владелец".to_string(),
        })
        .await
        .unwrap();
    let author = repo
        .create_user(User {
            id: Uuid::new_v4(),
            username: "Автор".to_string(),
        })
        .await
        .unwrap();
    for (user, slug) in [(&owner, "taken"), (&author, "mine")] {
        repo.create_note(
            user.id,
            NoteDraft {
                title: "Заголовок".to_string(),
                text: "Текст".to_string(),
                slug: slug.to_string(),
            },
        )
        .await
        .unwrap();
    }
    let state = AppState {
        repo: repo.clone(),
        config: AppConfig::default(),
    };
    (state, repo, author)
}

fn note_form(slug: &str) -> Form<NoteForm> {
    Form(NoteForm {
        title: "Новый заголовок".to_string(),
        text: "Новый текст".to_string(),
        slug: slug.to_string(),
    })
}

fn unavailable_state() -> AppState {
    AppState {
        repo: Arc::new(UnavailableRepo),
        config: AppConfig::default(),
    }
}

fn signed_in(user: &User) -> Identity {
    Identity::User(AuthUser {
        id: user.id,
        username: user.username.clone(),
    })
}

fn uri(path: &str) -> OriginalUri {
    OriginalUri(path.parse::<Uri>().unwrap())
}

// --- TESTS ---

#[tokio::test]
async fn test_home_returns_newest_news() {
    let app = spawn_app();
    app.create_news("Старая", day(3)).await;
    app.create_news("Свежая", day(0)).await;

    let page = handlers::news::home(State(app.state())).await.unwrap();

    assert_eq!(page.0.object_list.len(), 2);
    assert_eq!(page.0.object_list[0].title, "Свежая");
}

#[tokio::test]
async fn test_news_detail_hides_form_from_anonymous() {
    let app = spawn_app();
    let news = app.create_news("Заголовок", day(0)).await;

    let page = handlers::news::news_detail(Identity::Anonymous, State(app.state()), RecordId(news.id))
        .await
        .unwrap();

    assert_eq!(page.0.news, news);
    assert!(page.0.form.is_none());
}

#[tokio::test]
async fn test_add_comment_to_missing_news_is_not_found() {
    let app = spawn_app();
    let reader = app.create_user("Читатель").await;

    let result = handlers::news::add_comment(
        signed_in(&reader),
        State(app.state()),
        uri("/news/42/"),
        RecordId(42),
        Form(CommentForm {
            text: "Текст".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_add_comment_without_text_reports_required() {
    let app = spawn_app();
    let reader = app.create_user("Читатель").await;
    let news = app.create_news("Заголовок", day(0)).await;

    let response = handlers::news::add_comment(
        signed_in(&reader),
        State(app.state()),
        uri(&format!("/news/{}/", news.id)),
        RecordId(news.id),
        Form(CommentForm::default()),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.repo.count_comments().await.unwrap(), 0);
}

#[tokio::test]
async fn test_anonymous_comment_redirects_with_next() {
    let app = spawn_app();
    let news = app.create_news("Заголовок", day(0)).await;
    let path = format!("/news/{}/", news.id);

    let result = handlers::news::add_comment(
        Identity::Anonymous,
        State(app.state()),
        uri(&path),
        RecordId(news.id),
        Form(CommentForm {
            text: "Текст".to_string(),
        }),
    )
    .await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("/auth/login/?next={path}").as_str()
    );
}

#[tokio::test]
async fn test_note_detail_of_other_user_is_not_found() {
    let app = spawn_app();
    let author = app.create_user("Автор").await;
    let reader = app.create_user("Читатель").await;
    let note = app.create_note(&author, "note-slug").await;

    let result = handlers::notes::note_detail(
        signed_in(&reader),
        State(app.state()),
        uri("/notes/note/note-slug/"),
        Path(note.slug.clone()),
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let page = handlers::notes::note_detail(
        signed_in(&author),
        State(app.state()),
        uri("/notes/note/note-slug/"),
        Path(note.slug.clone()),
    )
    .await
    .unwrap();
    assert_eq!(page.0.note, note);
}

#[tokio::test]
async fn test_edit_note_with_invalid_slug_keeps_note() {
    let app = spawn_app();
    let author = app.create_user("Автор").await;
    let note = app.create_note(&author, "note-slug").await;

    let response = handlers::notes::edit_note(
        signed_in(&author),
        State(app.state()),
        uri("/notes/edit/note-slug/"),
        Path(note.slug.clone()),
        Form(NoteForm {
            title: "Заголовок".to_string(),
            text: "Текст".to_string(),
            slug: "не slug!".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let unchanged = app.repo.get_note_by_slug("note-slug").await.unwrap();
    assert_eq!(unchanged, Some(note));
}

#[tokio::test]
async fn test_login_page_without_next() {
    let page = handlers::users::login_page(Query(handlers::users::LoginQuery { next: None })).await;
    assert!(page.0.next.is_none());
}

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let result = handlers::news::home(State(unavailable_state())).await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_storage_failure_on_note_list_is_internal_error() {
    let user = User {
        id: Uuid::new_v4(),
        username: "Автор".to_string(),
    };

    let result = handlers::notes::note_list(
        signed_in(&user),
        State(unavailable_state()),
        uri("/notes/list/"),
    )
    .await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_store_slug_conflict_on_create_is_a_form_error() {
    let (state, repo, author) = late_slug_check_state().await;

    let response = handlers::notes::add_note(
        signed_in(&author),
        State(state),
        uri("/notes/add/"),
        note_form("taken"),
    )
    .await
    .unwrap();

    let page = json_body(response).await;
    assert_eq!(page["form"]["errors"]["slug"][0], slug_taken_message("taken").as_str());
    assert_eq!(page["form"]["data"]["slug"], "taken");
    assert_eq!(repo.count_notes().await.unwrap(), 2);
}

#[tokio::test]
async fn test_store_slug_conflict_on_edit_is_a_form_error() {
    let (state, repo, author) = late_slug_check_state().await;

    let response = handlers::notes::edit_note(
        signed_in(&author),
        State(state),
        uri("/notes/edit/mine/"),
        Path("mine".to_string()),
        note_form("taken"),
    )
    .await
    .unwrap();

    let page = json_body(response).await;
    assert_eq!(page["form"]["errors"]["slug"][0], slug_taken_message("taken").as_str());
    assert_eq!(page["note"]["slug"], "mine");
    let mine = repo.get_note_by_slug("mine").await.unwrap().unwrap();
    assert_eq!(mine.author_id, author.id);
    assert_eq!(mine.title, "Заголовок");
}
