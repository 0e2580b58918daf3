use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::RepoError,
    listing,
    models::{Comment, NewNewsItem, NewsItem, Note, NoteDraft, User},
    repository::Repository,
};

/// InMemoryRepository
///
/// A `Repository` held entirely in process, used by the test suites and for
/// running the service without a database. Every operation takes the single
/// lock, so the uniqueness checks and the writes they guard are atomic just
/// like the unique constraints in Postgres.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    notes: Vec<Note>,
    news: Vec<NewsItem>,
    comments: Vec<Comment>,
    last_note_id: i64,
    last_news_id: i64,
    last_comment_id: i64,
}

impl Tables {
    fn username_of(&self, id: Uuid) -> Option<String> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
    }

    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.notes
            .iter()
            .any(|note| note.slug == slug && Some(note.id) != except)
    }

    fn insert_comment(&mut self, news_id: i64, author_id: Uuid, text: String, created: DateTime<Utc>) -> Comment {
        self.last_comment_id += 1;
        let comment = Comment {
            id: self.last_comment_id,
            news_id,
            author_id,
            author_username: self.username_of(author_id),
            text,
            created,
        };
        self.comments.push(comment.clone());
        comment
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a comment with an explicit creation time. Fixtures use this to
    /// build threads whose order does not depend on the clock.
    pub async fn seed_comment(
        &self,
        news_id: i64,
        author_id: Uuid,
        text: &str,
        created: DateTime<Utc>,
    ) -> Comment {
        let mut tables = self.tables.lock().await;
        tables.insert_comment(news_id, author_id, text.to_string(), created)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|existing| existing.username == user.username) {
            return Err(RepoError::UniqueViolation {
                field: "username",
                value: user.username,
            });
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn create_note(&self, author_id: Uuid, draft: NoteDraft) -> Result<Note, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.slug_taken(&draft.slug, None) {
            return Err(RepoError::UniqueViolation {
                field: "slug",
                value: draft.slug,
            });
        }
        tables.last_note_id += 1;
        let note = Note {
            id: tables.last_note_id,
            title: draft.title,
            text: draft.text,
            slug: draft.slug,
            author_id,
        };
        tables.notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: i64, draft: NoteDraft) -> Result<Note, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.slug_taken(&draft.slug, Some(id)) {
            return Err(RepoError::UniqueViolation {
                field: "slug",
                value: draft.slug,
            });
        }
        let note = tables
            .notes
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or(RepoError::NotFound)?;
        note.title = draft.title;
        note.text = draft.text;
        note.slug = draft.slug;
        Ok(note.clone())
    }

    async fn delete_note(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.notes.len();
        tables.notes.retain(|note| note.id != id);
        if tables.notes.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.notes.iter().find(|note| note.slug == slug).cloned())
    }

    async fn list_notes_by_owner(&self, author_id: Uuid) -> Result<Vec<Note>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .notes
            .iter()
            .filter(|note| note.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn slug_exists(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError> {
        Ok(self.tables.lock().await.slug_taken(slug, except))
    }

    async fn count_notes(&self) -> Result<i64, RepoError> {
        Ok(self.tables.lock().await.notes.len() as i64)
    }

    async fn create_news(&self, item: NewNewsItem) -> Result<NewsItem, RepoError> {
        let mut tables = self.tables.lock().await;
        tables.last_news_id += 1;
        let news = NewsItem {
            id: tables.last_news_id,
            title: item.title,
            text: item.text,
            date: item.date.unwrap_or_else(|| Utc::now().date_naive()),
        };
        tables.news.push(news.clone());
        Ok(news)
    }

    async fn get_news(&self, id: i64) -> Result<Option<NewsItem>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.news.iter().find(|news| news.id == id).cloned())
    }

    async fn list_news(&self, limit: usize) -> Result<Vec<NewsItem>, RepoError> {
        let mut news = self.tables.lock().await.news.clone();
        listing::newest_first(&mut news);
        news.truncate(limit);
        Ok(news)
    }

    async fn add_comment(&self, news_id: i64, author_id: Uuid, text: String) -> Result<Comment, RepoError> {
        let mut tables = self.tables.lock().await;
        // Mirrors the foreign key on comments.news_id.
        if !tables.news.iter().any(|news| news.id == news_id) {
            return Err(RepoError::NotFound);
        }
        Ok(tables.insert_comment(news_id, author_id, text, Utc::now()))
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.comments.iter().find(|comment| comment.id == id).cloned())
    }

    async fn update_comment(&self, id: i64, text: String) -> Result<Comment, RepoError> {
        let mut tables = self.tables.lock().await;
        let comment = tables
            .comments
            .iter_mut()
            .find(|comment| comment.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.text = text;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.comments.len();
        tables.comments.retain(|comment| comment.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_comments(&self, news_id: i64) -> Result<Vec<Comment>, RepoError> {
        let mut comments: Vec<Comment> = self
            .tables
            .lock()
            .await
            .comments
            .iter()
            .filter(|comment| comment.news_id == news_id)
            .cloned()
            .collect();
        listing::oldest_first(&mut comments);
        Ok(comments)
    }

    async fn count_comments(&self) -> Result<i64, RepoError> {
        Ok(self.tables.lock().await.comments.len() as i64)
    }
}
