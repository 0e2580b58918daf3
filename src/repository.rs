use crate::error::RepoError;
use crate::models::{Comment, NewNewsItem, NewsItem, Note, NoteDraft, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers to interact with the data layer without knowing whether Postgres or
/// the in-memory store sits behind it.
///
/// Ownership is not checked here. Handlers consult the access policy first;
/// `update_*`/`delete_*` are unconditional for the id they are given.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    // Fails with UniqueViolation on a taken username.
    async fn create_user(&self, user: User) -> Result<User, RepoError>;

    // --- Notes ---
    // Both fail with UniqueViolation when the slug is used by any other note.
    async fn create_note(&self, author_id: Uuid, draft: NoteDraft) -> Result<Note, RepoError>;
    async fn update_note(&self, id: i64, draft: NoteDraft) -> Result<Note, RepoError>;
    async fn delete_note(&self, id: i64) -> Result<(), RepoError>;
    async fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, RepoError>;
    async fn list_notes_by_owner(&self, author_id: Uuid) -> Result<Vec<Note>, RepoError>;
    // `except` skips the note being edited so it may keep its own slug.
    async fn slug_exists(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError>;
    async fn count_notes(&self) -> Result<i64, RepoError>;

    // --- News ---
    async fn create_news(&self, item: NewNewsItem) -> Result<NewsItem, RepoError>;
    async fn get_news(&self, id: i64) -> Result<Option<NewsItem>, RepoError>;
    // Newest first, at most `limit` items.
    async fn list_news(&self, limit: usize) -> Result<Vec<NewsItem>, RepoError>;

    // --- Comments ---
    // Stamps `created` with the current time.
    async fn add_comment(&self, news_id: i64, author_id: Uuid, text: String) -> Result<Comment, RepoError>;
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, RepoError>;
    async fn update_comment(&self, id: i64, text: String) -> Result<Comment, RepoError>;
    async fn delete_comment(&self, id: i64) -> Result<(), RepoError>;
    // Oldest first.
    async fn list_comments(&self, news_id: i64) -> Result<Vec<Comment>, RepoError>;
    async fn count_comments(&self) -> Result<i64, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const NOTE_COLUMNS: &str = "id, title, text, slug, author_id";

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.news_id, c.author_id, p.username AS author_username, c.text, c.created
    FROM comments c
    JOIN profiles p ON p.id = c.author_id
"#;

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. Slug and username uniqueness are
/// enforced by unique constraints; violations are mapped to `UniqueViolation`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Translates a failure of the unique `constraint` into a `UniqueViolation` on
/// `field`. Any other violation (a primary key clash, say) stays a database error.
fn unique_or_db(
    err: sqlx::Error,
    constraint: &str,
    field: &'static str,
    value: &str,
) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.constraint() == Some(constraint) {
            return RepoError::UniqueViolation {
                field,
                value: value.to_string(),
            };
        }
    }
    RepoError::Database(err)
}

// The news item was deleted (or never existed) between lookup and insert.
fn missing_news_or_db(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return RepoError::NotFound;
        }
    }
    RepoError::Database(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM profiles WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Creates the profile mirroring the identity provider's subject.
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO profiles (id, username) VALUES ($1, $2) RETURNING id, username",
        )
        .bind(user.id)
        .bind(&user.username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, "profiles_username_key", "username", &user.username))
    }

    // --- NOTES ---

    async fn create_note(&self, author_id: Uuid, draft: NoteDraft) -> Result<Note, RepoError> {
        let query = format!(
            "INSERT INTO notes (title, text, slug, author_id) VALUES ($1, $2, $3, $4) RETURNING {NOTE_COLUMNS}"
        );
        sqlx::query_as::<_, Note>(&query)
            .bind(&draft.title)
            .bind(&draft.text)
            .bind(&draft.slug)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_or_db(e, "notes_slug_key", "slug", &draft.slug))
    }

    /// update_note
    ///
    /// Title, text and slug may all change; the author never does.
    async fn update_note(&self, id: i64, draft: NoteDraft) -> Result<Note, RepoError> {
        let query = format!(
            "UPDATE notes SET title = $2, text = $3, slug = $4 WHERE id = $1 RETURNING {NOTE_COLUMNS}"
        );
        sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .bind(&draft.title)
            .bind(&draft.text)
            .bind(&draft.slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unique_or_db(e, "notes_slug_key", "slug", &draft.slug))?
            .ok_or(RepoError::NotFound)
    }

    async fn delete_note(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, RepoError> {
        let query = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE slug = $1");
        let note = sqlx::query_as::<_, Note>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(note)
    }

    async fn list_notes_by_owner(&self, author_id: Uuid) -> Result<Vec<Note>, RepoError> {
        let query = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE author_id = $1 ORDER BY id");
        let notes = sqlx::query_as::<_, Note>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(notes)
    }

    async fn slug_exists(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM notes WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_notes(&self) -> Result<i64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // --- NEWS ---

    async fn create_news(&self, item: NewNewsItem) -> Result<NewsItem, RepoError> {
        let news = sqlx::query_as::<_, NewsItem>(
            r#"
            INSERT INTO news (title, text, date)
            VALUES ($1, $2, COALESCE($3, CURRENT_DATE))
            RETURNING id, title, text, date
            "#,
        )
        .bind(&item.title)
        .bind(&item.text)
        .bind(item.date)
        .fetch_one(&self.pool)
        .await?;
        Ok(news)
    }

    async fn get_news(&self, id: i64) -> Result<Option<NewsItem>, RepoError> {
        let news = sqlx::query_as::<_, NewsItem>("SELECT id, title, text, date FROM news WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(news)
    }

    /// list_news
    ///
    /// Ties on `date` keep insertion order through the `id` tiebreaker.
    async fn list_news(&self, limit: usize) -> Result<Vec<NewsItem>, RepoError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let news = sqlx::query_as::<_, NewsItem>(
            "SELECT id, title, text, date FROM news ORDER BY date DESC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(news)
    }

    // --- COMMENTS ---

    /// add_comment
    ///
    /// Inserts and joins with `profiles` in one statement so the returned comment
    /// carries the author's username.
    async fn add_comment(&self, news_id: i64, author_id: Uuid, text: String) -> Result<Comment, RepoError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (news_id, author_id, text, created)
                VALUES ($1, $2, $3, NOW())
                RETURNING id, news_id, author_id, text, created
            )
            SELECT i.id, i.news_id, i.author_id, p.username AS author_username, i.text, i.created
            FROM inserted i JOIN profiles p ON p.id = i.author_id
            "#,
        )
        .bind(news_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(missing_news_or_db)?;
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        let query = format!("{COMMENT_SELECT} WHERE c.id = $1");
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, text: String) -> Result<Comment, RepoError> {
        let updated = sqlx::query("UPDATE comments SET text = $2 WHERE id = $1")
            .bind(id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.get_comment(id).await?.ok_or(RepoError::NotFound)
    }

    async fn delete_comment(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_comments(&self, news_id: i64) -> Result<Vec<Comment>, RepoError> {
        let query = format!("{COMMENT_SELECT} WHERE c.news_id = $1 ORDER BY c.created ASC, c.id ASC");
        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(news_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn count_comments(&self) -> Result<i64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
