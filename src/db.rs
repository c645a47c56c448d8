use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::error::{Error, Result};
use crate::model::{
    Article, NewArticle, NewSource, NewUser, Preference, Source, SourcedArticle, User,
};
use crate::store::EntityStore;

const SOURCED_ARTICLES: &str = r#"
    SELECT
        a.id,
        a.title,
        a.summary,
        a.url,
        a.published_at,
        a.topic,
        a.tone,
        a.factuality_level,
        s.id AS source_id,
        s.name AS source_name,
        s.political_leaning
    FROM articles a
    INNER JOIN sources s ON s.id = a.source_id
"#;

pub struct Database {
    pool: SqlitePool,
}

/// Classify a write failure on the users table.
fn user_write_error(err: sqlx::Error) -> Error {
    let duplicate_email = err
        .as_database_error()
        .map_or(false, |db_err| db_err.is_unique_violation());
    if duplicate_email {
        Error::Invalid("Email already exists.".into())
    } else {
        Error::StoreUnavailable(err)
    }
}

/// Classify a write failure on the articles table.
fn article_write_error(err: sqlx::Error, source_id: i64) -> Error {
    let missing_source = err
        .as_database_error()
        .map_or(false, |db_err| db_err.is_foreign_key_violation());
    if missing_source {
        Error::Invalid(format!("NewsSource with Id={} does not exist.", source_id))
    } else {
        Error::StoreUnavailable(err)
    }
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// A private in-memory database; a single pinned connection keeps it alive.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                category TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                political_leaning TEXT NOT NULL DEFAULT 'unknown',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                summary TEXT,
                content TEXT,
                url TEXT,
                published_at TEXT NOT NULL,
                topic TEXT,
                tone TEXT NOT NULL DEFAULT 'unknown',
                factuality_level TEXT NOT NULL DEFAULT 'unknown'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                political_preference TEXT NOT NULL DEFAULT 'none'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                topic TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_articles_topic ON articles(topic)",
            "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_id)",
            "CREATE INDEX IF NOT EXISTS idx_preferences_user ON preferences(user_id)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }

    // Sources

    pub async fn create_source(&self, source: &NewSource) -> Result<Source> {
        let created = sqlx::query_as::<_, Source>(
            r#"
            INSERT INTO sources (name, url, category, is_active, political_leaning, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&source.name)
        .bind(&source.url)
        .bind(&source.category)
        .bind(source.is_active)
        .bind(&source.political_leaning)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn list_sources(&self) -> Result<Vec<Source>> {
        let sources = sqlx::query_as::<_, Source>("SELECT * FROM sources ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(sources)
    }

    pub async fn get_source(&self, id: i64) -> Result<Option<Source>> {
        let source = sqlx::query_as::<_, Source>("SELECT * FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(source)
    }

    pub async fn update_source(&self, id: i64, source: &NewSource) -> Result<Option<Source>> {
        let updated = sqlx::query_as::<_, Source>(
            r#"
            UPDATE sources
            SET name = ?, url = ?, category = ?, is_active = ?, political_leaning = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&source.name)
        .bind(&source.url)
        .bind(&source.category)
        .bind(source.is_active)
        .bind(&source.political_leaning)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Deletes the source and, by cascade, its articles.
    pub async fn delete_source(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Articles

    pub async fn create_article(&self, article: &NewArticle) -> Result<Article> {
        sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (
                source_id, title, summary, content, url,
                published_at, topic, tone, factuality_level
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(article.source_id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.url)
        .bind(article.published_at)
        .bind(&article.topic)
        .bind(&article.tone)
        .bind(&article.factuality_level)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| article_write_error(err, article.source_id))
    }

    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>("SELECT * FROM articles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(articles)
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    pub async fn update_article(&self, id: i64, article: &NewArticle) -> Result<Option<Article>> {
        sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET source_id = ?,
                title = ?,
                summary = ?,
                content = ?,
                url = ?,
                published_at = ?,
                topic = ?,
                tone = ?,
                factuality_level = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(article.source_id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.url)
        .bind(article.published_at)
        .bind(&article.topic)
        .bind(&article.tone)
        .bind(&article.factuality_level)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| article_write_error(err, article.source_id))
    }

    pub async fn delete_article(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Users

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, political_preference)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.political_preference)
        .fetch_one(&self.pool)
        .await
        .map_err(user_write_error)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, user: &NewUser) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = ?, email = ?, political_preference = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.political_preference)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(user_write_error)
    }

    /// Deletes the user and, by cascade, their preferences.
    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Preferences

    pub async fn list_preferences(&self, user_id: i64) -> Result<Vec<Preference>> {
        let preferences = sqlx::query_as::<_, Preference>(
            "SELECT * FROM preferences WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(preferences)
    }

    pub async fn create_preference(&self, user_id: i64, topic: &str) -> Result<Preference> {
        let created = sqlx::query_as::<_, Preference>(
            "INSERT INTO preferences (user_id, topic) VALUES (?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(topic)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn delete_preference(&self, user_id: i64, preference_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM preferences WHERE id = ? AND user_id = ?")
            .bind(preference_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EntityStore for Database {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user(id).await
    }

    async fn list_preferences_for_user(&self, user_id: i64) -> Result<Vec<Preference>> {
        self.list_preferences(user_id).await
    }

    async fn list_articles_by_topic(&self, topic: &str) -> Result<Vec<SourcedArticle>> {
        let sql = format!("{} WHERE a.topic = ?", SOURCED_ARTICLES);
        let articles = sqlx::query_as::<_, SourcedArticle>(&sql)
            .bind(topic)
            .fetch_all(&self.pool)
            .await?;
        Ok(articles)
    }

    async fn list_articles_with_source(&self) -> Result<Vec<SourcedArticle>> {
        let articles = sqlx::query_as::<_, SourcedArticle>(SOURCED_ARTICLES)
            .fetch_all(&self.pool)
            .await?;
        Ok(articles)
    }
}
