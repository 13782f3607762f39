use async_trait::async_trait;
use bw_core::{
    Article, ArticlePatch, ArticleQuery, ArticleStore, Author, AuthorPatch, AuthorStore, Error,
    NewArticle, NewAuthor, Page, Result,
};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::StorageBackend;

const DEFAULT_DB_PATH: &str = "blog.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS authors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        bio TEXT,
        avatar TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        excerpt TEXT NOT NULL,
        content TEXT NOT NULL,
        reading_time INTEGER NOT NULL,
        image_url TEXT,
        published_at TEXT NOT NULL,
        author_id TEXT NOT NULL,
        tags TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at)",
    "CREATE INDEX IF NOT EXISTS idx_articles_author_id ON articles(author_id)",
];

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Database(format!("{}: {}", context, e))
}

// Fixed-width timestamps so that text ordering matches time ordering.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(column);
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse {}: {}", column, e)))
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let tags: String = row.get("tags");
    let reading_time: i64 = row.get("reading_time");
    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        reading_time: u32::try_from(reading_time).unwrap_or(1),
        image_url: row.get::<Option<String>, _>("image_url"),
        published_at: parse_time(row, "published_at")?,
        author_id: row.get("author_id"),
        tags: serde_json::from_str(&tags)?,
        created_at: parse_time(row, "created_at")?,
        updated_at: parse_time(row, "updated_at")?,
    })
}

fn author_from_row(row: &SqliteRow) -> Result<Author> {
    Ok(Author {
        id: row.get("id"),
        name: row.get("name"),
        bio: row.get::<Option<String>, _>("bio"),
        avatar: row.get::<Option<String>, _>("avatar"),
        created_at: parse_time(row, "created_at")?,
        updated_at: parse_time(row, "updated_at")?,
    })
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn backend_name() -> &'static str {
        "sqlite"
    }

    async fn connect(url: Option<&str>) -> Result<Self> {
        let raw = url.unwrap_or(DEFAULT_DB_PATH);
        let path = raw.strip_prefix("sqlite://").unwrap_or(raw);
        let path = path.strip_prefix("sqlite:").unwrap_or(path);
        Self::new_with_path(Path::new(path)).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn write_article(&self, article: &Article) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO articles
            (id, title, excerpt, content, reading_time, image_url, published_at, author_id, tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(i64::from(article.reading_time))
        .bind(article.image_url.as_deref())
        .bind(format_time(&article.published_at))
        .bind(&article.author_id)
        .bind(serde_json::to_string(&article.tags)?)
        .bind(format_time(&article.created_at))
        .bind(format_time(&article.updated_at))
        .execute(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to store article", e))?;
        Ok(())
    }

    async fn write_author(&self, author: &Author) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO authors
            (id, name, bio, avatar, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&author.id)
        .bind(&author.name)
        .bind(author.bio.as_deref())
        .bind(author.avatar.as_deref())
        .bind(format_time(&author.created_at))
        .bind(format_time(&author.updated_at))
        .execute(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to store author", e))?;
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        let article = article.into_article(Uuid::new_v4().to_string(), Utc::now());
        self.write_article(&article).await?;
        Ok(article)
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to get article", e))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Page<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE (? IS NULL OR author_id = ?)
            ORDER BY published_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(query.author_id.as_deref())
        .bind(query.author_id.as_deref())
        .bind(i64::from(query.limit))
        .bind(query.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to list articles", e))?;

        let items = rows
            .iter()
            .map(article_from_row)
            .collect::<Result<Vec<_>>>()?;
        let total = self.count_articles(query.author_id.as_deref()).await?;

        Ok(Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn update_article(&self, id: &str, patch: ArticlePatch) -> Result<Option<Article>> {
        let Some(mut article) = self.get_article(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut article, Utc::now());
        self.write_article(&article).await?;
        Ok(Some(article))
    }

    async fn delete_article(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to delete article", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_articles(&self, author_id: Option<&str>) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE (? IS NULL OR author_id = ?)")
                .bind(author_id)
                .bind(author_id)
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| db_error("Failed to count articles", e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl AuthorStore for SQLiteStorage {
    async fn create_author(&self, author: NewAuthor) -> Result<Author> {
        let author = author.into_author(Uuid::new_v4().to_string(), Utc::now());
        self.write_author(&author).await?;
        Ok(author)
    }

    async fn get_author(&self, id: &str) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT * FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to get author", e))?;
        row.as_ref().map(author_from_row).transpose()
    }

    async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT * FROM authors WHERE name = ? ORDER BY created_at LIMIT 1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to find author", e))?;
        row.as_ref().map(author_from_row).transpose()
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        let rows = sqlx::query("SELECT * FROM authors ORDER BY name ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to list authors", e))?;
        rows.iter().map(author_from_row).collect()
    }

    async fn update_author(&self, id: &str, patch: AuthorPatch) -> Result<Option<Author>> {
        let Some(mut author) = self.get_author(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut author, Utc::now());
        self.write_author(&author).await?;
        Ok(Some(author))
    }

    async fn delete_author(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to delete author", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        assert_eq!(storage.get_db_path(), db_path.as_path());

        let author = storage
            .create_author(NewAuthor {
                name: "AI Writer".to_string(),
                bio: Some("Writes".to_string()),
                avatar: None,
            })
            .await
            .unwrap();

        for (title, days_ago) in [("older", 2), ("newer", 1)] {
            storage
                .create_article(NewArticle {
                    title: title.to_string(),
                    excerpt: "Excerpt".to_string(),
                    content: "Content".to_string(),
                    reading_time: 3,
                    image_url: Some("https://example.com/a.png".to_string()),
                    published_at: Utc::now() - Duration::days(days_ago),
                    author_id: author.id.clone(),
                    tags: vec!["a".to_string(), "b".to_string()],
                })
                .await
                .unwrap();
        }

        let page = storage
            .list_articles(&ArticleQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "newer");
        assert_eq!(page.items[0].tags, vec!["a", "b"]);
        assert_eq!(page.items[0].reading_time, 3);

        let found = storage.find_author_by_name("AI Writer").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(author.id.clone()));
        assert_eq!(storage.count_articles(Some(&author.id)).await.unwrap(), 2);
        assert_eq!(storage.count_articles(Some("nobody")).await.unwrap(), 0);

        let first = page.items[0].clone();
        let updated = storage
            .update_article(
                &first.id,
                ArticlePatch {
                    excerpt: Some("Changed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.excerpt, "Changed");
        assert_eq!(
            storage.get_article(&first.id).await.unwrap().unwrap().excerpt,
            "Changed"
        );

        assert!(storage.delete_article(&first.id).await.unwrap());
        assert_eq!(storage.count_articles(None).await.unwrap(), 1);
    }
}
