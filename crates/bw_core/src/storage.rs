use async_trait::async_trait;

use crate::types::{
    Article, ArticlePatch, ArticleQuery, Author, AuthorPatch, NewArticle, NewAuthor, Page,
};
use crate::Result;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Store a new article and return it with its generated id
    async fn create_article(&self, article: NewArticle) -> Result<Article>;

    async fn get_article(&self, id: &str) -> Result<Option<Article>>;

    /// List articles newest first, paginated and optionally filtered by author
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Page<Article>>;

    /// Apply a partial update. `None` when the article does not exist.
    async fn update_article(&self, id: &str, patch: ArticlePatch) -> Result<Option<Article>>;

    /// Returns whether an article was removed
    async fn delete_article(&self, id: &str) -> Result<bool>;

    async fn count_articles(&self, author_id: Option<&str>) -> Result<u64>;
}

#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn create_author(&self, author: NewAuthor) -> Result<Author>;

    async fn get_author(&self, id: &str) -> Result<Option<Author>>;

    async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>>;

    /// All authors ordered by name
    async fn list_authors(&self) -> Result<Vec<Author>>;

    async fn update_author(&self, id: &str, patch: AuthorPatch) -> Result<Option<Author>>;

    async fn delete_author(&self, id: &str) -> Result<bool>;
}

/// Everything the blog needs from a backend.
pub trait Storage: ArticleStore + AuthorStore {}

impl<T: ArticleStore + AuthorStore> Storage for T {}
