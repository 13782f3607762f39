use async_trait::async_trait;
use bw_core::{
    Article, ArticlePatch, ArticleQuery, ArticleStore, Author, AuthorPatch, AuthorStore, Error,
    NewArticle, NewAuthor, Page, Result,
};
use bw_storage::MemoryStorage;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory storage that counts author creations and can refuse article writes.
#[derive(Debug, Default)]
pub struct ObservedStorage {
    inner: MemoryStorage,
    reject_articles: bool,
    author_creations: AtomicUsize,
    author_lookups: AtomicUsize,
}

impl ObservedStorage {
    pub fn rejecting_articles() -> Self {
        Self {
            reject_articles: true,
            ..Default::default()
        }
    }

    pub fn author_creations(&self) -> usize {
        self.author_creations.load(Ordering::SeqCst)
    }

    pub fn author_lookups(&self) -> usize {
        self.author_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticleStore for ObservedStorage {
    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        if self.reject_articles {
            return Err(Error::Storage("disk full".to_string()));
        }
        self.inner.create_article(article).await
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        self.inner.get_article(id).await
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Page<Article>> {
        self.inner.list_articles(query).await
    }

    async fn update_article(&self, id: &str, patch: ArticlePatch) -> Result<Option<Article>> {
        self.inner.update_article(id, patch).await
    }

    async fn delete_article(&self, id: &str) -> Result<bool> {
        self.inner.delete_article(id).await
    }

    async fn count_articles(&self, author_id: Option<&str>) -> Result<u64> {
        self.inner.count_articles(author_id).await
    }
}

#[async_trait]
impl AuthorStore for ObservedStorage {
    async fn create_author(&self, author: NewAuthor) -> Result<Author> {
        self.author_creations.fetch_add(1, Ordering::SeqCst);
        self.inner.create_author(author).await
    }

    async fn get_author(&self, id: &str) -> Result<Option<Author>> {
        self.inner.get_author(id).await
    }

    async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        self.author_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_author_by_name(name).await
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        self.inner.list_authors().await
    }

    async fn update_author(&self, id: &str, patch: AuthorPatch) -> Result<Option<Author>> {
        self.inner.update_author(id, patch).await
    }

    async fn delete_author(&self, id: &str) -> Result<bool> {
        self.inner.delete_author(id).await
    }
}
