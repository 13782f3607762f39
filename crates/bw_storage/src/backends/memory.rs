use async_trait::async_trait;
use bw_core::{
    Article, ArticlePatch, ArticleQuery, ArticleStore, Author, AuthorPatch, AuthorStore,
    NewArticle, NewAuthor, Page, Result,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::StorageBackend;

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    authors: Vec<Author>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_articles(&self, query: &ArticleQuery) -> Page<Article> {
        let mut matching = self
            .articles
            .iter()
            .filter(|article| match &query.author_id {
                Some(author_id) => &article.author_id == author_id,
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();

        Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        }
    }

    fn count_articles(&self, author_id: Option<&str>) -> u64 {
        self.articles
            .iter()
            .filter(|article| author_id.map_or(true, |id| article.author_id == id))
            .count() as u64
    }
}

/// Process-local storage. Contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn backend_name() -> &'static str {
        "memory"
    }

    async fn connect(_url: Option<&str>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        let article = article.into_article(Uuid::new_v4().to_string(), Utc::now());
        self.store.write().await.articles.push(article.clone());
        Ok(article)
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Page<Article>> {
        Ok(self.store.read().await.list_articles(query))
    }

    async fn update_article(&self, id: &str, patch: ArticlePatch) -> Result<Option<Article>> {
        let mut store = self.store.write().await;
        Ok(store.articles.iter_mut().find(|a| a.id == id).map(|article| {
            patch.apply(article, Utc::now());
            article.clone()
        }))
    }

    async fn delete_article(&self, id: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.articles.len();
        store.articles.retain(|a| a.id != id);
        Ok(store.articles.len() != before)
    }

    async fn count_articles(&self, author_id: Option<&str>) -> Result<u64> {
        Ok(self.store.read().await.count_articles(author_id))
    }
}

#[async_trait]
impl AuthorStore for MemoryStorage {
    async fn create_author(&self, author: NewAuthor) -> Result<Author> {
        let author = author.into_author(Uuid::new_v4().to_string(), Utc::now());
        self.store.write().await.authors.push(author.clone());
        Ok(author)
    }

    async fn get_author(&self, id: &str) -> Result<Option<Author>> {
        let store = self.store.read().await;
        Ok(store.authors.iter().find(|a| a.id == id).cloned())
    }

    async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        let store = self.store.read().await;
        Ok(store.authors.iter().find(|a| a.name == name).cloned())
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        let mut authors = self.store.read().await.authors.clone();
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(authors)
    }

    async fn update_author(&self, id: &str, patch: AuthorPatch) -> Result<Option<Author>> {
        let mut store = self.store.write().await;
        Ok(store.authors.iter_mut().find(|a| a.id == id).map(|author| {
            patch.apply(author, Utc::now());
            author.clone()
        }))
    }

    async fn delete_author(&self, id: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.authors.len();
        store.authors.retain(|a| a.id != id);
        Ok(store.authors.len() != before)
    }
}
