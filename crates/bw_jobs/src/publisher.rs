use bw_core::{
    reading_time, Article, ArticleDraft, ArticleStore, AuthorStore, NewArticle, NewAuthor, Result,
    Storage,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

pub const AI_AUTHOR_NAME: &str = "AI Writer";
pub const AI_AUTHOR_BIO: &str = "An AI-powered content creator generating insightful articles on technology and software development.";
pub const AI_AUTHOR_AVATAR: &str = "https://api.dicebear.com/7.x/bottts/svg?seed=aiwriter";

const IMAGE_SERVICE: &str = "https://loremflickr.com/800/400";
const IMAGE_KEYWORD: &str = "technology";

/// Remembers the synthetic author's id once it is known. Owned by whoever
/// builds the publisher; `reset` forgets it.
#[derive(Debug, Default)]
pub struct AuthorCache {
    id: Mutex<Option<String>>,
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<String> {
        self.id.lock().await.clone()
    }

    pub async fn reset(&self) {
        *self.id.lock().await = None;
    }
}

/// Decorative header image keyed on the first two words of the topic.
pub fn image_url(topic: &str, now: DateTime<Utc>) -> String {
    let mut keywords: Vec<&str> = topic.split_whitespace().take(2).collect();
    keywords.push(IMAGE_KEYWORD);
    let segment = keywords.join(",");
    let random = now.timestamp_millis().to_string();

    match Url::parse(IMAGE_SERVICE) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.push(&segment);
            }
            url.query_pairs_mut().append_pair("random", &random);
            url.to_string()
        }
        Err(_) => format!("{}/{}?random={}", IMAGE_SERVICE, segment, random),
    }
}

pub struct ArticlePublisher {
    storage: Arc<dyn Storage>,
    author_cache: Arc<AuthorCache>,
}

impl fmt::Debug for ArticlePublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticlePublisher")
            .field("storage", &"<dyn Storage>")
            .field("author_cache", &self.author_cache)
            .finish()
    }
}

impl ArticlePublisher {
    pub fn new(storage: Arc<dyn Storage>, author_cache: Arc<AuthorCache>) -> Self {
        Self {
            storage,
            author_cache,
        }
    }

    /// Id of the synthetic author, creating the row on first use.
    pub async fn ensure_author(&self) -> Result<String> {
        // Held across lookup and creation so the row is only created once.
        let mut cached = self.author_cache.id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let author = match self.storage.find_author_by_name(AI_AUTHOR_NAME).await? {
            Some(author) => {
                info!("✅ {} author found", AI_AUTHOR_NAME);
                author
            }
            None => {
                let author = self
                    .storage
                    .create_author(NewAuthor {
                        name: AI_AUTHOR_NAME.to_string(),
                        bio: Some(AI_AUTHOR_BIO.to_string()),
                        avatar: Some(AI_AUTHOR_AVATAR.to_string()),
                    })
                    .await?;
                info!("✅ {} author created", AI_AUTHOR_NAME);
                author
            }
        };

        *cached = Some(author.id.clone());
        Ok(author.id)
    }

    pub async fn publish(&self, topic: &str, draft: ArticleDraft) -> Result<Article> {
        let author_id = self.ensure_author().await?;
        let now = Utc::now();

        let article = NewArticle {
            reading_time: reading_time(&draft.content),
            image_url: Some(image_url(topic, now)),
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            published_at: now,
            author_id,
            tags: draft.tags,
        };

        self.storage.create_article(article).await
    }
}
