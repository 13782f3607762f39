use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub reading_time: u32,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author_id: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub reading_time: u32,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author_id: String,
    pub tags: Vec<String>,
}

impl NewArticle {
    /// Materialize the record a backend stores for this payload.
    pub fn into_article(self, id: String, now: DateTime<Utc>) -> Article {
        Article {
            id,
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            reading_time: self.reading_time,
            image_url: self.image_url,
            published_at: self.published_at,
            author_id: self.author_id,
            tags: self.tags,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; only the fields that are `Some` are written.
pub const WORDS_PER_MINUTE: usize = 200;

/// Minutes to read `content` at 200 words per minute, never less than one.
pub fn reading_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub reading_time: Option<u32>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

impl ArticlePatch {
    pub fn apply(self, article: &mut Article, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            article.title = title;
        }
        if let Some(excerpt) = self.excerpt {
            article.excerpt = excerpt;
        }
        if let Some(content) = self.content {
            article.content = content;
        }
        if let Some(reading_time) = self.reading_time {
            article.reading_time = reading_time;
        }
        if let Some(image_url) = self.image_url {
            article.image_url = Some(image_url);
        }
        if let Some(published_at) = self.published_at {
            article.published_at = published_at;
        }
        if let Some(tags) = self.tags {
            article.tags = tags;
        }
        article.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuthor {
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl NewAuthor {
    pub fn into_author(self, id: String, now: DateTime<Utc>) -> Author {
        Author {
            id,
            name: self.name,
            bio: self.bio,
            avatar: self.avatar,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorPatch {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl AuthorPatch {
    pub fn apply(self, author: &mut Author, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            author.name = name;
        }
        if let Some(bio) = self.bio {
            author.bio = Some(bio);
        }
        if let Some(avatar) = self.avatar {
            author.avatar = Some(avatar);
        }
        author.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub page: u32,
    pub limit: u32,
    pub author_id: Option<String>,
}

impl ArticleQuery {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
            author_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

/// What the content generator hands to the publisher. Every text field is
/// non-empty once fallbacks have been applied, and `tags` holds at most
/// three entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub topic: Option<String>,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
}
