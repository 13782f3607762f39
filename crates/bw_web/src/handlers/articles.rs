use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bw_core::{
    reading_time, Article, ArticlePatch, ArticleQuery, ArticleStore, Author, AuthorStore,
    NewArticle,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::response::{ApiResponse, Meta};
use crate::validate::{char_len_between, is_http_url, Violations};
use crate::AppState;

const TITLE_MAX: usize = 255;

/// An article with its author embedded.
#[derive(Debug, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub author: Option<Author>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub author_id: Option<String>,
}

impl ListParams {
    fn into_query(self) -> ApiResult<ArticleQuery> {
        let page = self.page.unwrap_or(ArticleQuery::DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(ArticleQuery::DEFAULT_LIMIT);

        let mut v = Violations::new();
        v.check(page >= 1, "Page must be a positive integer");
        v.check(
            (1..=ArticleQuery::MAX_LIMIT).contains(&limit),
            "Limit must be between 1 and 100",
        );
        v.finish()?;

        Ok(ArticleQuery {
            page,
            limit,
            author_id: self.author_id.filter(|id| !id.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleBody {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image_url: Option<String>,
    pub reading_time: Option<u32>,
    pub published_at: DateTime<Utc>,
    pub author_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateArticleBody {
    fn validate(&self) -> ApiResult<()> {
        let mut v = Violations::new();
        v.check(!self.title.is_empty(), "Title is required");
        v.check(
            self.title.chars().count() <= TITLE_MAX,
            "Title must be at most 255 characters",
        );
        v.check(!self.excerpt.is_empty(), "Excerpt is required");
        v.check(!self.content.is_empty(), "Content is required");
        v.check(!self.author_id.is_empty(), "Author id is required");
        if let Some(url) = &self.image_url {
            v.check(is_http_url(url), "Image URL must be a valid URL");
        }
        if let Some(minutes) = self.reading_time {
            v.check(minutes >= 1, "Reading time must be a positive integer");
        }
        v.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleBody {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub reading_time: Option<u32>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

impl UpdateArticleBody {
    fn into_patch(self) -> ApiResult<ArticlePatch> {
        let mut v = Violations::new();
        if let Some(title) = &self.title {
            v.check(
                char_len_between(title, 1, TITLE_MAX),
                "Title must be between 1 and 255 characters",
            );
        }
        if let Some(excerpt) = &self.excerpt {
            v.check(!excerpt.is_empty(), "Excerpt must not be empty");
        }
        if let Some(content) = &self.content {
            v.check(!content.is_empty(), "Content must not be empty");
        }
        if let Some(url) = &self.image_url {
            v.check(is_http_url(url), "Image URL must be a valid URL");
        }
        if let Some(minutes) = self.reading_time {
            v.check(minutes >= 1, "Reading time must be a positive integer");
        }
        v.finish()?;

        Ok(ArticlePatch {
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            reading_time: self.reading_time,
            image_url: self.image_url,
            published_at: self.published_at,
            tags: self.tags,
        })
    }
}

async fn with_author(state: &AppState, article: Article) -> ApiResult<ArticleView> {
    let author = state.storage.get_author(&article.author_id).await?;
    Ok(ArticleView { article, author })
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let page = state.storage.list_articles(&query).await?;
    let meta = Meta::from(&page);

    let mut authors: HashMap<String, Option<Author>> = HashMap::new();
    let mut views = Vec::with_capacity(page.items.len());
    for article in page.items {
        if !authors.contains_key(&article.author_id) {
            let author = state.storage.get_author(&article.author_id).await?;
            authors.insert(article.author_id.clone(), author);
        }
        let author = authors.get(&article.author_id).cloned().flatten();
        views.push(ArticleView { article, author });
    }

    Ok(Json(ApiResponse::paginated(views, meta)))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let article = state
        .storage
        .get_article(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(Json(ApiResponse::ok(with_author(&state, article).await?)))
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateArticleBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    body.validate()?;

    if state.storage.get_author(&body.author_id).await?.is_none() {
        return Err(ApiError::bad_request("Author not found"));
    }

    let article = state
        .storage
        .create_article(NewArticle {
            reading_time: body
                .reading_time
                .unwrap_or_else(|| reading_time(&body.content)),
            title: body.title,
            excerpt: body.excerpt,
            content: body.content,
            image_url: body.image_url,
            published_at: body.published_at,
            author_id: body.author_id,
            tags: body.tags,
        })
        .await?;

    let view = with_author(&state, article).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateArticleBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let patch = body.into_patch()?;

    let article = state
        .storage
        .update_article(&id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(Json(ApiResponse::ok(with_author(&state, article).await?)))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.storage.delete_article(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Article not found"))
    }
}
