use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bw_core::{ArticleStore, Author, AuthorPatch, AuthorStore, NewAuthor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::validate::{char_len_between, is_http_url, Violations};
use crate::AppState;

const NAME_MAX: usize = 100;
const BIO_MAX: usize = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    #[serde(flatten)]
    pub author: Author,
    pub article_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateAuthorBody {
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAuthorBody {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

fn check_profile(v: &mut Violations, avatar: Option<&str>, bio: Option<&str>) {
    if let Some(avatar) = avatar {
        v.check(is_http_url(avatar), "Avatar must be a valid URL");
    }
    if let Some(bio) = bio {
        v.check(
            bio.chars().count() <= BIO_MAX,
            "Bio must be at most 500 characters",
        );
    }
}

impl CreateAuthorBody {
    fn validate(&self) -> ApiResult<()> {
        let mut v = Violations::new();
        v.check(!self.name.is_empty(), "Name is required");
        v.check(
            self.name.chars().count() <= NAME_MAX,
            "Name must be at most 100 characters",
        );
        check_profile(&mut v, self.avatar.as_deref(), self.bio.as_deref());
        v.finish()
    }
}

impl UpdateAuthorBody {
    fn into_patch(self) -> ApiResult<AuthorPatch> {
        let mut v = Violations::new();
        if let Some(name) = &self.name {
            v.check(
                char_len_between(name, 1, NAME_MAX),
                "Name must be between 1 and 100 characters",
            );
        }
        check_profile(&mut v, self.avatar.as_deref(), self.bio.as_deref());
        v.finish()?;

        Ok(AuthorPatch {
            name: self.name,
            bio: self.bio,
            avatar: self.avatar,
        })
    }
}

async fn with_count(state: &AppState, author: Author) -> ApiResult<AuthorView> {
    let article_count = state.storage.count_articles(Some(&author.id)).await?;
    Ok(AuthorView {
        author,
        article_count,
    })
}

pub async fn list_authors(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let authors = state.storage.list_authors().await?;
    let mut views = Vec::with_capacity(authors.len());
    for author in authors {
        views.push(with_count(&state, author).await?);
    }
    Ok(Json(ApiResponse::ok(views)))
}

pub async fn get_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let author = state
        .storage
        .get_author(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Author not found"))?;
    Ok(Json(ApiResponse::ok(with_count(&state, author).await?)))
}

pub async fn create_author(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateAuthorBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    body.validate()?;

    let author = state
        .storage
        .create_author(NewAuthor {
            name: body.name,
            bio: body.bio,
            avatar: body.avatar,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(author))))
}

pub async fn update_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateAuthorBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let patch = body.into_patch()?;

    let author = state
        .storage
        .update_author(&id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Author not found"))?;
    Ok(Json(ApiResponse::ok(author)))
}

pub async fn delete_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.storage.get_author(&id).await?.is_none() {
        return Err(ApiError::not_found("Author not found"));
    }

    let articles = state.storage.count_articles(Some(&id)).await?;
    if articles > 0 {
        return Err(ApiError::bad_request(format!(
            "Cannot delete author with {} articles",
            articles
        )));
    }

    state.storage.delete_author(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
