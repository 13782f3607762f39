pub mod error;
pub mod models;
pub mod sleep;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{ChatMessage, GenerationRequest, InferenceModel, DEFAULT_TEMPERATURE};
pub use sleep::{Sleeper, TokioSleeper};
pub use storage::{ArticleStore, AuthorStore, Storage};
pub use types::{
    reading_time, Article, ArticleDraft, ArticlePatch, ArticleQuery, Author, AuthorPatch,
    NewArticle, NewAuthor, Page,
};
