use std::fmt;

pub mod client;
pub mod extract;
pub mod generator;
pub mod models;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{RetryPolicy, TextGenerationClient};
pub use generator::{ContentGenerator, GenerationMode};
pub use models::create_model;

#[derive(Clone)]
pub struct Config {
    /// Credential for the hosted model. Generation is skipped when absent.
    pub api_key: Option<String>,
    /// Which model implementation to use (`huggingface` or `dummy`)
    pub model: String,
    /// Remote model identifier, e.g. `openai/gpt-oss-120b:fastest`
    pub model_name: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: models::huggingface::MODEL_KIND.to_string(),
            model_name: None,
            base_url: None,
        }
    }
}

pub mod prelude {
    pub use super::Config;
    pub use super::models::create_model;
    pub use super::{ContentGenerator, GenerationMode, TextGenerationClient};
    pub use bw_core::{ArticleDraft, Error, InferenceModel, Result};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_api_key() {
        let config = Config {
            api_key: Some("hf_secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hf_secret"));
        assert!(debug.contains("<redacted>"));
    }
}
