use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;

/// Sampling temperature used for every generation call.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single-turn completion request. Built per call and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::user(self.prompt.clone())]
    }
}

#[async_trait]
pub trait InferenceModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether the model has what it needs (credentials) to be called.
    fn is_configured(&self) -> bool {
        true
    }

    /// Perform exactly one chat completion and return the raw text.
    async fn chat(&self, request: &GenerationRequest) -> Result<String>;
}
