use bw_core::ArticleDraft;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::TextGenerationClient;
use crate::extract::{self, DEFAULT_TOPIC};

pub const TOPIC_MAX_TOKENS: u32 = 50;
pub const ARTICLE_MAX_TOKENS: u32 = 2000;

const TOPIC_PROMPT: &str = "Generate a unique, specific, and interesting blog post topic about software engineering, web development, system design, or cloud computing. Only output the topic, nothing else.";

const COMBINED_PROMPT: &str = r#"Generate a fresh and specific blog post topic in software engineering, web development, system design, or cloud computing.
Then write a complete blog post about that topic.

Return ONLY a valid JSON object with:

{
  "topic": "string",
  "title": "string",
  "excerpt": "2 sentence summary",
  "content": "500-800 word markdown article (#, ##, lists, etc)",
  "tags": ["tag1", "tag2", "tag3"]
}

NO explanations.
NO markdown fences like ```.
NO text outside the JSON."#;

fn article_prompt(topic: &str) -> String {
    format!(
        r#"Write a complete blog post about "{topic}".
Return the result strictly as a valid JSON object with exactly these fields:
{{
  "title": "Catchy title",
  "excerpt": "2 sentence summary",
  "content": "Full article content (500-800 words) in Markdown format (use #, ##, -, *, etc.)",
  "tags": ["tag1", "tag2", "tag3"]
}}

Ensure the content is engaging, informative, and well-structured.
Do not include any markdown formatting (like ```json) outside the JSON object."#
    )
}

/// How a generation cycle talks to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationMode {
    /// One short call for the topic, then one call for the article
    #[default]
    TwoPhase,
    /// A single call in which the model picks the topic and writes the article
    Combined,
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-phase" => Ok(Self::TwoPhase),
            "combined" => Ok(Self::Combined),
            other => Err(format!("Invalid generation mode: {}", other)),
        }
    }
}

/// Produces article drafts. Never fails: every path ends in a usable draft,
/// degraded to fallback text when the model misbehaves.
#[derive(Debug, Clone)]
pub struct ContentGenerator {
    client: Arc<TextGenerationClient>,
}

impl ContentGenerator {
    pub fn new(client: Arc<TextGenerationClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TextGenerationClient {
        &self.client
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    pub async fn generate_topic(&self) -> String {
        let raw = self.client.complete(TOPIC_PROMPT, TOPIC_MAX_TOKENS).await;
        let topic = extract::clean_text(&raw);
        if topic.is_empty() {
            warn!("No topic generated, using default topic");
            return DEFAULT_TOPIC.to_string();
        }
        topic
    }

    pub async fn generate_full_article(&self, topic: &str) -> ArticleDraft {
        let raw = self
            .client
            .complete(&article_prompt(topic), ARTICLE_MAX_TOKENS)
            .await;
        extract::parse_article_draft(&raw, topic)
    }

    pub async fn generate_topic_and_article(&self) -> ArticleDraft {
        let raw = self.client.complete(COMBINED_PROMPT, ARTICLE_MAX_TOKENS).await;
        extract::parse_topic_and_article(&raw)
    }

    pub async fn generate(&self, mode: GenerationMode) -> ArticleDraft {
        match mode {
            GenerationMode::TwoPhase => {
                info!("🤔 Generating interesting topic...");
                let topic = self.generate_topic().await;
                info!("📝 Generating article about: \"{}\"...", topic);
                self.generate_full_article(&topic).await
            }
            GenerationMode::Combined => {
                info!("📝 Generating topic and article in one pass...");
                self.generate_topic_and_article().await
            }
        }
    }
}
