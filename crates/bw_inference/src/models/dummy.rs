use async_trait::async_trait;
use bw_core::{GenerationRequest, Result};
use serde_json::json;
use std::fmt;

use super::InferenceModel;

pub const MODEL_KIND: &str = "dummy";

const DUMMY_TOPIC: &str = "Designing Idempotent APIs for Distributed Systems";

/// Offline model that answers every prompt with canned but well-formed
/// output. Useful for running the whole pipeline without a credential.
#[derive(Default)]
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    fn article_json(topic: Option<&str>) -> String {
        let subject = topic.unwrap_or(DUMMY_TOPIC);
        let mut body = json!({
            "title": format!("A Practical Look at {}", subject),
            "excerpt": format!("What {} means in practice. Patterns, pitfalls and a checklist.", subject),
            "content": format!(
                "# {subject}\n\n## Why it matters\n\nTeams reach for {subject} when retries start to hurt.\n\n## Checklist\n\n- Name the failure modes\n- Make every write safe to repeat\n- Measure before and after\n"
            ),
            "tags": ["Architecture", "APIs", "Reliability"],
        });
        if topic.is_none() {
            body["topic"] = json!(DUMMY_TOPIC);
        }
        format!("```json\n{}\n```", body)
    }
}

#[async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn chat(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = &request.prompt;
        if prompt.contains("\"topic\"") {
            return Ok(Self::article_json(None));
        }
        if prompt.contains("JSON") {
            let topic = prompt
                .split('"')
                .nth(1)
                .filter(|t| !t.is_empty())
                .unwrap_or(DUMMY_TOPIC);
            return Ok(Self::article_json(Some(topic)));
        }
        Ok(format!("\"{}\"", DUMMY_TOPIC))
    }
}
