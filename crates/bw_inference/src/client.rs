use bw_core::{GenerationRequest, InferenceModel, Sleeper, TokioSleeper};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one fails
    pub retries: u32,
    /// Fixed pause between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

/// Wraps a single-shot [`InferenceModel`] with retries. Failure never
/// surfaces as an error: callers get an empty string and decide what to
/// fall back to.
pub struct TextGenerationClient {
    model: Arc<dyn InferenceModel>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
}

impl fmt::Debug for TextGenerationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextGenerationClient")
            .field("model", &self.model)
            .field("retry", &self.retry)
            .finish()
    }
}

impl TextGenerationClient {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            model,
            sleeper: Arc::new(TokioSleeper),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_configured()
    }

    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> String {
        if !self.is_configured() {
            warn!("{} is not configured, skipping completion", self.model.name());
            return String::new();
        }

        let request = GenerationRequest::new(prompt, max_tokens);
        let attempts = self.retry.attempts();

        for attempt in 1..=attempts {
            match self.model.chat(&request).await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        return text.to_string();
                    }
                    warn!("Empty response on attempt {}/{}", attempt, attempts);
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                }
            }

            if attempt < attempts {
                self.sleeper.sleep(self.retry.delay).await;
            }
        }

        error!("Text generation failed after {} attempts", attempts);
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSleeper, ScriptedModel};
    use bw_core::Error;

    fn client(model: Arc<ScriptedModel>, sleeper: Arc<RecordingSleeper>) -> TextGenerationClient {
        TextGenerationClient::new(model).with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_first_success_returns_trimmed_text() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("  hello world \n".to_string())]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let text = client(model.clone(), sleeper.clone()).complete("prompt", 50).await;

        assert_eq!(text, "hello world");
        assert_eq!(model.calls(), 1);
        assert!(sleeper.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_third_attempt_success_is_returned() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(Error::Inference("boom".to_string())),
            Ok("   ".to_string()),
            Ok("third time lucky".to_string()),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let text = client(model.clone(), sleeper.clone()).complete("prompt", 50).await;

        assert_eq!(text, "third time lucky");
        assert_eq!(model.calls(), 3);
        assert_eq!(sleeper.pauses(), vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_empty_string() {
        let model = Arc::new(ScriptedModel::failing());
        let sleeper = Arc::new(RecordingSleeper::default());

        let text = client(model.clone(), sleeper.clone()).complete("prompt", 50).await;

        assert_eq!(text, "");
        assert_eq!(model.calls(), 3);
        assert_eq!(sleeper.pauses().len(), 2);
    }

    #[tokio::test]
    async fn test_request_carries_budget_and_temperature() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("ok".to_string())]));
        let sleeper = Arc::new(RecordingSleeper::default());

        client(model.clone(), sleeper).complete("Pick a topic", 50).await;

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "Pick a topic");
        assert_eq!(requests[0].max_tokens, 50);
        assert_eq!(requests[0].temperature, 0.7);
    }

    #[tokio::test]
    async fn test_unconfigured_client_makes_no_calls() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("unused".to_string())]).unconfigured());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(model.clone(), sleeper.clone());

        assert!(!client.is_configured());
        assert_eq!(client.complete("prompt", 50).await, "");
        assert_eq!(model.calls(), 0);
        assert!(sleeper.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_custom_retry_policy() {
        let model = Arc::new(ScriptedModel::failing());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(model.clone(), sleeper.clone()).with_retry_policy(RetryPolicy {
            retries: 0,
            delay: Duration::from_millis(10),
        });

        assert_eq!(client.complete("prompt", 50).await, "");
        assert_eq!(model.calls(), 1);
        assert!(sleeper.pauses().is_empty());
    }
}
