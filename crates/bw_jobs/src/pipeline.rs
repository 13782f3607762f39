use bw_core::{Article, ArticleStore, Result, Sleeper, Storage, TokioSleeper};
use bw_inference::extract::DEFAULT_TOPIC;
use bw_inference::ContentGenerator;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::publisher::{ArticlePublisher, AuthorCache};
use crate::JobsConfig;

/// One generation cycle end to end: topic, article, persistence.
pub struct ArticlePipeline {
    generator: ContentGenerator,
    publisher: ArticlePublisher,
    storage: Arc<dyn Storage>,
    sleeper: Arc<dyn Sleeper>,
    config: JobsConfig,
}

impl fmt::Debug for ArticlePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticlePipeline")
            .field("generator", &self.generator)
            .field("publisher", &self.publisher)
            .field("config", &self.config)
            .finish()
    }
}

impl ArticlePipeline {
    pub fn new(
        generator: ContentGenerator,
        storage: Arc<dyn Storage>,
        author_cache: Arc<AuthorCache>,
        config: JobsConfig,
    ) -> Self {
        Self {
            generator,
            publisher: ArticlePublisher::new(storage.clone(), author_cache),
            storage,
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    pub fn publisher(&self) -> &ArticlePublisher {
        &self.publisher
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_configured()
    }

    /// Generate and store one article. A failed cycle is logged and skipped;
    /// `None` means nothing was published.
    pub async fn generate_article(&self) -> Option<Article> {
        if !self.is_configured() {
            warn!(
                "⚠️ {} API token not configured. Skipping article generation.",
                self.generator.client().model_name()
            );
            return None;
        }

        match self.run_cycle().await {
            Ok(article) => {
                info!(
                    "✅ Article generated: \"{}\" (ID: {})",
                    article.title, article.id
                );
                Some(article)
            }
            Err(e) => {
                error!("❌ Failed to generate article: {}", e);
                None
            }
        }
    }

    async fn run_cycle(&self) -> Result<Article> {
        self.publisher.ensure_author().await?;

        let draft = self.generator.generate(self.config.mode).await;
        let topic = draft
            .topic
            .clone()
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        info!("🏷️ Generated tags: {}", draft.tags.join(", "));

        self.publisher.publish(&topic, draft).await
    }

    /// Top the store up to `target` articles, one cycle at a time with a
    /// pause between cycles. Returns how many articles were published.
    pub async fn seed_initial_articles(&self, target: u64) -> Result<usize> {
        if !self.is_configured() {
            warn!("⚠️ API token not configured. Skipping article seeding.");
            warn!("   Set HUGGINGFACE_API_TOKEN to enable AI article generation.");
            return Ok(0);
        }

        info!("🌱 Running seed...");
        self.publisher.ensure_author().await?;

        let existing = self.storage.count_articles(None).await?;
        if existing >= target {
            info!("📚 Already have {} articles. Skipping seed.", existing);
            return Ok(0);
        }

        let to_generate = target - existing;
        info!("📚 Seeding {} initial articles...", to_generate);

        let mut published = 0;
        for i in 0..to_generate {
            if self.generate_article().await.is_some() {
                published += 1;
            }
            if i + 1 < to_generate {
                self.sleeper.sleep(self.config.seed_delay).await;
            }
        }

        info!("🌱 Seed completed: {}/{} articles published", published, to_generate);
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ObservedStorage;
    use bw_core::NewArticle;
    use bw_inference::extract::FALLBACK_CONTENT;
    use bw_inference::testing::{RecordingSleeper, ScriptedModel};
    use bw_inference::{GenerationMode, TextGenerationClient};
    use chrono::Utc;
    use std::time::Duration;

    struct Fixture {
        model: Arc<ScriptedModel>,
        storage: Arc<ObservedStorage>,
        sleeper: Arc<RecordingSleeper>,
        pipeline: ArticlePipeline,
    }

    fn fixture_with(model: ScriptedModel, storage: ObservedStorage, config: JobsConfig) -> Fixture {
        let model = Arc::new(model);
        let storage = Arc::new(storage);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = TextGenerationClient::new(model.clone()).with_sleeper(sleeper.clone());
        let pipeline = ArticlePipeline::new(
            ContentGenerator::new(Arc::new(client)),
            storage.clone(),
            Arc::new(AuthorCache::new()),
            config,
        )
        .with_sleeper(sleeper.clone());
        Fixture {
            model,
            storage,
            sleeper,
            pipeline,
        }
    }

    fn fixture(model: ScriptedModel) -> Fixture {
        fixture_with(model, ObservedStorage::default(), JobsConfig::default())
    }

    const ARTICLE_JSON: &str =
        r#"{"title":"T","excerpt":"E","content":"C","tags":["a","b","c","d"]}"#;

    #[tokio::test]
    async fn test_generate_article_publishes() {
        let f = fixture(ScriptedModel::replies([
            "Serverless Functions".to_string(),
            format!("```json\n{}\n```", ARTICLE_JSON),
        ]));

        let article = f.pipeline.generate_article().await.unwrap();

        assert_eq!(article.title, "T");
        assert_eq!(article.tags, vec!["a", "b", "c"]);
        assert_eq!(article.reading_time, 1);
        assert!(article
            .image_url
            .as_deref()
            .unwrap()
            .contains("/Serverless,Functions,technology?"));
        assert_eq!(f.storage.count_articles(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_still_publishes_fallback_article() {
        let f = fixture(ScriptedModel::failing());

        let article = f.pipeline.generate_article().await.unwrap();

        assert_eq!(article.title, format!("Exploring {}", DEFAULT_TOPIC));
        assert_eq!(article.content, FALLBACK_CONTENT);
        assert_eq!(article.tags, vec!["Technology", "Software"]);
        // three topic attempts plus three article attempts
        assert_eq!(f.model.calls(), 6);
        assert_eq!(f.sleeper.pauses(), vec![Duration::from_secs(1); 4]);
    }

    #[tokio::test]
    async fn test_unconfigured_model_skips_generation() {
        let f = fixture(ScriptedModel::replies(["unused"]).unconfigured());

        assert!(f.pipeline.generate_article().await.is_none());
        assert_eq!(f.model.calls(), 0);
        assert_eq!(f.storage.author_creations(), 0);
        assert_eq!(f.pipeline.seed_initial_articles(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_swallowed() {
        let f = fixture_with(
            ScriptedModel::replies(["Topic".to_string(), ARTICLE_JSON.to_string()]),
            ObservedStorage::rejecting_articles(),
            JobsConfig::default(),
        );

        assert!(f.pipeline.generate_article().await.is_none());
        assert_eq!(f.model.calls(), 2);
    }

    #[tokio::test]
    async fn test_combined_mode_uses_model_topic() {
        let f = fixture_with(
            ScriptedModel::replies([
                r#"{"topic":"Edge Caching","title":"T","excerpt":"E","content":"C","tags":["x"]}"#,
            ]),
            ObservedStorage::default(),
            JobsConfig {
                mode: GenerationMode::Combined,
                ..Default::default()
            },
        );

        let article = f.pipeline.generate_article().await.unwrap();

        assert_eq!(f.model.calls(), 1);
        assert!(article
            .image_url
            .as_deref()
            .unwrap()
            .contains("/Edge,Caching,technology?"));
    }

    #[tokio::test]
    async fn test_seed_generates_missing_articles_sequentially() {
        let replies = (0..3).flat_map(|i| [format!("Topic {}", i), ARTICLE_JSON.to_string()]);
        let f = fixture(ScriptedModel::replies(replies));

        let published = f.pipeline.seed_initial_articles(3).await.unwrap();

        assert_eq!(published, 3);
        assert_eq!(f.storage.count_articles(None).await.unwrap(), 3);
        assert_eq!(f.storage.author_creations(), 1);
        // pauses between cycles only, none after the last
        assert_eq!(f.sleeper.pauses(), vec![Duration::from_secs(2); 2]);
    }

    #[tokio::test]
    async fn test_seed_only_fills_the_gap() {
        let f = fixture(ScriptedModel::replies(["Topic", ARTICLE_JSON]));
        let author_id = f.pipeline.publisher().ensure_author().await.unwrap();
        for i in 0..2 {
            f.storage
                .create_article(NewArticle {
                    title: format!("Existing {}", i),
                    excerpt: "E".to_string(),
                    content: "C".to_string(),
                    reading_time: 1,
                    image_url: None,
                    published_at: Utc::now(),
                    author_id: author_id.clone(),
                    tags: vec![],
                })
                .await
                .unwrap();
        }

        assert_eq!(f.pipeline.seed_initial_articles(3).await.unwrap(), 1);
        assert_eq!(f.model.calls(), 2);
        assert!(f.sleeper.pauses().is_empty());

        // already at target: nothing more happens
        assert_eq!(f.pipeline.seed_initial_articles(3).await.unwrap(), 0);
        assert_eq!(f.model.calls(), 2);
    }
}
