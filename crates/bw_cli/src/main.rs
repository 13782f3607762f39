use anyhow::Context;
use bw_core::{Article, Storage};
use bw_inference::{ContentGenerator, GenerationMode, TextGenerationClient};
use bw_jobs::{ArticlePipeline, AuthorCache, DailySchedule, JobsConfig, Scheduler};
use bw_web::AppState;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

mod logging;

fn parse_daily_at(value: &str) -> std::result::Result<DailySchedule, String> {
    DailySchedule::parse(value).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "AI-written blog backend", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "BW_STORAGE", default_value = "memory")]
    storage: String,
    /// Connection string for the storage backend
    #[arg(long, env = "BW_DATABASE_URL")]
    database_url: Option<String>,
    #[arg(
        long,
        env = "BW_MODEL",
        default_value = "huggingface",
        help = "Model to use for generation. Available models: huggingface (default), dummy"
    )]
    model: String,
    /// Remote model identifier
    #[arg(long, env = "BW_MODEL_NAME")]
    model_name: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "BW_API_BASE_URL")]
    api_base_url: Option<String>,
    #[arg(long, env = "HUGGINGFACE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
    /// Ask for topic and article in a single model call
    #[arg(long)]
    single_prompt: bool,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the REST API, seed the store and run the daily generator
    Serve {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        #[arg(long, env = "BW_SEED_TARGET", default_value_t = 3)]
        seed_target: u64,
        /// Local time of the daily generation (HH:MM)
        #[arg(long, env = "BW_DAILY_AT", default_value = "00:00", value_parser = parse_daily_at)]
        daily_at: DailySchedule,
    },
    /// Generate and store a single article. Without a model credential this
    /// only warns and exits successfully, like the server would.
    Generate,
    /// Top the store up to the target number of articles
    Seed {
        #[arg(long, env = "BW_SEED_TARGET", default_value_t = 3)]
        target: u64,
    },
}

impl Cli {
    fn inference_config(&self) -> bw_inference::Config {
        bw_inference::Config {
            api_key: self.api_token.clone(),
            model: self.model.clone(),
            model_name: self.model_name.clone(),
            base_url: self.api_base_url.clone(),
        }
    }

    fn jobs_config(&self) -> JobsConfig {
        let mut config = JobsConfig {
            mode: if self.single_prompt {
                GenerationMode::Combined
            } else {
                GenerationMode::TwoPhase
            },
            ..Default::default()
        };
        match &self.command {
            Commands::Serve {
                seed_target,
                daily_at,
                ..
            } => {
                config.seed_target = *seed_target;
                config.daily_at = daily_at.at();
            }
            Commands::Seed { target } => config.seed_target = *target,
            Commands::Generate => {}
        }
        config
    }
}

async fn build_pipeline(cli: &Cli, storage: Arc<dyn Storage>) -> anyhow::Result<Arc<ArticlePipeline>> {
    let model = bw_inference::create_model(&cli.inference_config())?;
    info!("🧠 Inference model initialized (using {})", model.name());

    let client = TextGenerationClient::new(model);
    let generator = ContentGenerator::new(Arc::new(client));
    Ok(Arc::new(ArticlePipeline::new(
        generator,
        storage,
        Arc::new(AuthorCache::new()),
        cli.jobs_config(),
    )))
}

/// `Ok(None)` when no model credential is configured. A configured model
/// that still publishes nothing is an error.
async fn run_generate(pipeline: &ArticlePipeline) -> anyhow::Result<Option<Article>> {
    if !pipeline.is_configured() {
        warn!("⚠️ API token not configured. Nothing generated.");
        warn!("   Set HUGGINGFACE_API_TOKEN to enable AI article generation.");
        return Ok(None);
    }
    match pipeline.generate_article().await {
        Some(article) => Ok(Some(article)),
        None => anyhow::bail!("no article was generated"),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn serve(
    storage: Arc<dyn Storage>,
    pipeline: Arc<ArticlePipeline>,
    port: u16,
    schedule: DailySchedule,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = tokio::spawn(bw_web::serve(
        AppState::new(storage),
        addr,
        shutdown_signal(),
    ));

    if let Err(e) = pipeline
        .seed_initial_articles(pipeline.config().seed_target)
        .await
    {
        error!("❌ Seed failed: {}", e);
    }

    let scheduler = Scheduler::new(pipeline, schedule).start();

    let result = server.await.context("server task panicked")?;
    scheduler.stop().await;
    result.context("server error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let storage = bw_storage::create_storage(&cli.storage, cli.database_url.as_deref())
        .await
        .with_context(|| format!("failed to open {} storage", cli.storage))?;
    let pipeline = build_pipeline(&cli, storage.clone()).await?;

    match cli.command {
        Commands::Serve { port, daily_at, .. } => {
            serve(storage, pipeline, port, daily_at).await?;
        }
        Commands::Generate => {
            if let Some(article) = run_generate(&pipeline).await? {
                println!("{}", serde_json::to_string_pretty(&article)?);
            }
        }
        Commands::Seed { target } => {
            let published = pipeline.seed_initial_articles(target).await?;
            info!("🌱 {} new articles", published);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_core::ArticleStore;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_serve_arguments() {
        let cli = parse(&[
            "bw",
            "--model",
            "dummy",
            "--single-prompt",
            "serve",
            "--port",
            "8080",
            "--seed-target",
            "5",
            "--daily-at",
            "09:30",
        ]);

        let jobs = cli.jobs_config();
        assert_eq!(jobs.mode, GenerationMode::Combined);
        assert_eq!(jobs.seed_target, 5);
        assert_eq!(jobs.daily_at, DailySchedule::parse("09:30").unwrap().at());
        assert_eq!(cli.inference_config().model, "dummy");
        match cli.command {
            Commands::Serve { port, .. } => assert_eq!(port, 8080),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_daily_time() {
        let result = Cli::try_parse_from(["bw", "serve", "--daily-at", "25:99"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_seed_target_override() {
        let cli = parse(&["bw", "seed", "--target", "7"]);
        assert_eq!(cli.jobs_config().seed_target, 7);
        assert_eq!(cli.jobs_config().mode, GenerationMode::TwoPhase);
    }

    #[tokio::test]
    async fn test_generate_with_dummy_model() {
        let cli = parse(&["bw", "--model", "dummy", "generate"]);
        let storage = bw_storage::create_storage("memory", None).await.unwrap();
        let pipeline = build_pipeline(&cli, storage.clone()).await.unwrap();

        let article = run_generate(&pipeline).await.unwrap().unwrap();
        assert!(!article.title.is_empty());
        assert_eq!(storage.count_articles(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generate_without_credential_is_not_an_error() {
        let storage = bw_storage::create_storage("memory", None).await.unwrap();
        let model = bw_inference::create_model(&bw_inference::Config {
            api_key: None,
            model: "huggingface".to_string(),
            model_name: None,
            base_url: None,
        })
        .unwrap();
        let pipeline = ArticlePipeline::new(
            ContentGenerator::new(Arc::new(TextGenerationClient::new(model))),
            storage.clone(),
            Arc::new(AuthorCache::new()),
            JobsConfig::default(),
        );

        assert!(!pipeline.is_configured());
        assert!(run_generate(&pipeline).await.unwrap().is_none());
        assert_eq!(storage.count_articles(None).await.unwrap(), 0);
    }
}
