use bw_inference::GenerationMode;
use chrono::NaiveTime;
use std::time::Duration;

pub mod pipeline;
pub mod publisher;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use pipeline::ArticlePipeline;
pub use publisher::{ArticlePublisher, AuthorCache};
pub use scheduler::{DailySchedule, Scheduler, SchedulerHandle};

#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub mode: GenerationMode,
    /// Articles the seed routine tops the store up to
    pub seed_target: u64,
    /// Pause between consecutive seed generations
    pub seed_delay: Duration,
    /// Local time of the daily generation
    pub daily_at: NaiveTime,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            seed_target: 3,
            seed_delay: Duration::from_secs(2),
            daily_at: NaiveTime::MIN,
        }
    }
}

pub mod prelude {
    pub use super::{
        ArticlePipeline, ArticlePublisher, AuthorCache, DailySchedule, JobsConfig, Scheduler,
        SchedulerHandle,
    };
    pub use bw_core::{Article, Error, Result};
}
