use async_trait::async_trait;
use std::time::Duration;

/// Suspends the current task. Injected wherever the generation flow waits
/// between attempts so tests can observe the pauses instead of sitting
/// through them.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
