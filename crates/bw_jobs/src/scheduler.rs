use bw_core::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveTime, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::pipeline::ArticlePipeline;

/// Fires once per day at a fixed wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::new(NaiveTime::MIN)
    }
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Parse `HH:MM` (24h).
    pub fn parse(value: &str) -> Result<Self> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|e| Error::Config(format!("Invalid daily time '{}': {}", value, e)))
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First firing strictly after `now`.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let mut date = now.date_naive();
        // A day is skipped only when the wall-clock time does not exist there (DST gap)
        for _ in 0..4 {
            let candidate = match tz.from_local_datetime(&date.and_time(self.at)) {
                LocalResult::Single(t) => Some(t),
                LocalResult::Ambiguous(earliest, _) => Some(earliest),
                LocalResult::None => None,
            };
            if let Some(candidate) = candidate {
                if candidate > *now {
                    return candidate;
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        now.clone() + ChronoDuration::days(1)
    }

    /// Next firing after both `now` and the previous firing. A timer that
    /// wakes a little early must not land on the slot it just ran.
    pub fn next_run_since<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        last_fired: Option<&DateTime<Tz>>,
    ) -> DateTime<Tz> {
        match last_fired {
            Some(last) if last > now => self.next_run_after(last),
            _ => self.next_run_after(now),
        }
    }

    /// Time left until the next firing, measured in local time.
    pub fn until_next(&self) -> Duration {
        let now = Local::now();
        wait_until(&now, &self.next_run_after(&now))
    }
}

fn wait_until<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Duration {
    (target.clone() - now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Runs the pipeline once per day until stopped.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pipeline: Arc<ArticlePipeline>,
    schedule: DailySchedule,
}

impl Scheduler {
    pub fn new(pipeline: Arc<ArticlePipeline>, schedule: DailySchedule) -> Self {
        Self { pipeline, schedule }
    }

    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    /// Run one generation cycle immediately, outside the daily cadence.
    pub async fn trigger_now(&self) -> bool {
        self.pipeline.generate_article().await.is_some()
    }

    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let schedule = self.schedule;
        let pipeline = self.pipeline;

        info!(
            "📅 Article generation scheduler started (daily at {})",
            schedule.at().format("%H:%M")
        );

        let task = tokio::spawn(async move {
            let mut last_fired: Option<DateTime<Local>> = None;
            loop {
                let now = Local::now();
                let target = schedule.next_run_since(&now, last_fired.as_ref());
                let wait = wait_until(&now, &target);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        last_fired = Some(target);
                        info!("⏰ Running scheduled article generation...");
                        if pipeline.generate_article().await.is_none() {
                            warn!("Scheduled generation produced no article");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("📅 Scheduler stopped");
        });

        SchedulerHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Stops a running scheduler. Dropping the handle also stops it.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the loop and wait for it to exit. A cycle already in flight
    /// finishes first.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::AuthorCache;
    use crate::test_support::ObservedStorage;
    use crate::JobsConfig;
    use bw_core::ArticleStore;
    use bw_inference::testing::{RecordingSleeper, ScriptedModel};
    use bw_inference::{ContentGenerator, TextGenerationClient};
    use chrono::{FixedOffset, Utc};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn pipeline(model: ScriptedModel, storage: Arc<ObservedStorage>) -> Arc<ArticlePipeline> {
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = TextGenerationClient::new(Arc::new(model)).with_sleeper(sleeper.clone());
        Arc::new(
            ArticlePipeline::new(
                ContentGenerator::new(Arc::new(client)),
                storage,
                Arc::new(AuthorCache::new()),
                JobsConfig::default(),
            )
            .with_sleeper(sleeper),
        )
    }

    #[test]
    fn test_parse() {
        assert_eq!(DailySchedule::parse("00:00").unwrap().at(), time(0, 0));
        assert_eq!(DailySchedule::parse(" 09:30 ").unwrap().at(), time(9, 30));
        assert!(DailySchedule::parse("24:00").is_err());
        assert!(DailySchedule::parse("noon").is_err());
        assert_eq!(DailySchedule::default().at(), NaiveTime::MIN);
    }

    #[test]
    fn test_next_run_later_today() {
        let schedule = DailySchedule::new(time(18, 0));
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 15, 0).unwrap();
        assert_eq!(
            schedule.next_run_after(&now),
            Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let schedule = DailySchedule::default();
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            schedule.next_run_after(&now),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_is_strictly_after_now() {
        let schedule = DailySchedule::default();
        let midnight = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();
        assert_eq!(
            schedule.next_run_after(&midnight),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_respects_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let schedule = DailySchedule::default();
        let now = tz.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let next = schedule.next_run_after(&now);
        assert_eq!(next, tz.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
        assert_eq!(next.with_timezone(&Utc).to_rfc3339(), "2024-06-01T22:00:00+00:00");
    }

    #[test]
    fn test_early_wakeup_does_not_refire_same_slot() {
        let schedule = DailySchedule::new(time(9, 0));
        let fired = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let early = fired - ChronoDuration::milliseconds(5);

        // without history the slot a few ms away is still ahead
        assert_eq!(schedule.next_run_since(&early, None), fired);
        assert_eq!(
            schedule.next_run_since(&early, Some(&fired)),
            Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_last_fired_in_the_past_is_ignored() {
        let schedule = DailySchedule::new(time(9, 0));
        let fired = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 7, 0, 0).unwrap();
        assert_eq!(
            schedule.next_run_since(&now, Some(&fired)),
            Utc.with_ymd_and_hms(2024, 5, 3, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_wait_until_clamps_past_targets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(wait_until(&now, &(now - ChronoDuration::seconds(3))), Duration::ZERO);
        assert_eq!(
            wait_until(&now, &(now + ChronoDuration::seconds(3))),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_until_next_is_within_a_day() {
        let wait = DailySchedule::default().until_next();
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(24 * 3600 + 3600));
    }

    #[tokio::test]
    async fn test_stop_before_first_run() {
        let storage = Arc::new(ObservedStorage::default());
        let model = ScriptedModel::replies(["unused"]);
        let handle = Scheduler::new(pipeline(model, storage.clone()), DailySchedule::default()).start();

        assert!(handle.is_running());
        handle.stop().await;

        assert_eq!(storage.count_articles(None).await.unwrap(), 0);
        assert_eq!(storage.author_creations(), 0);
    }

    #[tokio::test]
    async fn test_trigger_now_runs_one_cycle() {
        let storage = Arc::new(ObservedStorage::default());
        let model = ScriptedModel::replies([
            "Service Meshes",
            r#"{"title":"T","excerpt":"E","content":"C","tags":["mesh"]}"#,
        ]);
        let scheduler = Scheduler::new(pipeline(model, storage.clone()), DailySchedule::default());

        assert!(scheduler.trigger_now().await);
        assert_eq!(storage.count_articles(None).await.unwrap(), 1);
    }
}
