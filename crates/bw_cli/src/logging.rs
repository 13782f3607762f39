use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const WORKSPACE_CRATES: [&str; 6] = ["bw", "bw_core", "bw_storage", "bw_inference", "bw_jobs", "bw_web"];

fn default_directives(verbose: bool) -> String {
    if !verbose {
        return "info".to_string();
    }
    let mut directives: Vec<String> = WORKSPACE_CRATES
        .iter()
        .map(|name| format!("{}=debug", name))
        .collect();
    directives.push("info".to_string());
    directives.join(",")
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact(),
            )
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(false), "info");
        let verbose = default_directives(true);
        assert!(verbose.starts_with("bw=debug,bw_core=debug"));
        assert!(verbose.ends_with(",info"));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
        tracing::info!("still alive");
    }
}
