//! Process-wide `tracing` subscriber: console output plus a daily rolling
//! file under the data directory.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::AppPaths;

const LOG_FILE_PREFIX: &str = "server.log";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Returns `false` when another subscriber
/// was already installed; that one is kept and a notice goes to stderr.
pub fn init(paths: &AppPaths) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = fmt::layer().with_target(false);

    let file = match std::fs::create_dir_all(&paths.log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_target(false).with_ansi(false).with_writer(writer))
        }
        Err(err) => {
            eprintln!(
                "shopbot: file logging disabled, cannot create {}: {}",
                paths.log_dir.display(),
                err
            );
            None
        }
    };

    match tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
    {
        Ok(()) => true,
        Err(err) => {
            eprintln!("shopbot: keeping the existing tracing subscriber: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_the_installed_subscriber() {
        let root = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(root.path().to_path_buf(), root.path().join("data"));

        init(&paths);
        assert!(paths.log_dir.is_dir());
        assert!(!init(&paths));
    }
}
