use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const LOG_FILE_PREFIX: &str = "server.log";
const DEFAULT_FILTER: &str = "info,tower_http=debug";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: stdout plus a daily file under `log_dir`.
/// `RUST_LOG` overrides the default filter. Safe to call more than once;
/// only the first call takes effect.
pub fn init(paths: &AppPaths) {
    let log_dir = &paths.log_dir;
    let file_logging = std::fs::create_dir_all(log_dir).is_ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    let file_layer = file_logging.then(|| {
        let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }
    if file_logging {
        tracing::info!("Writing logs to {}", log_dir.display());
    } else {
        tracing::warn!(
            "Could not create {}; logging to stdout only",
            log_dir.display()
        );
    }
}
