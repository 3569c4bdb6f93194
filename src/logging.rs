//! Process-wide tracing setup.

use crate::config::AppSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "registrar=info,tower_http=info";

/// Install the global subscriber: stdout always, plus a daily-rolling file under `LOG_DIR` when
/// set. Keep the returned guard alive for the life of the process or buffered file lines are lost.
pub fn init(app: &AppSettings) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout = fmt::layer().with_file(true).with_line_number(true);

    match &app.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "registrar.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(writer);
            tracing_subscriber::registry().with(filter).with(stdout).with(file).init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stdout).init();
            None
        }
    }
}
