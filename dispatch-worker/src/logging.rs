//! Structured logging setup shared by the binaries.
//!
//! Everything goes to stdout as flattened JSON, filtered by `RUST_LOG`
//! (default `info`). When a log file is given, the messaging client's
//! request/response trace is also appended to it.

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Target prefix of the messaging client's events.
pub const WHATSAPP_TARGET: &str = "dispatch::whatsapp";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the life of the process.
pub fn init(whatsapp_log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout = fmt::layer().json().flatten_event(true).with_filter(filter);

    let (file, guard) = match whatsapp_log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "wati_api.log".into());

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(Targets::new().with_target(WHATSAPP_TARGET, Level::INFO));

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry().with(stdout).with(file).try_init();
    if result.is_err() {
        tracing::debug!("tracing_subscriber_already_initialized");
    }

    guard
}
