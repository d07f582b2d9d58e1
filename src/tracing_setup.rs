use std::fs;

use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::paths;

/// Initializes the tracing subscriber with layered output:
/// 1. Stdout: compact text by default, JSON with `--log-json`.
/// 2. File: full JSON debug logs to `<data_dir>/logs/promptdeck.log`.
///
/// Returns a WorkerGuard that must be held by main() so file logs flush.
pub fn init(
    verbose: bool,
    log_json: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let registry = tracing_subscriber::registry();
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter(verbose));

    let log_dir = paths::data_dir().join("logs");
    let (file_layer, guard) = match fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::never(&log_dir, "promptdeck.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(Targets::new().with_default(tracing::Level::DEBUG));
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Warning: Failed to create log dir {log_dir:?}: {e}");
            (None, None)
        }
    };

    let stdout_layer: Box<dyn Layer<Registry> + Send + Sync> = if log_json {
        Box::new(
            fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_filter(stdout_filter),
        )
    } else if verbose {
        Box::new(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(stdout_filter),
        )
    } else {
        Box::new(
            fmt::layer()
                .with_writer(std::io::stdout)
                .without_time()
                .with_target(false)
                .with_level(true)
                .with_filter(stdout_filter),
        )
    };

    registry.with(stdout_layer).with(file_layer).init();

    guard
}

fn default_env_filter(verbose: bool) -> EnvFilter {
    let spec = if verbose {
        "promptdeck=debug,info"
    } else {
        "promptdeck=info,warn"
    };
    EnvFilter::new(spec)
}
