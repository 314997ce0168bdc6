//! CLI log initialization
//!
//! Per-phase filtering built on `tracing-subscriber` target filters.

use std::io;

use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use tsxpile_config::Phase;

use crate::config::LogConfig;

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Colorful multi-line output for development.
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON lines for tool integration.
    Json,
}

/// Initialize the global subscriber with per-phase targets.
pub fn init(log_config: &LogConfig, format: LogFormat) {
    let mut targets = Targets::new().with_default(log_config.global);
    for phase in [Phase::Prepare, Phase::Compile, Phase::Link] {
        let target = phase.target();
        let level = log_config.level_for(&target);
        targets = targets.with_target(target, level);
    }

    let stderr_layer = create_format_layer(format, io::stderr).with_filter(targets);
    tracing_subscriber::registry().with(stderr_layer).init();
}

/// Create the formatter layer for the chosen format.
fn create_format_layer<W, F>(
    format: LogFormat,
    make_writer: F,
) -> impl Layer<tracing_subscriber::Registry>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
    }
}
