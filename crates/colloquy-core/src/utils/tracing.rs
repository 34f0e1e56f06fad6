use chrono::Local;
use std::io;
use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Install the global subscriber. Filter comes from RUST_LOG (default `info`).
///
/// With a `log_dir`, output goes to a timestamp-named file there; otherwise
/// to stderr.
pub fn init_tracing(log_dir: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if let Some(log_dir) = log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_name = format!("{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        let file_appender = rolling::never(log_dir, &file_name);

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::Layer::new()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter);

        tracing::subscriber::set_global_default(subscriber).map(|()| {
            tracing::debug!(
                target: "colloquy::utils::tracing",
                path = %log_dir.join(&file_name).display(),
                "Tracing initialized with file output"
            );
        })
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::Layer::default()
                    .with_writer(io::stderr)
                    .with_target(true),
            )
            .with(filter);

        tracing::subscriber::set_global_default(subscriber).map(|()| {
            tracing::debug!(
                target: "colloquy::utils::tracing",
                "Tracing initialized with stderr output"
            );
        })
    };

    result.map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}
