//! Logging and tracing initialization.
//!
//! The watch loop is usually a long-lived unattended process, so events
//! can go to a log file instead of stdout. `RUST_LOG` overrides the
//! configured level filter either way.

use std::sync::Mutex;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// Events go to stdout, or to `config.file` when one is set (ANSI codes
/// are disabled there). A log file that cannot be opened falls back to
/// stdout rather than failing startup.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, ansi) = match open_log_file(config) {
        Some(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(ansi);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish()).ok();
    } else {
        let subscriber = builder
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

fn open_log_file(config: &LoggingConfig) -> Option<std::fs::File> {
    let path = config.file.as_ref()?;
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {}: {e}", path.display());
            None
        }
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
