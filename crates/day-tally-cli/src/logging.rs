use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/day-tally.log";

/// Splits `LOG_FILE_PATH` into the directory and file name the appender wants.
fn log_file_location(raw: &str) -> (PathBuf, PathBuf) {
    let path = Path::new(raw);
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("day-tally.log"));
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (dir, file_name)
}

/// Stdout gets the pretty, colored layout unless `plain` is set (for cron
/// jobs and redirected output); the file always gets plain lines.
pub fn init_logger(plain: bool) -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let raw_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (log_dir, log_file) = log_file_location(&raw_path);
    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let pretty_stdout = (!plain).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .pretty()
            .with_file(false)
            .without_time()
            .with_ansi(true)
    });
    let plain_stdout = plain.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(pretty_stdout)
        .with(plain_stdout)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter_layer)
        .init();

    if plain {
        colored::control::set_override(false);
    }
    debug!("Logging to {}", raw_path);

    guard
}
