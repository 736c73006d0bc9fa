use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use crate::utils::error::Result;

/// Maps a level name to a `tracing` level. Unknown names fall back to `INFO`.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing/logging for the application.
///
/// Lines go to stderr unless `file` is given, in which case they are appended
/// to that file without ANSI colours.
pub fn init(level: &str, file: Option<&Path>) -> Result<()> {
    let lvl = parse_level(level);

    // try_init so tests and libraries can call this multiple times without panicking
    match file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_max_level(lvl)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_max_level(lvl)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }

    Ok(())
}
