use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `LIMBER_LOG=debug`.
pub const LOG_ENV: &str = "LIMBER_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Send logs to `path`, appending. The terminal belongs to the UI, so there
/// is no stdout fallback: returns false and logs nothing if the file cannot
/// be opened or a subscriber is already installed.
pub fn init_file(path: &Path) -> bool {
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return false;
    };

    tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .is_ok()
}

/// Log to stderr, for the non-interactive commands.
pub fn init_stderr() -> bool {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unopenable_path_disables_logging() {
        let dir = tempdir().unwrap();
        // a directory cannot be opened as a log file
        assert!(!init_file(dir.path()));
    }
}
