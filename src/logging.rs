//! Tracing subscriber setup with console and file output.
//!
//! The file layer writes plain text to the first writable path among the
//! configured file and a few fallbacks. When none is writable the monitor
//! logs to the console only.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

const FALLBACK_FILE_NAME: &str = "arbitrage_log.txt";

/// Candidate log paths in preference order.
pub fn log_path_candidates(configured: &str) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(configured)];

    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        candidates.push(home.join(FALLBACK_FILE_NAME));
        candidates.push(home.join("Desktop").join(FALLBACK_FILE_NAME));
    }
    candidates.push(std::env::temp_dir().join(FALLBACK_FILE_NAME));
    candidates.push(PathBuf::from("arbitrage_log_fallback.txt"));

    candidates
}

/// Open the first candidate that can be appended to.
pub fn select_log_path(candidates: &[PathBuf]) -> Option<(PathBuf, File)> {
    candidates
        .iter()
        .find_map(|path| open_append(path).map(|file| (path.clone(), file)))
}

fn open_append(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return None;
        }
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Install the global subscriber. Returns the log file in use, if any.
pub fn init_tracing(config: &Config, verbose: bool) -> Option<PathBuf> {
    let filter = if verbose || config.verbose {
        EnvFilter::new("arb_monitor=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let selected = select_log_path(&log_path_candidates(&config.log_file));
    let (path, file_layer) = match selected {
        Some((path, file)) => (
            Some(path),
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            ),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(file_layer)
        .with(filter)
        .init();

    match &path {
        Some(path) => tracing::info!(path = %path.display(), "Logging to file"),
        None => tracing::warn!("No writable log file location, logging to console only"),
    }

    path
}
