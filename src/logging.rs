//! Logger setup for the `awed` binary.
//!
//! `RUST_LOG` controls the filter as usual; without it only warnings and
//! errors are recorded. Output is appended to the log file in the data
//! directory so a playing session keeps the terminal clean.

use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::path::Path;

const DEFAULT_FILTER: &str = "warn";

/// Install the global logger, writing to `log_file` when it can be opened
/// and to stderr otherwise. Safe to call more than once; later calls are
/// ignored.
pub fn init(log_file: Option<&Path>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Cannot open log file {}: {e}, logging to stderr", path.display());
            }
        }
    }

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
