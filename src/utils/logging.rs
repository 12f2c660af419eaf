//! Diagnostic logging setup.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PARLEY_LOG";
const DEFAULT_FILTER: &str = "parley=info";

/// Where diagnostic output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink<'a> {
    File(&'a Path),
    Stderr,
    /// Nothing is recorded. Used while the TUI owns the terminal.
    Discard,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_tracing(sink: LogSink<'_>) -> io::Result<()> {
    let filter = env_filter();
    match sink {
        LogSink::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
        LogSink::Stderr => {
            let layer = fmt::layer().with_target(false).with_writer(io::stderr);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
        LogSink::Discard => {}
    }
    Ok(())
}
