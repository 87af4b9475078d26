//! Structured logging using **tracing**.
//!
//! The library only emits events; the binary installs the subscriber.
//! What a run logs, by phase:
//!
//! | phase       | level | fields                                           |
//! |-------------|-------|--------------------------------------------------|
//! | input       | info  | `path`, `methods`, `edges`, `overrides`          |
//! | annotations | warn  | `type_name`, `method`, `file`: unmatched targets |
//! | propagation | info  | `node`, `existing`: Unanalyzed overwritten       |
//! | propagation | warn  | `node`, `base`: conflicting Warn kept            |
//! | graph       | info  | `methods`, `edges`, `entries`, `interesting`     |
//! | search      | debug | `done`, `total` every 1000 searches              |
//! | pipeline    | info  | `chains`, `duplicates`, `suppressed`             |
//!
//! Searches run on Rayon's pool, so each event also carries its thread id.

use tracing::{error, info, warn, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Call *once* at startup. Events are JSON lines on stderr; stdout is the
/// chain report's when no `--output` file is given.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering. `RUST_LOG=trimreach_core=debug`
///   adds search progress and per-node propagation detail.
pub fn init_structured_logging() {
    let subscriber = json_subscriber(EnvFilter::from_default_env(), std::io::stderr);
    if subscriber.try_init().is_err() {
        eprintln!("[WARN] tracing subscriber already installed");
    }
}

fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_current_span(true)
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

/// Warning with a preformatted message, for callers outside the library
/// (the CLI's optional config fallback).
pub fn log_warn(message: &str) {
    warn!(detail = %message);
}

/// Info event carrying only a `detail` message.
pub fn log_info(message: &str) {
    info!(detail = %message);
}

/// Error event for a run that ends in failure.
pub fn log_error(message: &str) {
    error!(detail = %message);
}
