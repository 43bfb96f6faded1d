//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Provide structured log macros
//! - Configure log level at runtime
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. `json` selects the
/// machine-parseable formatter; otherwise falls back to the pretty
/// formatter used during development. `RUST_LOG` overrides the default
/// `info` filter when set.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.pretty().init();
    }
}
