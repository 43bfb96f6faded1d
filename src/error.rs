//! Error types that actually cross an API boundary.
//!
//! The pool's core design goal is to keep refilling through per-connection
//! failure (see `DESIGN.md` / the taxonomy in the module docs of
//! `client` and `server`): dial errors, handshake failures, liveness
//! failures and the like are swallowed at the point of occurrence and never
//! become a `PoolError`. What's left here is deliberately narrow.

use thiserror::Error;

/// Errors surfaced at pool-construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The sentinel `ServerGet` returns once its pool has been cancelled.
///
/// Kept as its own type rather than folded into the connection ID's slot, so
/// a cancellation notice can never be mistaken for a real rendezvous token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("pool cancelled: {reason}")]
pub struct PoolCancelled {
    /// Human-readable description of why the pool's cancellation token fired.
    pub reason: String,
}

impl PoolCancelled {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
