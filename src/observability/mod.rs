//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pool lifecycle events (sweep start, handshake outcome, hand-out)
//!     → logging.rs (tracing spans/events, see client/server module docs)
//!     → metrics.rs (pool state as Prometheus gauges/counters)
//! ```
//!
//! # Design Decisions
//! - Structured logging via `tracing`; `RUST_LOG` controls verbosity
//! - Metrics are cheap (atomic gauges/counters), sampled by the CLI demo

pub mod logging;
pub mod metrics;
