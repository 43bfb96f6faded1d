//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (clamp to valid ranges, reject nonsensical input)
//!     → ClientPoolConfig / ServerPoolConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot-reload path, unlike
//!   the pool's own runtime-adaptive capacity/interval targets
//! - All fields have defaults so a minimal TOML document is valid
//! - Validation separates syntactic (serde) from semantic (clamping) checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{ClientPoolConfig, ServerPoolConfig};
