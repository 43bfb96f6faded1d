//! Configuration schema for client and server pools.
//!
//! Every field has a default so a minimal (or empty) TOML document is
//! valid; the clamping/swapping rules are applied by
//! `validation::validate_client_config` / `validate_server_config`, not by
//! serde defaults alone.

use serde::{Deserialize, Serialize};

/// The server pool's ready-queue capacity ceiling is fixed, not configurable:
/// the accept loop is paced by peer dial attempts, not a self-imposed sleep,
/// so there's no interval controller to need a lower starting point.
pub const SERVER_MAX_CAP: usize = 65_536;

/// Configuration for a client pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientPoolConfig {
    /// Floor of the ready-queue capacity target.
    pub min_cap: usize,
    /// Ceiling of the ready-queue capacity target.
    pub max_cap: usize,
    /// Floor of the inter-sweep delay, in milliseconds.
    pub min_ivl_ms: u64,
    /// Ceiling of the inter-sweep delay, in milliseconds.
    pub max_ivl_ms: u64,
    /// TCP keep-alive period, in seconds.
    pub keep_alive_secs: u64,
    /// One of `"0"` (none), `"1"` (encrypt, no verify), `"2"` (encrypt,
    /// verify). Anything else is treated as `"0"` at wrap time.
    pub tls_code: String,
    /// Server hostname, used for `ServerName` verification in mode `"2"`.
    pub hostname: String,
}

impl Default for ClientPoolConfig {
    fn default() -> Self {
        Self {
            min_cap: 1,
            max_cap: 8,
            min_ivl_ms: 100,
            max_ivl_ms: 1_000,
            keep_alive_secs: 30,
            tls_code: "0".to_string(),
            hostname: String::new(),
        }
    }
}

/// TLS certificate material for a server pool, loaded from PEM files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsCertPaths {
    pub cert_path: String,
    pub key_path: String,
}

/// Configuration for a server pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerPoolConfig {
    /// Bind address for the accept loop's default TCP listener.
    pub bind_address: String,
    /// Textual IP to allow; empty means "no restriction". Compared as raw
    /// text against the peer's address, never parsed.
    pub client_ip: String,
    /// TCP keep-alive period, in seconds.
    pub keep_alive_secs: u64,
    /// Optional server-side TLS certificate/key pair.
    pub tls: Option<TlsCertPaths>,
}

impl Default for ServerPoolConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7000".to_string(),
            client_ip: String::new(),
            keep_alive_secs: 30,
            tls: None,
        }
    }
}
