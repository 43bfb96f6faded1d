//! Clamp/swap validation for pool configuration:
//!
//! - `{min_cap, max_cap}` clamped to ≥1, swapped if inverted.
//! - `{min_ivl, max_ivl}` defaulted to 1s if non-positive, swapped if inverted.
//! - `tls_code` outside `{"0","1","2"}` is left as-is here (normalization to
//!   `"0"` happens at wrap time in `tls::TlsMode::parse`, not here, so the
//!   raw configured value is still visible to callers inspecting config).

use std::time::Duration;

use crate::config::schema::{ClientPoolConfig, ServerPoolConfig};

/// A client pool's configuration, clamped into valid ranges.
#[derive(Debug, Clone)]
pub struct ValidatedClientConfig {
    pub min_cap: usize,
    pub max_cap: usize,
    pub min_ivl: Duration,
    pub max_ivl: Duration,
    pub keep_alive: Duration,
    pub tls_code: String,
    pub hostname: String,
}

pub fn validate_client_config(config: &ClientPoolConfig) -> ValidatedClientConfig {
    let (mut min_cap, mut max_cap) = (config.min_cap.max(1), config.max_cap.max(1));
    if min_cap > max_cap {
        std::mem::swap(&mut min_cap, &mut max_cap);
    }

    let default_ivl_ms = 1_000u64;
    let mut min_ivl_ms = if config.min_ivl_ms == 0 {
        default_ivl_ms
    } else {
        config.min_ivl_ms
    };
    let mut max_ivl_ms = if config.max_ivl_ms == 0 {
        default_ivl_ms
    } else {
        config.max_ivl_ms
    };
    if min_ivl_ms > max_ivl_ms {
        std::mem::swap(&mut min_ivl_ms, &mut max_ivl_ms);
    }

    ValidatedClientConfig {
        min_cap,
        max_cap,
        min_ivl: Duration::from_millis(min_ivl_ms),
        max_ivl: Duration::from_millis(max_ivl_ms),
        keep_alive: Duration::from_secs(config.keep_alive_secs),
        tls_code: config.tls_code.clone(),
        hostname: config.hostname.clone(),
    }
}

/// A server pool's configuration, clamped into valid ranges.
#[derive(Debug, Clone)]
pub struct ValidatedServerConfig {
    pub bind_address: String,
    /// The allow-listed peer IP, kept as raw text. Comparison against an
    /// accepted peer is a plain string compare against
    /// `peer_addr.ip().to_string()`, not a parsed/normalized one — a typo
    /// here should reject every peer rather than silently turn into "no
    /// restriction".
    pub client_ip: Option<String>,
    pub keep_alive: Duration,
}

pub fn validate_server_config(config: &ServerPoolConfig) -> ValidatedServerConfig {
    let client_ip = if config.client_ip.trim().is_empty() {
        None
    } else {
        Some(config.client_ip.trim().to_string())
    };

    ValidatedServerConfig {
        bind_address: config.bind_address.clone(),
        client_ip,
        keep_alive: Duration::from_secs(config.keep_alive_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_inverted_capacity_bounds() {
        let config = ClientPoolConfig {
            min_cap: 8,
            max_cap: 2,
            ..Default::default()
        };
        let validated = validate_client_config(&config);
        assert_eq!(validated.min_cap, 2);
        assert_eq!(validated.max_cap, 8);
    }

    #[test]
    fn clamps_zero_capacity_to_one() {
        let config = ClientPoolConfig {
            min_cap: 0,
            max_cap: 0,
            ..Default::default()
        };
        let validated = validate_client_config(&config);
        assert_eq!(validated.min_cap, 1);
        assert_eq!(validated.max_cap, 1);
    }

    #[test]
    fn defaults_nonpositive_interval_to_one_second() {
        let config = ClientPoolConfig {
            min_ivl_ms: 0,
            max_ivl_ms: 0,
            ..Default::default()
        };
        let validated = validate_client_config(&config);
        assert_eq!(validated.min_ivl, Duration::from_secs(1));
        assert_eq!(validated.max_ivl, Duration::from_secs(1));
    }

    #[test]
    fn swaps_inverted_interval_bounds() {
        let config = ClientPoolConfig {
            min_ivl_ms: 900,
            max_ivl_ms: 100,
            ..Default::default()
        };
        let validated = validate_client_config(&config);
        assert_eq!(validated.min_ivl, Duration::from_millis(100));
        assert_eq!(validated.max_ivl, Duration::from_millis(900));
    }

    #[test]
    fn empty_client_ip_means_no_restriction() {
        let config = ServerPoolConfig::default();
        assert!(validate_server_config(&config).client_ip.is_none());
    }
}
