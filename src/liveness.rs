//! The liveness probe run on a connection before it is handed out.
//!
//! Warmed connections are supposed to sit silent until they start carrying
//! real traffic, so any available byte — or a closed socket — is evidence
//! the peer already considers the connection over.

use std::time::Duration;

use tokio::io::AsyncReadExt;

use crate::stream::PoolStream;

const PROBE_DEADLINE: Duration = Duration::from_millis(1);

/// Probe a candidate connection for liveness.
///
/// `true` iff a 1-byte read times out (the peer is present but silent).
/// Every other outcome — a successful read, EOF, a reset, or any I/O error
/// — counts as dead.
pub async fn is_live(stream: &mut dyn PoolStream) -> bool {
    let mut byte = [0u8; 1];
    matches!(
        tokio::time::timeout(PROBE_DEADLINE, stream.read(&mut byte)).await,
        Err(_elapsed)
    )
}
