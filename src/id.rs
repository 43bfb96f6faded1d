//! The 8-byte rendezvous token exchanged between client and server pools.

use std::fmt;

/// An opaque 8-byte identifier that binds a warmed connection on the client
/// side to the same connection on the server side.
///
/// The server mints IDs as the hex encoding of 4 random bytes, so every byte
/// is printable ASCII, but callers must not assume any structure beyond
/// "unique within this pool" — it is a rendezvous token, not an
/// authenticator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub [u8; 8]);

impl ConnId {
    /// Mint a fresh ID: 4 cryptographically random bytes, hex-encoded to 8
    /// ASCII characters.
    pub fn mint() -> Self {
        let mut raw = [0u8; 4];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut raw);
        Self::from_raw(raw)
    }

    fn from_raw(raw: [u8; 4]) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut out = [0u8; 8];
        for (i, b) in raw.iter().enumerate() {
            out[i * 2] = HEX[(b >> 4) as usize];
            out[i * 2 + 1] = HEX[(b & 0x0f) as usize];
        }
        ConnId(out)
    }

    /// The 8 bytes as written on the wire.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Reconstruct an ID from the 8 bytes read off the wire.
    pub fn from_wire(bytes: [u8; 8]) -> Self {
        ConnId(bytes)
    }
}

impl fmt::Debug for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnId({})", self)
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The bytes are already ASCII hex; render them directly rather than
        // re-hex-encoding, so a wire-corrupted ID still prints legibly.
        match std::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => write!(f, "{:02x?}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mint_is_ascii_hex() {
        let id = ConnId::mint();
        let s = std::str::from_utf8(id.as_bytes()).unwrap();
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn mint_is_overwhelmingly_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(ConnId::mint()));
        }
    }

    #[test]
    fn wire_round_trip() {
        let id = ConnId::mint();
        let rebuilt = ConnId::from_wire(*id.as_bytes());
        assert_eq!(id, rebuilt);
    }
}
