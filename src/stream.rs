//! The stream abstraction the pool stores connections as, and the
//! TCP-specific keep-alive arming applied once a connection is published.

use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Anything the pool can store and hand out: a plain or TLS-wrapped stream.
///
/// `as_tcp_stream` is the capability check the design notes call for: most
/// carriers are backed by a real TCP socket and can have keep-alive armed on
/// them, but the pool is written against a trait so an embedder's
/// non-TCP transport can simply return `None` and skip it rather than fail
/// publication.
pub trait PoolStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    fn as_tcp_stream(&self) -> Option<&TcpStream> {
        None
    }
}

impl PoolStream for TcpStream {
    fn as_tcp_stream(&self) -> Option<&TcpStream> {
        Some(self)
    }
}

impl PoolStream for tokio_rustls::client::TlsStream<TcpStream> {
    fn as_tcp_stream(&self) -> Option<&TcpStream> {
        Some(self.get_ref().0)
    }
}

impl PoolStream for tokio_rustls::server::TlsStream<TcpStream> {
    fn as_tcp_stream(&self) -> Option<&TcpStream> {
        Some(self.get_ref().0)
    }
}

/// A boxed, type-erased connection. The registry and ready queue only ever
/// move this around by ID; nothing downstream of `register` needs to know
/// whether a given connection is plaintext or TLS-wrapped.
pub type BoxedStream = Box<dyn PoolStream>;

/// Arm TCP keep-alive on `stream` with the given period, if `stream` is
/// backed by a real TCP socket. A non-TCP carrier is left untouched: per the
/// design notes, keep-alive is opt-in, not a publication-blocking step.
pub fn arm_keepalive(stream: &dyn PoolStream, period: Duration) {
    let Some(tcp) = stream.as_tcp_stream() else {
        return;
    };
    let ka = TcpKeepalive::new().with_time(period);
    if let Err(err) = SockRef::from(tcp).set_tcp_keepalive(&ka) {
        tracing::debug!(error = %err, "failed to arm tcp keepalive, continuing without it");
    }
}
