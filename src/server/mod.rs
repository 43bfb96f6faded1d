//! The server-side half of the pool: accepts inbound connections, filters by
//! peer IP, wraps them per the configured TLS policy, mints and announces
//! the rendezvous ID, and serves FIFO hand-out.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::schema::SERVER_MAX_CAP;
use crate::config::validation::ValidatedServerConfig;
use crate::error::PoolCancelled;
use crate::id::ConnId;
use crate::store::Store;
use crate::stream::{arm_keepalive, BoxedStream};
use crate::tls::ServerTlsConfig;

/// The embedder-supplied accept source. Bind address, socket options before
/// accept, and backlog tuning are entirely the listener's concern — the
/// accept loop only knows how to call `accept()`.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

/// A [`Listener`] backed by a bound [`tokio::net::TcpListener`] — the common
/// case for an embedder that isn't doing its own accept-side multiplexing.
pub struct TcpListenerSource(TcpListener);

impl TcpListenerSource {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        Ok(Self(TcpListener::bind(addr).await?))
    }
}

#[async_trait]
impl Listener for TcpListenerSource {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.0.accept().await
    }
}

/// A warmed-connection pool maintained by accepting inbound dials from a
/// peer client pool.
pub struct ServerPool {
    store: Arc<Store>,
    listener: Arc<dyn Listener>,
    tls: Option<Arc<ServerTlsConfig>>,
    /// Allow-listed peer IP as raw text; compared byte-for-byte against the
    /// peer's address, never parsed back into a structured `IpAddr` (a
    /// normalized-but-differently-written peer address should not match, and
    /// a mistyped allow-list entry should reject everyone rather than quietly
    /// mean "no restriction").
    client_ip: Option<String>,
    keep_alive: Duration,
    loop_scope: AsyncMutex<Option<(CancellationToken, JoinHandle<()>)>>,
    ready: AtomicBool,
}

impl ServerPool {
    pub fn new(
        config: ValidatedServerConfig,
        listener: Arc<dyn Listener>,
        tls: Option<Arc<ServerTlsConfig>>,
    ) -> Arc<Self> {
        // The server's ready-queue ceiling is fixed; there is no interval
        // controller on this side, since the accept loop is paced by peer
        // dial attempts rather than a self-imposed sleep.
        let store = Arc::new(Store::new(
            SERVER_MAX_CAP,
            SERVER_MAX_CAP,
            SERVER_MAX_CAP,
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(1),
        ));
        Arc::new(Self {
            store,
            listener,
            tls,
            client_ip: config.client_ip,
            keep_alive: config.keep_alive,
            loop_scope: AsyncMutex::new(None),
            ready: AtomicBool::new(false),
        })
    }

    /// Start (or restart) the accept loop. A second call cancels the
    /// previous loop's scope and begins a fresh one, so re-configuring a
    /// running pool never leaves two accept loops racing each other.
    pub async fn server_manager(self: &Arc<Self>) {
        let mut guard = self.loop_scope.lock().await;
        if let Some((old_scope, old_handle)) = guard.take() {
            old_scope.cancel();
            let _ = old_handle.await;
        }

        let scope = self.store.cancel_token().child_token();
        let pool = self.clone();
        let loop_scope = scope.clone();
        let handle = tokio::spawn(async move { pool.run_accept_loop(loop_scope).await });
        *guard = Some((scope, handle));
        self.ready.store(true, Ordering::Release);
    }

    async fn run_accept_loop(self: Arc<Self>, scope: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = scope.cancelled() => return,
                res = self.listener.accept() => res,
            };

            let (tcp, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::debug!(error = %err, "accept failed, continuing");
                    continue;
                }
            };

            if let Some(allowed) = &self.client_ip {
                if &peer_addr.ip().to_string() != allowed {
                    tracing::debug!(peer = %peer_addr.ip(), allowed = %allowed, "peer ip not allowed");
                    continue;
                }
            }

            let pool = self.clone();
            tokio::spawn(async move { pool.handshake_and_publish(tcp).await });
        }
    }

    /// One wrap-mint-announce-publish attempt. Runs off the accept loop so
    /// one slow or failing handshake never stalls the next accept.
    async fn handshake_and_publish(self: Arc<Self>, tcp: TcpStream) {
        let mut boxed: BoxedStream = match &self.tls {
            Some(tls_cfg) => match tls_cfg.wrap(tcp).await {
                Ok(wrapped) => Box::new(wrapped),
                Err(err) => {
                    tracing::debug!(error = %err, "server tls handshake failed");
                    return;
                }
            },
            None => Box::new(tcp),
        };

        let id = self.mint_unused_id();

        if boxed.write_all(id.as_bytes()).await.is_err() {
            tracing::debug!(conn.id = %id, "failed to announce id, dropping connection");
            return;
        }

        arm_keepalive(&*boxed, self.keep_alive);

        self.store.register(id, boxed).await;
        tracing::debug!(conn.id = %id, "published warmed connection");
    }

    /// Retry minting until an ID not already present in the registry turns
    /// up, so the client never receives an ID that `register` will
    /// immediately reject as a collision.
    fn mint_unused_id(&self) -> ConnId {
        loop {
            let candidate = ConnId::mint();
            if !self.store.contains(candidate) {
                return candidate;
            }
        }
    }

    /// Blocks until a live connection is available or the pool is
    /// cancelled.
    pub async fn get(&self) -> Result<(ConnId, BoxedStream), PoolCancelled> {
        self.store.take_any().await
    }

    pub fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub async fn active(&self) -> usize {
        self.store.active().await
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn error_count(&self) -> u64 {
        self.store.error_count()
    }

    pub fn add_error(&self) {
        self.store.add_error();
    }

    /// Fire cancellation and close every connection in the pool. Idempotent.
    pub async fn close(&self) {
        self.store.close().await;
        if let Some((scope, handle)) = self.loop_scope.lock().await.take() {
            scope.cancel();
            let _ = handle.await;
        }
    }
}
