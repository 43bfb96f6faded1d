//! The client-side half of the pool: dials new connections, wraps them per
//! the TLS mode ladder, exchanges the rendezvous ID, and serves keyed
//! hand-out.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::validation::ValidatedClientConfig;
use crate::controllers::{next_capacity, next_interval};
use crate::id::ConnId;
use crate::store::Store;
use crate::stream::{arm_keepalive, BoxedStream};
use crate::tls::{self, TlsMode};

/// The embedder-supplied dialer. Address selection, connect timeout, and
/// retry policy are entirely the dialer's concern — the refill loop only
/// knows how to call `dial()` and react to success or failure.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(&self) -> io::Result<TcpStream>;
}

/// A [`Dialer`] that connects to a single fixed address — the common case
/// for an embedder that isn't doing its own address selection.
pub struct FixedAddrDialer {
    addr: String,
}

impl FixedAddrDialer {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Dialer for FixedAddrDialer {
    async fn dial(&self) -> io::Result<TcpStream> {
        TcpStream::connect(&self.addr).await
    }
}

/// A warmed-connection pool maintained by dialing out to a peer server pool.
pub struct ClientPool {
    store: Arc<Store>,
    dialer: Arc<dyn Dialer>,
    tls_mode: TlsMode,
    hostname: Arc<str>,
    keep_alive: Duration,
    loop_scope: AsyncMutex<Option<(CancellationToken, JoinHandle<()>)>>,
    ready: AtomicBool,
}

impl ClientPool {
    pub fn new(config: ValidatedClientConfig, dialer: Arc<dyn Dialer>) -> Arc<Self> {
        let tls_mode = TlsMode::parse(&config.tls_code);
        let store = Arc::new(Store::new(
            config.min_cap,
            config.max_cap,
            config.min_cap,
            config.min_ivl,
            config.max_ivl,
            config.max_ivl,
        ));
        Arc::new(Self {
            store,
            dialer,
            tls_mode,
            hostname: Arc::from(config.hostname.as_str()),
            keep_alive: config.keep_alive,
            loop_scope: AsyncMutex::new(None),
            ready: AtomicBool::new(false),
        })
    }

    /// Start (or restart) the refill loop. A second call cancels the
    /// previous loop's scope and begins a fresh one, so re-configuring a
    /// running pool never leaves two refill loops racing each other.
    pub async fn client_manager(self: &Arc<Self>) {
        let mut guard = self.loop_scope.lock().await;
        if let Some((old_scope, old_handle)) = guard.take() {
            old_scope.cancel();
            let _ = old_handle.await;
        }

        let scope = self.store.cancel_token().child_token();
        let pool = self.clone();
        let loop_scope = scope.clone();
        let handle = tokio::spawn(async move { pool.run_refill_loop(loop_scope).await });
        *guard = Some((scope, handle));
        self.ready.store(true, Ordering::Release);
    }

    async fn run_refill_loop(&self, scope: CancellationToken) {
        loop {
            if scope.is_cancelled() {
                return;
            }

            let idle = self.store.active().await;
            let capacity = self.store.capacity();
            let new_interval = next_interval(
                idle,
                capacity,
                self.store.interval(),
                self.store.min_ivl,
                self.store.max_ivl,
            );
            self.store.set_interval(new_interval);

            let mut created = 0usize;
            while self.store.active().await < self.store.capacity() {
                if scope.is_cancelled() {
                    return;
                }
                if self.fill_one().await {
                    created += 1;
                }
            }

            let new_capacity =
                next_capacity(created, capacity, self.store.min_cap, self.store.max_cap);
            self.store.set_capacity(new_capacity);
            tracing::debug!(
                pool.role = "client",
                idle,
                capacity,
                created,
                new_capacity,
                interval_ms = self.store.interval().as_millis() as u64,
                "refill sweep complete"
            );

            tokio::select! {
                _ = scope.cancelled() => return,
                _ = tokio::time::sleep(self.store.interval()) => {}
            }
        }
    }

    /// One dial-wrap-handshake-publish attempt. Returns whether the
    /// connection was actually published; every failure
    /// mode is silent and simply yields `false` so the fill loop tries
    /// again next pass.
    async fn fill_one(&self) -> bool {
        let tcp = match self.dialer.dial().await {
            Ok(tcp) => tcp,
            Err(err) => {
                tracing::debug!(error = %err, "dial failed, will retry next sweep");
                return false;
            }
        };

        let mut boxed: BoxedStream = match self.tls_mode {
            TlsMode::None => Box::new(tcp),
            TlsMode::EncryptNoVerify | TlsMode::EncryptVerify => {
                match tls::wrap_client(self.tls_mode, &self.hostname, tcp).await {
                    Ok(wrapped) => Box::new(wrapped),
                    Err(err) => {
                        tracing::debug!(error = %err, tls.mode = ?self.tls_mode, "tls handshake failed");
                        return false;
                    }
                }
            }
        };

        let mut id_bytes = [0u8; 8];
        if boxed.read_exact(&mut id_bytes).await.is_err() {
            tracing::debug!("short read on id handshake, dropping connection");
            return false;
        }

        arm_keepalive(&*boxed, self.keep_alive);

        let id = ConnId::from_wire(id_bytes);
        let was_present = {
            // register() never reports success directly (collisions and
            // back-pressure are silent drops); observe the active count
            // delta instead so the refill loop can feed the capacity
            // controller an accurate `created` count.
            let before = self.store.active().await;
            self.store.register(id, boxed).await;
            self.store.active().await > before
        };
        if was_present {
            tracing::debug!(conn.id = %id, "published warmed connection");
        }
        was_present
    }

    /// `ClientGet(id)` — synchronous in spirit: looks the ID up and, if
    /// present, atomically removes and returns it. Absence is not
    /// distinguished from cancellation; there is no waiting.
    pub async fn get(&self, id: ConnId) -> Option<BoxedStream> {
        self.store.take_by_id(id).await
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

    pub fn interval(&self) -> Duration {
        self.store.interval()
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
