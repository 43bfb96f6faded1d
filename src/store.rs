//! The pool store: the registry + ready-queue pair, kept mutually consistent
//! under concurrent refill and hand-out.
//!
//! The registry (`DashMap`) is the map from [`ConnId`] to the warmed
//! connection; the ready queue is a bounded `VecDeque` of IDs guarded by the
//! same mutex that also serializes `register`'s back-pressure check,
//! `take_by_id`'s keyed eviction, and `flush` — a naive lock-free rebuild of
//! the queue races with concurrent publishes, so this drains, filters, and
//! swaps the queue atomically under one lock rather than mixing parallel
//! sends into a channel with a default branch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::error::PoolCancelled;
use crate::id::ConnId;
use crate::liveness;
use crate::stream::BoxedStream;

struct QueueState {
    queue: VecDeque<ConnId>,
}

/// Shared pool state: registry, ready queue, capacity/interval targets, the
/// error counter, and the cancellation handle. Both `ClientPool` and
/// `ServerPool` own one of these; only the hand-out method they actually use
/// (`take_by_id` vs `take_any`) differs by role.
pub struct Store {
    registry: DashMap<ConnId, BoxedStream>,
    state: Mutex<QueueState>,
    notify: Notify,

    capacity: AtomicUsize,
    interval_ms: AtomicU64,
    error_count: AtomicU64,

    pub min_cap: usize,
    pub max_cap: usize,
    pub min_ivl: Duration,
    pub max_ivl: Duration,

    cancel: CancellationToken,
}

impl Store {
    pub fn new(
        min_cap: usize,
        max_cap: usize,
        initial_capacity: usize,
        min_ivl: Duration,
        max_ivl: Duration,
        initial_interval: Duration,
    ) -> Self {
        Self {
            registry: DashMap::new(),
            state: Mutex::new(QueueState {
                queue: VecDeque::with_capacity(max_cap),
            }),
            notify: Notify::new(),
            capacity: AtomicUsize::new(initial_capacity.clamp(min_cap, max_cap)),
            interval_ms: AtomicU64::new(initial_interval.clamp(min_ivl, max_ivl).as_millis() as u64),
            error_count: AtomicU64::new(0),
            min_cap,
            max_cap,
            min_ivl,
            max_ivl,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fire cancellation and close every connection currently in the pool.
    /// Idempotent: calling this repeatedly just re-flushes an empty pool.
    pub async fn close(&self) {
        self.cancel.cancel();
        self.flush().await;
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    pub fn set_capacity(&self, value: usize) {
        self.capacity
            .store(value.clamp(self.min_cap, self.max_cap), Ordering::Relaxed);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_interval(&self, value: Duration) {
        let clamped = value.clamp(self.min_ivl, self.max_ivl);
        self.interval_ms
            .store(clamped.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn add_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Current ready-queue length. Telemetry only — may be briefly stale.
    pub async fn active(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Whether `id` is already registered. Used by the server pool to find a
    /// non-colliding ID to mint and announce before it ever touches the
    /// wire; inherently racy against a concurrent `register`, but the 32-bit
    /// keyspace of [`ConnId::mint`] makes that race astronomically unlikely.
    pub fn contains(&self, id: ConnId) -> bool {
        self.registry.contains_key(&id)
    }

    /// Publish a warmed connection. Drops it (closing the socket) on
    /// collision, on back-pressure (queue already at the current capacity
    /// target), or if the pool has been cancelled.
    ///
    /// The cancellation check happens inside the same critical section as
    /// the collision and back-pressure checks (not before acquiring the
    /// lock) so it can never observe a stale "not cancelled" and publish a
    /// connection that `flush`/`close` has already swept past.
    pub async fn register(&self, id: ConnId, mut conn: BoxedStream) {
        let mut state = self.state.lock().await;

        if self.cancel.is_cancelled() {
            drop(state);
            let _ = conn.shutdown().await;
            return;
        }

        if let Entry::Occupied(_) = self.registry.entry(id) {
            drop(state);
            let _ = conn.shutdown().await;
            return;
        }

        if state.queue.len() >= self.capacity() {
            drop(state);
            let _ = conn.shutdown().await;
            return;
        }

        self.registry.insert(id, conn);
        state.queue.push_back(id);
        drop(state);
        self.notify.notify_one();
    }

    /// Client-side keyed hand-out: `ClientGet(id)`. Never blocks.
    pub async fn take_by_id(&self, id: ConnId) -> Option<BoxedStream> {
        let mut state = self.state.lock().await;
        let conn = self.registry.remove(&id).map(|(_, c)| c);
        if conn.is_some() {
            let filtered: VecDeque<ConnId> =
                state.queue.drain(..).filter(|queued| *queued != id).collect();
            state.queue = filtered;
        }
        conn
    }

    /// Server-side FIFO hand-out: `ServerGet()`. Blocks while the queue is
    /// empty, retrying past dead connections, until a live one surfaces or
    /// the pool is cancelled.
    pub async fn take_any(&self) -> Result<(ConnId, BoxedStream), PoolCancelled> {
        loop {
            let id = loop {
                let popped = {
                    let mut state = self.state.lock().await;
                    state.queue.pop_front()
                };
                match popped {
                    Some(id) => break id,
                    None => {
                        tokio::select! {
                            _ = self.cancel.cancelled() => {
                                return Err(PoolCancelled::new(self.cancellation_reason()));
                            }
                            _ = self.notify.notified() => continue,
                        }
                    }
                }
            };

            let mut conn = match self.registry.remove(&id) {
                Some((_, conn)) => conn,
                // Concurrently taken by `take_by_id`; try the next head.
                None => continue,
            };

            if liveness::is_live(&mut *conn).await {
                return Ok((id, conn));
            }
            let _ = conn.shutdown().await;
        }
    }

    fn cancellation_reason(&self) -> String {
        "pool cancellation token fired".to_string()
    }

    /// Close every registered connection concurrently and empty both the
    /// registry and the ready queue. Safe to call repeatedly.
    ///
    /// Runs two full drain passes: a `register` that was already past its
    /// cancellation check when the first pass started could still land an
    /// entry in the registry between this method's queue-clear and its
    /// registry sweep; the second pass catches anything like that instead
    /// of leaving it registered forever.
    pub async fn flush(&self) {
        self.drain_once().await;
        self.drain_once().await;
    }

    async fn drain_once(&self) {
        {
            let mut state = self.state.lock().await;
            state.queue.clear();
        }

        let ids: Vec<ConnId> = self.registry.iter().map(|entry| *entry.key()).collect();
        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, mut conn)) = self.registry.remove(&id) {
                handles.push(tokio::spawn(async move {
                    let _ = conn.shutdown().await;
                }));
            }
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let (accept_res, connect_res) = tokio::join!(listener.accept(), connect);
        (accept_res.unwrap().0, connect_res.unwrap())
    }

    fn store() -> Store {
        Store::new(
            1,
            4,
            4,
            Duration::from_millis(100),
            Duration::from_secs(2),
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn register_then_take_by_id_round_trips() {
        let store = store();
        let (a, _b) = loopback_pair().await;
        let id = ConnId::mint();
        store.register(id, Box::new(a)).await;
        assert_eq!(store.active().await, 1);

        let taken = store.take_by_id(id).await;
        assert!(taken.is_some());
        assert_eq!(store.active().await, 0);
        assert!(store.take_by_id(id).await.is_none());
    }

    #[tokio::test]
    async fn collision_closes_second_connection() {
        let store = store();
        let id = ConnId::mint();
        let (a, _ka) = loopback_pair().await;
        let (b, _kb) = loopback_pair().await;
        store.register(id, Box::new(a)).await;
        store.register(id, Box::new(b)).await;
        assert_eq!(store.active().await, 1);
    }

    #[tokio::test]
    async fn backpressure_drops_when_queue_full() {
        let store = Store::new(
            1,
            1,
            1,
            Duration::from_millis(100),
            Duration::from_secs(2),
            Duration::from_millis(500),
        );
        let (a, _ka) = loopback_pair().await;
        let (b, _kb) = loopback_pair().await;
        store.register(ConnId::mint(), Box::new(a)).await;
        store.register(ConnId::mint(), Box::new(b)).await;
        assert_eq!(store.active().await, 1);
    }

    #[tokio::test]
    async fn take_any_returns_in_fifo_order() {
        let store = store();
        let (a, _ka) = loopback_pair().await;
        let (b, _kb) = loopback_pair().await;
        let id_a = ConnId::mint();
        let id_b = ConnId::mint();
        store.register(id_a, Box::new(a)).await;
        store.register(id_b, Box::new(b)).await;

        let (first, _) = store.take_any().await.unwrap();
        assert_eq!(first, id_a);
        let (second, _) = store.take_any().await.unwrap();
        assert_eq!(second, id_b);
    }

    #[tokio::test]
    async fn take_any_unblocks_on_cancellation() {
        let store = store();
        let cancel = store.cancel_token();
        let handle = tokio::spawn(async move { store.take_any().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let result = handle.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn flush_empties_registry_and_queue() {
        let store = store();
        let (a, _ka) = loopback_pair().await;
        store.register(ConnId::mint(), Box::new(a)).await;
        store.flush().await;
        assert_eq!(store.active().await, 0);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let store = store();
        store.close().await;
        store.close().await;
        assert_eq!(store.active().await, 0);
    }

    #[tokio::test]
    async fn register_after_close_is_rejected_and_closed() {
        use tokio::io::AsyncReadExt;

        let store = store();
        store.close().await;

        let (a, mut b) = loopback_pair().await;
        store.register(ConnId::mint(), Box::new(a)).await;
        assert_eq!(store.active().await, 0);

        // The rejected half should observe EOF rather than staying open.
        let mut buf = [0u8; 1];
        assert_eq!(b.read(&mut buf).await.unwrap(), 0);
    }
}
