//! End-to-end scenarios driving real `ClientPool`/`ServerPool` pairs over
//! loopback TCP: a happy handshake, a TLS verification failure, the IP
//! allow-list, and a half-closed peer skipped by liveness. Capacity control
//! under total dial failure and ID collision are covered as narrower unit
//! tests alongside the code they exercise
//! (`client::tests::capacity_shrinks_to_min_under_total_dial_failure`,
//! `store::tests::collision_closes_second_connection`) since they need no
//! real socket traffic to observe.

mod common;

use std::sync::Arc;
use std::time::Duration;

use conn_pool::client::{ClientPool, FixedAddrDialer};
use conn_pool::config::schema::{ClientPoolConfig, ServerPoolConfig};
use conn_pool::config::validation::{validate_client_config, validate_server_config};
use conn_pool::server::{ServerPool, TcpListenerSource};
use conn_pool::tls::ServerTlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn self_signed(hostname: &str) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
    let certified = rcgen::generate_simple_self_signed(vec![hostname.to_string()]).unwrap();
    let cert = CertificateDer::from(certified.cert.der().to_vec());
    let key = PrivateKeyDer::try_from(certified.key_pair.serialize_der()).unwrap();
    (vec![cert], key)
}

/// S1 — happy handshake: both pools warm to capacity, `ServerGet`'s ID
/// round-trips through `ClientGet`, and the two ends of the handed-out
/// connection can actually exchange a byte.
#[tokio::test]
async fn s1_happy_handshake_round_trips_and_carries_traffic() {
    // `TcpListenerSource` doesn't expose its bound port, so probe with a
    // plain listener first, drop it, then rebind the real one on that addr.
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);

    let server_config = validate_server_config(&ServerPoolConfig {
        bind_address: addr.to_string(),
        ..Default::default()
    });
    let listener = TcpListenerSource::bind(&addr.to_string()).await.unwrap();
    let server_pool = ServerPool::new(server_config, Arc::new(listener), None);
    server_pool.server_manager().await;

    let client_config = validate_client_config(&ClientPoolConfig {
        min_cap: 2,
        max_cap: 2,
        min_ivl_ms: 20,
        max_ivl_ms: 50,
        ..Default::default()
    });
    let client_pool = ClientPool::new(
        client_config,
        Arc::new(FixedAddrDialer::new(addr.to_string())),
    );
    client_pool.client_manager().await;

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if client_pool.active().await == 2 && server_pool.active().await == 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("both pools must warm to capacity");

    let (id, mut server_conn) = tokio::time::timeout(Duration::from_secs(1), server_pool.get())
        .await
        .unwrap()
        .unwrap();

    let mut client_conn = client_pool.get(id).await.expect("id must be claimable on the client side");

    client_conn.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    server_conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    server_conn.write_all(b"pong").await.unwrap();
    let mut buf = [0u8; 4];
    client_conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");

    client_pool.close().await;
    server_pool.close().await;
}

/// S2 — TLS mode "2" handshake failure: the client demands full
/// verification against a hostname the server's self-signed certificate
/// was never issued for (and which isn't signed by any root the client
/// trusts either), so every handshake fails and the client's ready queue
/// never fills, though the refill loop keeps trying.
#[tokio::test]
async fn s2_tls_mode_2_verification_failure_keeps_client_empty() {
    let (certs, key) = self_signed("right.example");
    let tls = ServerTlsConfig::from_certs_and_key(certs, key).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let listener = TcpListenerSource::bind(&addr.to_string()).await.unwrap();

    let server_config = validate_server_config(&ServerPoolConfig {
        bind_address: addr.to_string(),
        ..Default::default()
    });
    let server_pool = ServerPool::new(server_config, Arc::new(listener), Some(Arc::new(tls)));
    server_pool.server_manager().await;

    let client_config = validate_client_config(&ClientPoolConfig {
        min_cap: 1,
        max_cap: 1,
        min_ivl_ms: 10,
        max_ivl_ms: 30,
        tls_code: "2".to_string(),
        hostname: "wrong.example".to_string(),
        ..Default::default()
    });
    let client_pool = ClientPool::new(
        client_config,
        Arc::new(FixedAddrDialer::new(addr.to_string())),
    );
    client_pool.client_manager().await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client_pool.active().await, 0);

    client_pool.close().await;
    server_pool.close().await;
}

/// S3 — IP allow-list: a server configured to only accept `10.0.0.1`
/// drops every loopback connection before the ID is ever announced.
#[tokio::test]
async fn s3_ip_allowlist_drops_disallowed_peers() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let listener = TcpListenerSource::bind(&addr.to_string()).await.unwrap();

    let server_config = validate_server_config(&ServerPoolConfig {
        bind_address: addr.to_string(),
        client_ip: "10.0.0.1".to_string(),
        ..Default::default()
    });
    let server_pool = ServerPool::new(server_config, Arc::new(listener), None);
    server_pool.server_manager().await;

    let client_config = validate_client_config(&ClientPoolConfig {
        min_cap: 1,
        max_cap: 1,
        min_ivl_ms: 10,
        max_ivl_ms: 30,
        ..Default::default()
    });
    let client_pool = ClientPool::new(
        client_config,
        Arc::new(FixedAddrDialer::new(addr.to_string())),
    );
    client_pool.client_manager().await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server_pool.active().await, 0);
    assert_eq!(client_pool.active().await, 0);

    client_pool.close().await;
    server_pool.close().await;
}

/// Restart law: calling `ClientManager` again cancels the previous refill
/// loop's scope and becomes the sole active loop — the pool keeps warming
/// against the same peer afterward, it isn't left running two refill loops
/// racing each other.
#[tokio::test]
async fn client_manager_restart_replaces_previous_loop() {
    let addr = common::spawn_id_announcing_peer("127.0.0.1:0").await;

    let client_config = validate_client_config(&ClientPoolConfig {
        min_cap: 1,
        max_cap: 1,
        min_ivl_ms: 10,
        max_ivl_ms: 30,
        ..Default::default()
    });
    let client_pool = ClientPool::new(
        client_config,
        Arc::new(FixedAddrDialer::new(addr.to_string())),
    );

    client_pool.client_manager().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client_pool.ready());

    // Restart: the old loop is cancelled and a fresh one takes over, and
    // still keeps the pool warm against the same peer afterward.
    client_pool.client_manager().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(client_pool.active().await, 1);

    client_pool.close().await;
}

/// S6 — liveness probe rejects a half-closed peer: a connection whose
/// remote side has already shut its write half down is discarded by
/// `ServerGet`, which then returns the next, healthy ID instead.
#[tokio::test]
async fn s6_liveness_probe_skips_half_closed_peer_for_next_healthy_one() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let listener = TcpListenerSource::bind(&addr.to_string()).await.unwrap();

    let server_config = validate_server_config(&ServerPoolConfig {
        bind_address: addr.to_string(),
        ..Default::default()
    });
    let server_pool = ServerPool::new(server_config, Arc::new(listener), None);
    server_pool.server_manager().await;

    // Dead peer: connects then immediately drops, closing its side.
    {
        let _dead = tokio::net::TcpStream::connect(addr).await.unwrap();
    }
    // Live peer: connects and stays silent, held open for the test's duration.
    let _live_peer = tokio::net::TcpStream::connect(addr).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if server_pool.active().await == 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("both peers must be warmed into the server pool");

    let (_id, _conn) = tokio::time::timeout(Duration::from_secs(1), server_pool.get())
        .await
        .unwrap()
        .expect("the live connection must still be returned despite the dead one ahead of it");

    server_pool.close().await;
}
