//! Shared harness for pool integration tests: minimal in-process peers that
//! speak the pool's 8-byte ID handshake without any pool code at all.

use std::net::SocketAddr;

use conn_pool::id::ConnId;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

/// Accept connections on `addr` and announce a freshly minted ID on each
/// one, then leave the socket open — as a real server pool peer would — so
/// it can be dialed, handshaken, and handed out by a [`conn_pool::ClientPool`]
/// under test. Returns the bound address.
pub async fn spawn_id_announcing_peer(addr: &str) -> SocketAddr {
    let listener = TcpListener::bind(addr).await.unwrap();
    let bound = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut sock, _)) => {
                    tokio::spawn(async move {
                        let id = ConnId::mint();
                        let _ = sock.write_all(id.as_bytes()).await;
                        std::mem::forget(sock);
                    });
                }
                Err(_) => break,
            }
        }
    });
    bound
}

/// Connect to `addr` and hold the socket open without ever writing to it.
pub async fn connect_silent(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}
