//! A minimal CLI demo that pairs a client pool with a server pool over
//! loopback, exercising the full dial → handshake → hand-out path without
//! a second process or peer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use conn_pool::client::{ClientPool, FixedAddrDialer};
use conn_pool::config::schema::{ClientPoolConfig, ServerPoolConfig};
use conn_pool::config::validation::{validate_client_config, validate_server_config};
use conn_pool::lifecycle::shutdown::wait_for_ctrl_c;
use conn_pool::observability::{logging, metrics};
use conn_pool::server::{ServerPool, TcpListenerSource};

#[derive(Parser, Debug)]
#[command(about = "Warm a client/server connection pool pair over loopback")]
struct Args {
    /// Address the server pool binds to; the client pool dials the same address.
    #[arg(long, default_value = "127.0.0.1:7000")]
    addr: String,

    /// Address the Prometheus exporter listens on.
    #[arg(long, default_value = "127.0.0.1:9100")]
    metrics_addr: SocketAddr,

    /// Emit JSON-formatted logs instead of the pretty development format.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(args.json_logs);
    metrics::init_metrics(args.metrics_addr);

    tracing::info!(addr = %args.addr, "starting pool demo");

    let server_config = validate_server_config(&ServerPoolConfig {
        bind_address: args.addr.clone(),
        ..Default::default()
    });
    let listener = TcpListenerSource::bind(&server_config.bind_address).await?;
    let server_pool = ServerPool::new(server_config, Arc::new(listener), None);
    server_pool.server_manager().await;

    let client_config = validate_client_config(&ClientPoolConfig {
        min_cap: 2,
        max_cap: 8,
        ..Default::default()
    });
    let client_pool = ClientPool::new(
        client_config,
        Arc::new(FixedAddrDialer::new(args.addr.clone())),
    );
    client_pool.client_manager().await;

    let accept_loop_pool = server_pool.clone();
    tokio::spawn(async move {
        loop {
            match accept_loop_pool.get().await {
                Ok((id, _conn)) => tracing::info!(%id, "server pool handed out a connection"),
                Err(_) => break,
            }
        }
    });

    let report_server = server_pool.clone();
    let report_client = client_pool.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(5));
        loop {
            tick.tick().await;
            metrics::record_pool_state(
                "client",
                "demo",
                report_client.active().await,
                report_client.capacity(),
                report_client.interval().as_millis() as u64,
                report_client.error_count(),
            );
            metrics::record_pool_state(
                "server",
                "demo",
                report_server.active().await,
                report_server.capacity(),
                0,
                report_server.error_count(),
            );
        }
    });

    wait_for_ctrl_c(|| async {
        client_pool.close().await;
        server_pool.close().await;
    })
    .await;

    Ok(())
}
