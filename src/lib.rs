//! A bidirectional network connection pool.
//!
//! Two warmed-connection pools, [`client::ClientPool`] and
//! [`server::ServerPool`], rendezvous over an 8-byte ID handshake: the
//! client side dials out and reads the ID the server side mints and
//! announces. Either side can hand a warmed connection to its caller —
//! keyed, on the client; FIFO, on the server — without the caller ever
//! dialing or accepting itself.

pub mod client;
pub mod config;
pub mod controllers;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod liveness;
pub mod observability;
pub mod server;
pub mod store;
pub mod stream;
pub mod tls;

pub use client::{ClientPool, Dialer};
pub use error::PoolCancelled;
pub use id::ConnId;
pub use server::{Listener, ServerPool};
pub use stream::{BoxedStream, PoolStream};
