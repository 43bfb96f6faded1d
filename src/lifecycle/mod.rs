//! Lifecycle management: graceful shutdown for a running pool pair.
//!
//! The pool's own restartability (`ClientManager`/`ServerManager` cancelling
//! and replacing their previous loop scope) is handled inside `client`/
//! `server` directly; this module only covers the outer process-level
//! "wait for Ctrl-C, then close every pool" pattern used by the CLI demo.

pub mod shutdown;
