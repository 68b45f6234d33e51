//! Blocking mock HTTP server
//!
//! One listening socket, one acceptor thread, one connection at a time.
//! Connections are served in accept order and never overlap.

mod acceptor;
pub mod config;
pub mod connection;
pub mod lifecycle;


pub use config::ServerConfig;
pub use connection::{Exchange, RequestHead, handle_connection};
pub use lifecycle::{MockServer, ServerStatus};
