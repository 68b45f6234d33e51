use std::net::SocketAddr;
use thiserror::Error;

/// Error types for the mocksrv library
#[derive(Error, Debug)]
pub enum MockError {
    /// The listening socket could not be bound (port in use, permission denied)
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The acceptor loop died on an unexpected accept failure
    #[error("Acceptor loop failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Generic I/O errors (local address lookup, thread spawn, client reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Closing the listening socket failed during teardown
    #[error("Failed to close listening socket: {0}")]
    Teardown(#[source] std::io::Error),

    /// Lifecycle misuse (start twice, stop before start)
    #[error("Invalid server state: {0}")]
    InvalidState(String),

    /// Response template rejected at build time
    #[error("Invalid response template: {0}")]
    Template(String),

    /// Malformed HTTP seen by the bundled client
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The acceptor worker thread panicked
    #[error("Acceptor worker panicked")]
    WorkerPanicked,
}

/// Result type for the mocksrv library
pub type Result<T> = std::result::Result<T, MockError>;

pub mod client;
pub mod common;
pub mod fixtures;
pub mod response;
pub mod server;

// Re-export main types for convenience
pub use client::{RawResponse, Request, send_request};
pub use response::{BodyVariant, ResponseTemplate, ResponseTemplateBuilder, Variant};
pub use server::{MockServer, ServerConfig, ServerStatus};
