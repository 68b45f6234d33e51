use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Configuration for the mock server
///
/// # Examples
///
/// ```
/// use mocksrv::server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     read_timeout: Duration::from_secs(5),
///     write_timeout: Duration::from_secs(5),
///     join_timeout: Duration::from_secs(10),
///     max_request_head: 8192,
///     max_request_body: 1024 * 1024,
/// };
/// ```
///
/// Picking a fixed port on loopback:
///
/// ```
/// use mocksrv::server::ServerConfig;
///
/// let config = ServerConfig::with_port(8080);
/// assert_eq!(config.bind_addr.port(), 8080);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to; port 0 lets the OS pick one
    pub bind_addr: SocketAddr,
    /// How long a connection may take to deliver its request
    pub read_timeout: Duration,
    /// Write timeout for the response
    pub write_timeout: Duration,
    /// Upper bound `stop()` waits for the acceptor worker
    pub join_timeout: Duration,
    /// Bytes of request head inspected for a content-type
    pub max_request_head: usize,
    /// Bytes of declared request body drained before replying
    pub max_request_body: usize,
}

impl ServerConfig {
    /// Default configuration bound to `127.0.0.1:<port>`
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(10),
            max_request_head: 8192,
            max_request_body: 1024 * 1024,
        }
    }
}
