use super::config::ServerConfig;
use super::connection::handle_connection;
use crate::response::ResponseTemplate;
use crate::{MockError, Result};
use std::io;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

/// Accepts and serves connections one at a time until cancelled
///
/// Cancellation is `shutdown` set to true followed by the listener being shut
/// down underneath the blocked `accept()`. An accept failure observed after
/// that is the expected exit; any other accept failure ends the loop with
/// [`MockError::Accept`]. Failures while serving a single connection are
/// logged and the loop moves on.
pub(crate) fn run(
    listener: &TcpListener,
    template: &ResponseTemplate,
    config: &ServerConfig,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut served: u64 = 0;

    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if shutdown.load(Ordering::SeqCst) {
                    debug!(%peer, "Dropping connection accepted during shutdown");
                    break;
                }

                match handle_connection(stream, template, config) {
                    Ok(exchange) => {
                        served += 1;
                        debug!(
                            %peer,
                            variant = %exchange.variant,
                            bytes = exchange.bytes_written,
                            served,
                            "Served connection"
                        );
                    }
                    Err(e) => {
                        warn!(%peer, error = %e, "Failed to serve connection");
                    }
                }
            }
            Err(e) if shutdown.load(Ordering::SeqCst) => {
                debug!(error = %e, "Listener closed");
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(error = %e, served, "Failed to accept connection");
                return Err(MockError::Accept(e));
            }
        }
    }

    debug!(served, "Acceptor loop exited");
    Ok(())
}
