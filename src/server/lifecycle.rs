use super::acceptor;
use super::config::ServerConfig;
use crate::response::ResponseTemplate;
use crate::{MockError, Result};
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, IntoRawFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a server is in its one-shot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    New,
    Started,
    Stopping,
    Stopped,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerStatus::New => "new",
            ServerStatus::Started => "started",
            ServerStatus::Stopping => "stopping",
            ServerStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Resources that exist only between `start()` and `stop()`
pub(super) struct Running {
    pub(super) listener: Arc<TcpListener>,
    pub(super) shutdown: Arc<AtomicBool>,
    worker: JoinHandle<Result<()>>,
    done: Receiver<()>,
}

enum State {
    New,
    Started(Running),
    Stopping,
    Stopped,
}

/// Synthetic HTTP responder serving one canned response per connection
///
/// A server is started once and stopped once; running again needs a new
/// instance. Connections are handled sequentially on a single background
/// thread.
///
/// # Examples
///
/// ```no_run
/// use mocksrv::{MockServer, ResponseTemplate, ServerConfig};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let template = ResponseTemplate::builder(200).json(r#"{"ok":true}"#).build()?;
///     let mut server = MockServer::new(template, ServerConfig::default());
///
///     let addr = server.start()?;
///     println!("mock backend on {addr}");
///
///     // Drive the client under test against `addr`...
///
///     server.stop()?;
///     Ok(())
/// }
/// ```
pub struct MockServer {
    config: ServerConfig,
    template: Arc<ResponseTemplate>,
    local_addr: Option<SocketAddr>,
    state: State,
}

impl MockServer {
    pub fn new(template: ResponseTemplate, config: ServerConfig) -> Self {
        Self {
            config,
            template: Arc::new(template),
            local_addr: None,
            state: State::New,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn template(&self) -> &ResponseTemplate {
        &self.template
    }

    pub fn status(&self) -> ServerStatus {
        match self.state {
            State::New => ServerStatus::New,
            State::Started(_) => ServerStatus::Started,
            State::Stopping => ServerStatus::Stopping,
            State::Stopped => ServerStatus::Stopped,
        }
    }

    /// Address actually bound; `None` until `start()` succeeds
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Port actually bound; resolves a requested port 0 to the OS's choice
    pub fn port(&self) -> Option<u16> {
        self.local_addr.map(|addr| addr.port())
    }

    /// Whether the acceptor worker is still serving
    ///
    /// Turns false without `stop()` if the loop died on an accept failure.
    pub fn is_running(&self) -> bool {
        match &self.state {
            State::Started(running) => !running.worker.is_finished(),
            _ => false,
        }
    }

    /// Binds the listening socket and spawns the acceptor worker
    pub fn start(&mut self) -> Result<SocketAddr> {
        if !matches!(self.state, State::New) {
            return Err(MockError::InvalidState(format!(
                "cannot start a server that is {}",
                self.status()
            )));
        }

        let bind_addr = self.config.bind_addr;
        let listener = TcpListener::bind(bind_addr).map_err(|source| MockError::Bind {
            addr: bind_addr,
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let listener = Arc::new(listener);
        let shutdown = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = mpsc::channel();

        let worker = {
            let listener = Arc::clone(&listener);
            let shutdown = Arc::clone(&shutdown);
            let template = Arc::clone(&self.template);
            let config = self.config.clone();
            thread::Builder::new()
                .name(format!("mocksrv-acceptor-{}", local_addr.port()))
                .spawn(move || {
                    let result = acceptor::run(&listener, &template, &config, &shutdown);
                    drop(listener);
                    let _ = done_tx.send(());
                    result
                })?
        };

        info!(address = %local_addr, "Mock server listening");

        self.local_addr = Some(local_addr);
        self.state = State::Started(Running {
            listener,
            shutdown,
            worker,
            done,
        });
        Ok(local_addr)
    }

    /// Cancels the acceptor, waits for it (bounded) and closes the socket
    ///
    /// A worker that outlives `join_timeout` is left behind with a warning and
    /// `stop()` still returns. An accept failure that killed the worker
    /// earlier is returned here, as is a failure closing the socket.
    pub fn stop(&mut self) -> Result<()> {
        let running = match std::mem::replace(&mut self.state, State::Stopping) {
            State::Started(running) => running,
            other => {
                self.state = other;
                return Err(MockError::InvalidState(format!(
                    "cannot stop a server that is {}",
                    self.status()
                )));
            }
        };
        let Running {
            listener,
            shutdown,
            worker,
            done,
        } = running;

        shutdown.store(true, Ordering::SeqCst);
        if let Err(e) = shutdown_listener(&listener) {
            // Platforms that refuse shutdown(2) on a listener need a
            // connection to get accept() to return.
            debug!(error = %e, "Listener shutdown refused, waking acceptor");
            if let Some(addr) = self.local_addr {
                wake_acceptor(addr);
            }
        }

        let outcome = match done.recv_timeout(self.config.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match worker.join() {
                Ok(result) => result,
                Err(_) => Err(MockError::WorkerPanicked),
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout = ?self.config.join_timeout,
                    "Acceptor worker did not terminate in time"
                );
                Ok(())
            }
        };

        let closed = match Arc::try_unwrap(listener) {
            Ok(listener) => close_listener(listener),
            Err(_) => {
                warn!("Listening socket still held by acceptor worker");
                Ok(())
            }
        };

        self.state = State::Stopped;
        if let Some(addr) = self.local_addr {
            info!(address = %addr, "Mock server stopped");
        }

        outcome.and(closed)
    }

    #[cfg(test)]
    pub(super) fn running(&self) -> Option<&Running> {
        match &self.state {
            State::Started(running) => Some(running),
            _ => None,
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if matches!(self.state, State::Started(_)) {
            if let Err(e) = self.stop() {
                warn!(error = %e, "Failed to stop mock server on drop");
            }
        }
    }
}

/// Shuts the listener down so a blocked `accept()` returns
///
/// On Linux this also makes the socket refuse new connections right away,
/// before the descriptor itself is closed.
pub(super) fn shutdown_listener(listener: &TcpListener) -> io::Result<()> {
    let result = unsafe { libc::shutdown(listener.as_raw_fd(), libc::SHUT_RDWR) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Closes the listening socket, reporting the error `Drop` would discard
fn close_listener(listener: TcpListener) -> Result<()> {
    let fd = listener.into_raw_fd();
    let result = unsafe { libc::close(fd) };
    if result != 0 {
        return Err(MockError::Teardown(io::Error::last_os_error()));
    }
    Ok(())
}

fn wake_acceptor(addr: SocketAddr) {
    let target = if addr.ip().is_unspecified() {
        match addr {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port())),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::LOCALHOST, addr.port())),
        }
    } else {
        addr
    };
    if let Err(e) = TcpStream::connect_timeout(&target, Duration::from_secs(1)) {
        debug!(error = %e, "Wake-up connection failed");
    }
}
