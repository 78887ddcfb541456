//! One console server: listening socket, accept thread, session registry,
//! held-state store, dispatcher.
//!
//! A server is created by [`crate::Bridge::create`] and torn down by
//! [`crate::Bridge::stop`].  Binding failures are fatal to the create call
//! and produce no server object; everything after a successful bind is
//! isolated per session — a console disconnecting or erroring never affects
//! its siblings or the listener.
//!
//! # Shutdown sequence
//!
//! `stop()` flips the stop flag, then joins in dependency order:
//!
//! 1. accept thread (exits within one poll interval; the listener socket
//!    closes with it),
//! 2. session threads (force-closed via `shutdown()` so a blocked read
//!    returns immediately; each emits its disconnect on the way out),
//! 3. dispatcher (the server's last channel sender is dropped once the
//!    producers are gone, so it drains whatever is queued and exits).

pub mod session;

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tourbox_core::{BridgeEvent, HeldStates};

use crate::config::BridgeConfig;
use crate::dispatch::{self, Emission, EventSink, RawSink};
use crate::server::session::{SessionContext, SessionHandle};

/// Error type for server creation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The configured bind address is not a valid IP address.
    #[error("invalid bind address {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    /// The listening socket could not be bound (port in use, insufficient
    /// privilege, ...).
    #[error("failed to bind console listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Post-bind setup failed: socket configuration or thread spawn.
    #[error("server setup failed: {0}")]
    Setup(#[source] io::Error),
}

/// A running console server.
///
/// Owned by the [`crate::Bridge`] registry; hosts interact with it through
/// the facade rather than directly.
pub struct ConsoleServer {
    id: u32,
    local_addr: SocketAddr,
    stopping: Arc<AtomicBool>,
    held: Arc<HeldStates>,
    sessions: Arc<Mutex<HashMap<u64, SessionHandle>>>,
    accept_join: Option<JoinHandle<()>>,
    dispatch_join: Option<JoinHandle<()>>,
    /// Dropped during stop so the dispatcher's channel can close.
    emit_tx: Option<mpsc::Sender<Emission>>,
}

impl ConsoleServer {
    /// Binds the listener and starts the accept and dispatcher threads.
    ///
    /// Address reuse on the listening socket comes from
    /// `TcpListener::bind`, which sets `SO_REUSEADDR` on Unix platforms.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidAddress`] or [`BridgeError::BindFailed`]
    /// without leaving any thread or socket behind.
    pub(crate) fn start(
        id: u32,
        config: &BridgeConfig,
        event_sink: Arc<dyn EventSink>,
        raw_sink: Option<Arc<dyn RawSink>>,
    ) -> Result<Self, BridgeError> {
        let ip: std::net::IpAddr =
            config
                .bind_address
                .parse()
                .map_err(|source| BridgeError::InvalidAddress {
                    addr: config.bind_address.clone(),
                    source,
                })?;
        let addr = SocketAddr::new(ip, config.port);

        let listener =
            TcpListener::bind(addr).map_err(|source| BridgeError::BindFailed { addr, source })?;
        // Nonblocking accept, polled on a short interval, keeps shutdown
        // latency bounded without a second wake-up socket.
        listener.set_nonblocking(true).map_err(BridgeError::Setup)?;
        let local_addr = listener.local_addr().map_err(BridgeError::Setup)?;

        let stopping = Arc::new(AtomicBool::new(false));
        let held = Arc::new(HeldStates::new());
        let sessions: Arc<Mutex<HashMap<u64, SessionHandle>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let (tx, rx) = mpsc::channel(dispatch::CHANNEL_CAPACITY);
        let raw_enabled = raw_sink.is_some();
        let dispatch_join =
            dispatch::spawn_dispatcher(id, rx, event_sink, raw_sink).map_err(BridgeError::Setup)?;

        let accept = AcceptLoop {
            listener,
            stopping: Arc::clone(&stopping),
            held: Arc::clone(&held),
            sessions: Arc::clone(&sessions),
            tx: tx.clone(),
            raw_enabled,
            chunk_size: config.chunk_size,
            read_timeout: Duration::from_millis(config.read_timeout_ms.max(1)),
            poll_interval: Duration::from_millis(config.accept_poll_ms.max(1)),
        };
        let accept_join = std::thread::Builder::new()
            .name(format!("tourbox-accept-{id}"))
            .spawn(move || accept.run())
            .map_err(BridgeError::Setup)?;

        info!(server_id = id, %local_addr, "console server listening");
        Ok(Self {
            id,
            local_addr,
            stopping,
            held,
            sessions,
            accept_join: Some(accept_join),
            dispatch_join: Some(dispatch_join),
            emit_tx: Some(tx),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The bound address, including the OS-assigned port for port-0 binds.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether this server's store reports the press code held.
    pub(crate) fn is_held_code(&self, code: u8) -> bool {
        self.held.is_held(code)
    }

    /// Stops the server: unblocks the accept thread, force-closes and joins
    /// every live session, then drains and joins the dispatcher.
    pub(crate) fn stop(mut self) {
        info!(server_id = self.id, "stopping console server");
        self.stopping.store(true, Ordering::Relaxed);

        if let Some(join) = self.accept_join.take() {
            if join.join().is_err() {
                warn!(server_id = self.id, "accept thread panicked");
            }
        }

        // Drain the registry under a short lock, then close and join outside
        // of it so self-removing sessions cannot deadlock against us.
        let handles: Vec<SessionHandle> = {
            let mut sessions = self
                .sessions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            sessions.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.stop.store(true, Ordering::Relaxed);
            handle.stream.shutdown(std::net::Shutdown::Both).ok();
            if handle.join.join().is_err() {
                warn!(server_id = self.id, "session thread panicked");
            }
        }

        // All producers are gone; dropping our sender closes the channel and
        // the dispatcher exits after delivering what is queued.
        drop(self.emit_tx.take());
        if let Some(join) = self.dispatch_join.take() {
            if join.join().is_err() {
                warn!(server_id = self.id, "dispatcher thread panicked");
            }
        }
        info!(server_id = self.id, "console server stopped");
    }
}

/// State owned by the accept thread.
struct AcceptLoop {
    listener: TcpListener,
    stopping: Arc<AtomicBool>,
    held: Arc<HeldStates>,
    sessions: Arc<Mutex<HashMap<u64, SessionHandle>>>,
    tx: mpsc::Sender<Emission>,
    raw_enabled: bool,
    chunk_size: usize,
    read_timeout: Duration,
    poll_interval: Duration,
}

impl AcceptLoop {
    fn run(self) {
        let mut next_session_id: u64 = 0;

        loop {
            if self.stopping.load(Ordering::Relaxed) {
                break;
            }

            let (stream, peer) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(self.poll_interval);
                    continue;
                }
                Err(e) => {
                    // Transient; keep accepting unless we are shutting down.
                    if self.stopping.load(Ordering::Relaxed) {
                        break;
                    }
                    warn!("accept error: {e}");
                    continue;
                }
            };

            info!(%peer, "console connected");
            // The connect notification goes out before the session exists so
            // no control event can precede it.
            if self
                .tx
                .blocking_send(Emission::Event(BridgeEvent::Connected {
                    ip: peer.ip(),
                    port: peer.port(),
                }))
                .is_err()
            {
                break;
            }

            if let Err(e) = self.configure_and_spawn(next_session_id, stream, peer) {
                warn!(%peer, "failed to start session: {e}");
                continue;
            }
            next_session_id += 1;
        }
        debug!("accept loop exited");
    }

    fn configure_and_spawn(
        &self,
        session_id: u64,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> io::Result<()> {
        // Accepted sockets inherit nonblocking mode on some platforms; the
        // session wants a blocking read with a deadline instead.
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.read_timeout))?;

        session::spawn_session(
            session_id,
            stream,
            peer,
            SessionContext {
                held: Arc::clone(&self.held),
                tx: self.tx.clone(),
                sessions: Arc::clone(&self.sessions),
                chunk_size: self.chunk_size,
                raw_enabled: self.raw_enabled,
            },
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn null_sink() -> Arc<dyn EventSink> {
        Arc::new(|_: &BridgeEvent| {})
    }

    #[test]
    fn test_start_fails_on_invalid_bind_address() {
        let config = BridgeConfig {
            bind_address: "not-an-ip".to_string(),
            ..BridgeConfig::ephemeral()
        };
        let result = ConsoleServer::start(1, &config, null_sink(), None);
        assert!(matches!(result, Err(BridgeError::InvalidAddress { .. })));
    }

    #[test]
    fn test_start_fails_when_port_is_taken() {
        // Arrange: occupy a port with a plain listener.
        let occupied = TcpListener::bind("127.0.0.1:0").expect("bind probe");
        let port = occupied.local_addr().unwrap().port();

        let config = BridgeConfig {
            port,
            ..BridgeConfig::default()
        };

        // Act
        let result = ConsoleServer::start(1, &config, null_sink(), None);

        // Assert: no server object is produced.
        assert!(matches!(result, Err(BridgeError::BindFailed { .. })));
    }

    #[test]
    fn test_start_and_stop_leave_no_thread_behind() {
        let server = ConsoleServer::start(1, &BridgeConfig::ephemeral(), null_sink(), None)
            .expect("start");
        assert_eq!(server.local_addr().ip().to_string(), "127.0.0.1");
        assert_ne!(server.local_addr().port(), 0, "port must be OS-assigned");
        // stop() joins the accept and dispatcher threads; reaching the end of
        // the test without hanging is the assertion.
        server.stop();
    }

    #[test]
    fn test_port_zero_binds_distinct_ports_for_two_servers() {
        let a = ConsoleServer::start(1, &BridgeConfig::ephemeral(), null_sink(), None).unwrap();
        let b = ConsoleServer::start(2, &BridgeConfig::ephemeral(), null_sink(), None).unwrap();
        assert_ne!(a.local_addr().port(), b.local_addr().port());
        a.stop();
        b.stop();
    }
}
