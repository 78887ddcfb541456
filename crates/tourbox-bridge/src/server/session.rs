//! Per-connection session: the blocking read/decode loop.
//!
//! One session owns one accepted console connection and runs on its own
//! detached thread.  Each successful read forwards the chunk verbatim to the
//! raw sink (ahead of decoding), then decodes it against the server's shared
//! table and held-state store and enqueues the resulting events.
//!
//! A read of zero bytes (peer closed) or a hard error ends the loop; deadline
//! expiries just re-check the stop flag and read again, which is what bounds
//! shutdown latency.  Exactly one `Disconnected` event is emitted on the way
//! out, carrying the peer address captured at accept time, and the session
//! removes its own registry entry so a long-lived server does not accumulate
//! dead handles.

use std::collections::HashMap;
use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use tourbox_core::{hex, BridgeEvent, ControlTable, Decoder, HeldStates};

use crate::dispatch::Emission;

/// Registry entry for a live session, kept by its server for forced shutdown.
pub(crate) struct SessionHandle {
    /// Cooperative stop flag shared with the session thread.
    pub stop: Arc<AtomicBool>,
    /// A second handle to the session's socket, used to `shutdown()` it and
    /// unblock a read that has not yet hit its deadline.
    pub stream: TcpStream,
    pub join: JoinHandle<()>,
}

/// Everything a session thread needs besides its socket.
pub(crate) struct SessionContext {
    pub held: Arc<HeldStates>,
    pub tx: mpsc::Sender<Emission>,
    pub sessions: Arc<Mutex<HashMap<u64, SessionHandle>>>,
    pub chunk_size: usize,
    /// Skip copying chunks onto the channel when no raw sink is registered.
    pub raw_enabled: bool,
}

/// Spawns the read loop for one accepted connection and registers its handle.
///
/// The socket must already be in blocking mode with a read deadline applied.
/// Returns an error only if the OS refuses to duplicate the socket handle or
/// spawn the thread; the caller logs it and keeps accepting.
pub(crate) fn spawn_session(
    session_id: u64,
    stream: TcpStream,
    peer: SocketAddr,
    ctx: SessionContext,
) -> std::io::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let shutdown_handle = stream.try_clone()?;

    let thread_stop = Arc::clone(&stop);
    let registry = Arc::clone(&ctx.sessions);
    let join = std::thread::Builder::new()
        .name(format!("tourbox-session-{session_id}"))
        .spawn(move || {
            read_loop(stream, peer, thread_stop, &ctx);

            // One disconnect per session, with the address captured at accept
            // time.  Send failure means the dispatcher is already gone.
            let _ = ctx.tx.blocking_send(Emission::Event(BridgeEvent::Disconnected {
                ip: peer.ip(),
                port: peer.port(),
            }));

            // Self-remove; during a server stop the entry may already be
            // drained, in which case this is a no-op.
            ctx.sessions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&session_id);
            debug!(%peer, session_id, "session ended");
        })?;

    registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(
            session_id,
            SessionHandle {
                stop,
                stream: shutdown_handle,
                join,
            },
        );
    Ok(())
}

/// The blocking read/decode loop.  Returns when the peer closes, a hard read
/// error occurs, or the stop flag is set.
fn read_loop(mut stream: TcpStream, peer: SocketAddr, stop: Arc<AtomicBool>, ctx: &SessionContext) {
    let mut buf = vec![0u8; ctx.chunk_size.max(1)];
    let decoder = Decoder::new(ControlTable::global(), &ctx.held);

    while !stop.load(Ordering::Relaxed) {
        let n = match stream.read(&mut buf) {
            Ok(0) => {
                debug!(%peer, "console closed the connection");
                return;
            }
            Ok(n) => n,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                // Forced shutdown during stop also lands here; only log the
                // unexpected case.
                if !stop.load(Ordering::Relaxed) {
                    warn!(%peer, "read error: {e}");
                }
                return;
            }
        };

        let chunk = &buf[..n];
        debug!(%peer, bytes = n, data = %hex::encode(chunk), "received chunk");

        // Raw delivery precedes decoding and is independent of its outcome.
        if ctx.raw_enabled
            && ctx
                .tx
                .blocking_send(Emission::Raw(chunk.to_vec()))
                .is_err()
        {
            return;
        }

        for event in decoder.decode(chunk) {
            if ctx
                .tx
                .blocking_send(Emission::Event(BridgeEvent::Control(event)))
                .is_err()
            {
                return;
            }
        }
    }
}

/// Returns `true` for OS deadline / would-block errors that should re-check
/// the stop flag and retry the read.
pub(crate) fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
