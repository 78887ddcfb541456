//! Event delivery: sink traits and the per-server dispatcher thread.
//!
//! Session threads and the accept thread never call the host's sinks
//! directly.  They enqueue onto a bounded channel; one dispatcher thread per
//! server drains it and invokes the sinks.  This keeps producer threads
//! decoupled from however slow or single-threaded the host's handling is,
//! while preserving order: a raw chunk is always delivered before the events
//! decoded from it, and events from one connection arrive in read order.
//!
//! The dispatcher exits when every sender clone has been dropped, which is
//! how [`crate::server::ConsoleServer`] drains in-flight events on stop.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::debug;

use tourbox_core::BridgeEvent;

/// Bound on in-flight events per server.  A full channel back-pressures the
/// session thread (its `blocking_send` waits), which in turn delays the next
/// socket read — the only buffering the bridge does beyond one read chunk.
pub(crate) const CHANNEL_CAPACITY: usize = 64;

/// Receives lifecycle and control events from one server.
///
/// Called from the server's dispatcher thread only, one event at a time.
/// Implementations must not block for long: the channel behind the
/// dispatcher is bounded, so a stalled sink eventually stalls the sessions.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &BridgeEvent);
}

/// Receives every inbound byte chunk verbatim, before decoding and
/// independent of whether the chunk decodes to anything.
pub trait RawSink: Send + Sync {
    fn on_raw(&self, chunk: &[u8]);
}

// Closures make convenient sinks: `Arc::new(|e: &BridgeEvent| ...)`.
impl<F: Fn(&BridgeEvent) + Send + Sync> EventSink for F {
    fn on_event(&self, event: &BridgeEvent) {
        self(event)
    }
}

/// One unit of work for the dispatcher.
#[derive(Debug)]
pub(crate) enum Emission {
    /// A verbatim inbound chunk, produced only when a raw sink is registered.
    Raw(Vec<u8>),
    Event(BridgeEvent),
}

/// Spawns the dispatcher thread for one server.
///
/// Runs until the channel closes (all senders dropped), delivering any
/// events still queued at that point.
pub(crate) fn spawn_dispatcher(
    server_id: u32,
    mut rx: mpsc::Receiver<Emission>,
    event_sink: Arc<dyn EventSink>,
    raw_sink: Option<Arc<dyn RawSink>>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("tourbox-dispatch-{server_id}"))
        .spawn(move || {
            while let Some(emission) = rx.blocking_recv() {
                match emission {
                    Emission::Raw(chunk) => {
                        if let Some(sink) = &raw_sink {
                            sink.on_raw(&chunk);
                        }
                    }
                    Emission::Event(event) => event_sink.on_event(&event),
                }
            }
            debug!(server_id, "dispatcher drained and exiting");
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
