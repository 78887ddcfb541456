//! # tourbox-bridge
//!
//! TCP bridge for the TourBox console.  The console connects to a local TCP
//! port and streams single protocol bytes; this crate accepts those
//! connections, decodes the stream into named control events with held-state
//! tracking, and hands the events to a host-supplied sink.
//!
//! # Threading model
//!
//! Blocking I/O on dedicated threads, not an async runtime:
//!
//! ```text
//! Bridge (facade, owns the server registry)
//!  └─ ConsoleServer (one per create() call)
//!       ├─ accept thread   -- polls the listener, spawns sessions
//!       ├─ session threads -- one per live connection; read + decode
//!       └─ dispatch thread -- drains the event channel into the sinks
//! ```
//!
//! Session threads and the accept thread enqueue events on a bounded channel;
//! the dispatch thread delivers them in order, so sinks are never invoked
//! concurrently for one server and per-connection ordering is preserved.
//!
//! The only cross-thread state is each server's held-state store and the
//! facade's registry, both behind plain mutexes with single-map-access
//! critical sections.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourbox_bridge::{Bridge, BridgeConfig};
//! use tourbox_core::BridgeEvent;
//!
//! let bridge = Bridge::new();
//! let sink = Arc::new(|event: &BridgeEvent| println!("{event:?}"));
//! let id = bridge.create(BridgeConfig::default(), sink, None).unwrap();
//!
//! // ... the console connects and events flow to the sink ...
//!
//! assert!(bridge.stop(id));
//! ```

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod server;

pub use bridge::{Bridge, ServerId};
pub use config::{BridgeConfig, ConfigError};
pub use dispatch::{EventSink, RawSink};
pub use server::BridgeError;
