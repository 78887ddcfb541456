//! The process-level facade: server registry and held-state queries.
//!
//! A host creates one [`Bridge`] and asks it for servers.  Each `create` call
//! produces an independent [`crate::server::ConsoleServer`] with its own
//! port, sinks, and held-state store; the bridge tracks them by a small
//! integer handle.  Nothing here is global — embedding two bridges in one
//! process works, they just cannot see each other's held state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use tourbox_core::ControlTable;

use crate::config::BridgeConfig;
use crate::dispatch::{EventSink, RawSink};
use crate::server::{BridgeError, ConsoleServer};

/// Handle distinguishing concurrently running servers.
pub type ServerId = u32;

/// Owns every running console server.
pub struct Bridge {
    servers: Mutex<HashMap<ServerId, ConsoleServer>>,
    next_id: AtomicU32,
}

impl Bridge {
    pub fn new() -> Self {
        Self {
            servers: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Starts a server and registers it.
    ///
    /// `event_sink` receives connection lifecycle and control events;
    /// `raw_sink`, when given, additionally receives every inbound chunk
    /// verbatim.  Defaults in [`BridgeConfig`] match the TourBox desktop
    /// software (`127.0.0.1:50500`).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] if the listener cannot be bound; nothing is
    /// registered in that case.
    pub fn create(
        &self,
        config: BridgeConfig,
        event_sink: Arc<dyn EventSink>,
        raw_sink: Option<Arc<dyn RawSink>>,
    ) -> Result<ServerId, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let server = ConsoleServer::start(id, &config, event_sink, raw_sink)?;
        self.lock_servers().insert(id, server);
        Ok(id)
    }

    /// Stops and removes a server.  Returns `false` for an unknown id.
    ///
    /// Blocks until the server's threads have been joined, so once this
    /// returns no further events reach the sinks.
    pub fn stop(&self, id: ServerId) -> bool {
        // Remove under a short lock; join threads outside it.
        let server = self.lock_servers().remove(&id);
        match server {
            Some(server) => {
                server.stop();
                true
            }
            None => {
                warn!(server_id = id, "stop requested for unknown server");
                false
            }
        }
    }

    /// Whether any live server reports the named control held.
    ///
    /// Name resolution tries the exact control name, then the name with
    /// `" Press"` appended, so `is_held("C1")` checks the `"C1 Press"` code.
    /// Unknown names and never-pressed controls read as `false`.
    pub fn is_held(&self, name: &str) -> bool {
        let Some(code) = ControlTable::global().resolve_name(name) else {
            return false;
        };
        self.lock_servers()
            .values()
            .any(|server| server.is_held_code(code))
    }

    /// Whether one specific server reports the named control held.
    /// `false` for unknown server ids.
    pub fn is_held_on(&self, id: ServerId, name: &str) -> bool {
        let Some(code) = ControlTable::global().resolve_name(name) else {
            return false;
        };
        self.lock_servers()
            .get(&id)
            .is_some_and(|server| server.is_held_code(code))
    }

    /// The bound address of a server (reports the OS-assigned port for
    /// port-0 binds).  `None` for unknown ids.
    pub fn local_addr(&self, id: ServerId) -> Option<SocketAddr> {
        self.lock_servers().get(&id).map(ConsoleServer::local_addr)
    }

    /// Ids of all live servers, in creation order.
    pub fn server_ids(&self) -> Vec<ServerId> {
        let mut ids: Vec<ServerId> = self.lock_servers().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn lock_servers(&self) -> std::sync::MutexGuard<'_, HashMap<ServerId, ConsoleServer>> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Bridge {
    /// Dropping the facade stops every server it still owns.
    fn drop(&mut self) {
        let servers: Vec<ConsoleServer> = {
            let mut map = self.servers.lock().unwrap_or_else(PoisonError::into_inner);
            map.drain().map(|(_, s)| s).collect()
        };
        for server in servers {
            server.stop();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tourbox_core::BridgeEvent;

    fn null_sink() -> Arc<dyn EventSink> {
        Arc::new(|_: &BridgeEvent| {})
    }

    #[test]
    fn test_stop_unknown_id_returns_false() {
        let bridge = Bridge::new();
        assert!(!bridge.stop(42));
    }

    #[test]
    fn test_is_held_with_no_servers_is_false() {
        let bridge = Bridge::new();
        assert!(!bridge.is_held("C1"));
        assert!(!bridge.is_held_on(1, "C1"));
    }

    #[test]
    fn test_is_held_with_unknown_name_is_false() {
        let bridge = Bridge::new();
        let id = bridge
            .create(BridgeConfig::ephemeral(), null_sink(), None)
            .expect("create");
        assert!(!bridge.is_held("No Such Control"));
        assert!(bridge.stop(id));
    }

    #[test]
    fn test_server_ids_are_monotonic_from_one() {
        let bridge = Bridge::new();
        let a = bridge
            .create(BridgeConfig::ephemeral(), null_sink(), None)
            .unwrap();
        let b = bridge
            .create(BridgeConfig::ephemeral(), null_sink(), None)
            .unwrap();

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(bridge.server_ids(), vec![1, 2]);

        assert!(bridge.stop(a));
        assert_eq!(bridge.server_ids(), vec![2]);
        assert!(bridge.stop(b));
    }

    #[test]
    fn test_failed_create_registers_nothing() {
        let bridge = Bridge::new();
        let bad = BridgeConfig {
            bind_address: "definitely not an ip".to_string(),
            ..BridgeConfig::ephemeral()
        };

        assert!(bridge.create(bad, null_sink(), None).is_err());
        assert!(bridge.server_ids().is_empty());

        // The next successful create still works.
        let id = bridge
            .create(BridgeConfig::ephemeral(), null_sink(), None)
            .expect("create after failure");
        assert!(bridge.local_addr(id).is_some());
        assert!(bridge.stop(id));
    }

    #[test]
    fn test_local_addr_unknown_id_is_none() {
        let bridge = Bridge::new();
        assert!(bridge.local_addr(9).is_none());
    }

    #[test]
    fn test_drop_stops_remaining_servers() {
        let bridge = Bridge::new();
        bridge
            .create(BridgeConfig::ephemeral(), null_sink(), None)
            .expect("create");
        // Dropping must join all threads without hanging the test.
        drop(bridge);
    }
}
