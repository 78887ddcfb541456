//! Event types delivered to host applications.
//!
//! Events are ephemeral — the bridge never retains history.  Both types
//! derive serde so hosts that forward events out of process (JSON over a
//! pipe, a websocket, etc.) can serialize them directly.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// A decoded control action: one run-length group resolved against the
/// control table.
///
/// `count` is the number of consecutive identical protocol bytes that were
/// collapsed into this event: rotation ticks for a knob/dial/scroll, firmware
/// repeat ticks for a held button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub name: String,
    pub count: u32,
}

impl ControlEvent {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Everything a server reports to its event sink: connection lifecycle plus
/// decoded control events.
///
/// `Connected`/`Disconnected` carry the peer address captured at accept time;
/// a session's disconnect always reports the same address as its connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Connected { ip: IpAddr, port: u16 },
    Disconnected { ip: IpAddr, port: u16 },
    Control(ControlEvent),
}
