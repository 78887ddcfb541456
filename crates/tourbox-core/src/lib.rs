//! # tourbox-core
//!
//! Shared library for the TourBox bridge containing the control code table,
//! the run-length protocol decoder, the held-state store, and the event types
//! delivered to host applications.
//!
//! This crate has zero dependencies on sockets, threads of its own, or OS
//! APIs; everything here is testable on any platform without setup.
//!
//! # The protocol in one paragraph
//!
//! A TourBox console connects over TCP and sends a stream of single bytes.
//! Each byte value identifies one control transition: a button going down
//! (press code), a button coming back up (release code), or one tick of a
//! knob/dial/scroll rotation (rotational code).  Holding a button or turning
//! a knob quickly produces runs of identical bytes; the decoder collapses
//! each maximal run into a single `(code, count)` group so "turned 3 ticks"
//! arrives as one event with `count = 3` instead of three unit events.

pub mod controls;
pub mod decoder;
pub mod events;
pub mod hex;
pub mod state;

// Re-export the most-used types at the crate root so callers can write
// `tourbox_core::ControlTable` instead of the full module path.
pub use controls::table::{ControlDef, ControlKind, ControlTable};
pub use decoder::{group_runs, Decoder, RunGroup};
pub use events::{BridgeEvent, ControlEvent};
pub use state::HeldStates;
