//! Held-state tracking for press/release button pairs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Which press codes are currently held down.
///
/// One instance exists per running server; sessions on that server share it
/// through an `Arc`.  The invariant is *absent entry ≡ not held*: only press
/// codes that have actually been seen appear as keys, and a code that was
/// never pressed reads as `false`.
///
/// Both operations take the lock for a single map access, so the critical
/// section never spans a socket read or a sink call.
#[derive(Debug, Default)]
pub struct HeldStates {
    states: Mutex<HashMap<u8, bool>>,
}

impl HeldStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a press code as held or released.  Idempotent.
    pub fn set_held(&self, code: u8, held: bool) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code, held);
    }

    /// Returns whether a press code is currently held.  Unknown codes read
    /// as `false`.
    pub fn is_held(&self, code: u8) -> bool {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&code)
            .copied()
            .unwrap_or(false)
    }
}
