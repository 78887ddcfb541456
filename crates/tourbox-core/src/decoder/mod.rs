//! The protocol decoder: run-length grouping plus resolution against the
//! control table and held-state store.
//!
//! # Why run-length grouping?
//!
//! The console emits one byte per tick of a rotation and one byte per
//! firmware repeat tick of a held key.  Turning the knob three ticks within
//! one read therefore arrives as `[0x84, 0x84, 0x84]`.  Collapsing each
//! maximal run of identical bytes into a `(code, count)` group preserves the
//! "moved N ticks" / "held for N repeats" meaning instead of surfacing N
//! redundant unit events.
//!
//! Decoding never fails.  Bytes outside the control table are dropped
//! silently, and state mutation happens before the event for a group is
//! produced, so a caller observing an event can rely on the held-state store
//! already reflecting it.

use tracing::trace;

use crate::controls::table::{ControlKind, ControlTable};
use crate::events::ControlEvent;
use crate::state::HeldStates;

/// A maximal run of identical consecutive protocol bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunGroup {
    pub code: u8,
    pub count: u32,
}

/// Collapses `bytes` into maximal runs of identical values.
///
/// The scan is exact: `current` starts at `bytes[0]` with `count = 1`; each
/// equal subsequent byte increments the count, each different byte emits the
/// finished group and starts a new one; the final group is emitted after the
/// scan.  An empty input produces no groups.
pub fn group_runs(bytes: &[u8]) -> Vec<RunGroup> {
    let Some((&first, rest)) = bytes.split_first() else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    let mut current = first;
    let mut count = 1u32;

    for &b in rest {
        if b == current {
            count += 1;
        } else {
            groups.push(RunGroup {
                code: current,
                count,
            });
            current = b;
            count = 1;
        }
    }
    groups.push(RunGroup {
        code: current,
        count,
    });
    groups
}

/// Resolves grouped protocol bytes into control events, updating held state
/// as it goes.
///
/// One decoder exists per session; the table and held-state store it borrows
/// are shared across the server's sessions.
#[derive(Debug)]
pub struct Decoder<'a> {
    table: &'a ControlTable,
    held: &'a HeldStates,
}

impl<'a> Decoder<'a> {
    pub fn new(table: &'a ControlTable, held: &'a HeldStates) -> Self {
        Self { table, held }
    }

    /// Decodes one chunk of protocol bytes into events.
    ///
    /// Per group: unknown codes are dropped; press codes set their held flag
    /// (idempotently); release codes clear the paired press code's flag only
    /// if it was actually held, but emit their event unconditionally;
    /// rotational codes emit with no state change.
    pub fn decode(&self, bytes: &[u8]) -> Vec<ControlEvent> {
        let mut events = Vec::new();

        for group in group_runs(bytes) {
            let Some(def) = self.table.get(group.code) else {
                trace!(code = group.code, "dropping unknown control code");
                continue;
            };

            match def.kind {
                ControlKind::Press => {
                    self.held.set_held(group.code, true);
                }
                ControlKind::Release => {
                    if let Some(press_code) = self.table.press_for_release(group.code) {
                        if self.held.is_held(press_code) {
                            self.held.set_held(press_code, false);
                        }
                    }
                }
                ControlKind::Rotational => {}
            }

            trace!(name = def.name, count = group.count, "decoded control group");
            events.push(ControlEvent::new(def.name, group.count));
        }

        events
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_decoder(held: &HeldStates) -> Decoder<'_> {
        Decoder::new(ControlTable::global(), held)
    }

    // ── group_runs ────────────────────────────────────────────────────────────

    #[test]
    fn test_group_runs_collapses_knob_rotation() {
        let groups = group_runs(&[0x84, 0x84, 0x84, 0xC4]);
        assert_eq!(
            groups,
            vec![
                RunGroup {
                    code: 132,
                    count: 3
                },
                RunGroup {
                    code: 196,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_group_runs_empty_input_yields_no_groups() {
        assert!(group_runs(&[]).is_empty());
    }

    #[test]
    fn test_group_runs_single_byte() {
        assert_eq!(group_runs(&[34]), vec![RunGroup { code: 34, count: 1 }]);
    }

    #[test]
    fn test_group_runs_alternating_bytes_never_merge() {
        let groups = group_runs(&[1, 2, 1, 2]);
        assert_eq!(groups.len(), 4);
        assert!(groups.iter().all(|g| g.count == 1));
    }

    #[test]
    fn test_group_runs_reuniting_values_form_separate_groups() {
        // A run broken by a different byte must not rejoin.
        let groups = group_runs(&[5, 5, 9, 5]);
        assert_eq!(
            groups,
            vec![
                RunGroup { code: 5, count: 2 },
                RunGroup { code: 9, count: 1 },
                RunGroup { code: 5, count: 1 },
            ]
        );
    }

    // ── decode: resolution and state ──────────────────────────────────────────

    #[test]
    fn test_unknown_code_produces_no_event_and_no_state() {
        let held = HeldStates::new();
        let decoder = make_decoder(&held);

        let events = decoder.decode(&[0xFF]);

        assert!(events.is_empty());
        assert!(!held.is_held(0xFF));
    }

    #[test]
    fn test_unknown_code_between_known_codes_is_dropped() {
        let held = HeldStates::new();
        let decoder = make_decoder(&held);

        let events = decoder.decode(&[0x84, 0xFF, 0xC4]);

        assert_eq!(
            events,
            vec![
                ControlEvent::new("Knob CCW", 1),
                ControlEvent::new("Knob CW", 1),
            ]
        );
    }

    #[test]
    fn test_press_sets_held_and_release_clears_it() {
        let held = HeldStates::new();
        let decoder = make_decoder(&held);

        // C1 press (34): held strictly between press and release.
        let events = decoder.decode(&[34]);
        assert_eq!(events, vec![ControlEvent::new("C1 Press", 1)]);
        assert!(held.is_held(34));

        // C1 release (162): clears the paired press code.
        let events = decoder.decode(&[162]);
        assert_eq!(events, vec![ControlEvent::new("C1 Release", 1)]);
        assert!(!held.is_held(34));
    }

    #[test]
    fn test_repeated_press_bytes_group_into_one_event() {
        // Two identical press bytes: one event with count 2, one held
        // transition (the second byte is absorbed into the run).
        let held = HeldStates::new();
        let decoder = make_decoder(&held);

        let events = decoder.decode(&[34, 34]);

        assert_eq!(events, vec![ControlEvent::new("C1 Press", 2)]);
        assert!(held.is_held(34));
    }

    #[test]
    fn test_release_without_matching_press_still_emits() {
        // Unconditional release emission: the event surfaces even though no
        // press was held, and no state appears for the press code.
        let held = HeldStates::new();
        let decoder = make_decoder(&held);

        let events = decoder.decode(&[162]);

        assert_eq!(events, vec![ControlEvent::new("C1 Release", 1)]);
        assert!(!held.is_held(34));
    }

    #[test]
    fn test_rotational_codes_are_stateless() {
        let held = HeldStates::new();
        let decoder = make_decoder(&held);

        let events = decoder.decode(&[0x89, 0x89, 0xC9]);

        assert_eq!(
            events,
            vec![
                ControlEvent::new("Scroll Down", 2),
                ControlEvent::new("Scroll Up", 1),
            ]
        );
        assert!(!held.is_held(0x89));
        assert!(!held.is_held(0xC9));
    }

    #[test]
    fn test_full_press_hold_release_sequence() {
        // Up press, firmware repeats while held, then release, then an
        // unrelated knob tick — all in one chunk.
        let held = HeldStates::new();
        let decoder = make_decoder(&held);

        let events = decoder.decode(&[16, 16, 16, 144, 132]);

        assert_eq!(
            events,
            vec![
                ControlEvent::new("Up Press", 3),
                ControlEvent::new("Up Release", 1),
                ControlEvent::new("Knob CCW", 1),
            ]
        );
        assert!(!held.is_held(16));
    }

    #[test]
    fn test_two_decoders_share_held_state() {
        // Sessions on the same server share one store: a press decoded by one
        // session is visible to (and clearable by) another.
        let held = HeldStates::new();
        let a = make_decoder(&held);
        let b = make_decoder(&held);

        a.decode(&[55]);
        assert!(held.is_held(55));

        b.decode(&[183]);
        assert!(!held.is_held(55));
    }
}
