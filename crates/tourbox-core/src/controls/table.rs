//! The TourBox control code table.
//!
//! Every byte the console emits is one of 34 fixed codes.  Stateful controls
//! (buttons) use a press/release pair: the release code is always the press
//! code with the high bit set (`press | 0x80`).  Rotational controls (knob,
//! dial, scroll wheel) have no pairing; each byte is one tick of rotation.
//!
//! The table is fixed at compile time and never mutated.  [`ControlTable`]
//! builds three lookups over it at construction:
//!
//! - code → definition (resolution of decoded bytes),
//! - name → code (the `is_held("C1")` query surface),
//! - release code → press code (clearing held state in O(1) instead of
//!   scanning the table for the matching pair).

use std::collections::HashMap;
use std::sync::OnceLock;

/// Classification of a control code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// Button going down.  Sets held state for its own code.
    Press,
    /// Button coming back up.  Clears held state for its paired press code.
    Release,
    /// One tick of a knob/dial/scroll rotation.  Stateless.
    Rotational,
}

/// One entry of the control table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlDef {
    /// The protocol byte value.
    pub code: u8,
    /// Human-readable control name, e.g. `"C1 Press"` or `"Knob CW"`.
    pub name: &'static str,
    pub kind: ControlKind,
    /// For a press code, the release code that ends the hold; for a release
    /// code, the press code it clears.  `None` for rotational controls.
    pub paired_code: Option<u8>,
}

/// The complete set of codes a TourBox console emits.
///
/// Press/release pairs point at each other; rotational codes stand alone.
const CONTROL_DEFS: &[ControlDef] = &[
    // Rotational controls (one byte per tick, no held state)
    def(132, "Knob CCW", ControlKind::Rotational, None),
    def(196, "Knob CW", ControlKind::Rotational, None),
    def(137, "Scroll Down", ControlKind::Rotational, None),
    def(201, "Scroll Up", ControlKind::Rotational, None),
    def(143, "Dial CCW", ControlKind::Rotational, None),
    def(207, "Dial CW", ControlKind::Rotational, None),
    // Knob / dial / scroll wheel pressed as buttons
    def(55, "Knob Press", ControlKind::Press, Some(183)),
    def(183, "Knob Release", ControlKind::Release, Some(55)),
    def(56, "Dial Press", ControlKind::Press, Some(184)),
    def(184, "Dial Release", ControlKind::Release, Some(56)),
    def(10, "Scroll Press", ControlKind::Press, Some(138)),
    def(138, "Scroll Release", ControlKind::Release, Some(10)),
    // D-pad
    def(16, "Up Press", ControlKind::Press, Some(144)),
    def(144, "Up Release", ControlKind::Release, Some(16)),
    def(17, "Down Press", ControlKind::Press, Some(145)),
    def(145, "Down Release", ControlKind::Release, Some(17)),
    def(18, "Left Press", ControlKind::Press, Some(146)),
    def(146, "Left Release", ControlKind::Release, Some(18)),
    def(19, "Right Press", ControlKind::Press, Some(147)),
    def(147, "Right Release", ControlKind::Release, Some(19)),
    // Side buttons
    def(0, "Tall Press", ControlKind::Press, Some(128)),
    def(128, "Tall Release", ControlKind::Release, Some(0)),
    def(1, "Side Press", ControlKind::Press, Some(129)),
    def(129, "Side Release", ControlKind::Release, Some(1)),
    def(2, "Top Press", ControlKind::Press, Some(130)),
    def(130, "Top Release", ControlKind::Release, Some(2)),
    def(3, "Short Press", ControlKind::Press, Some(131)),
    def(131, "Short Release", ControlKind::Release, Some(3)),
    // Tour button
    def(42, "Tour Press", ControlKind::Press, Some(170)),
    def(170, "Tour Release", ControlKind::Release, Some(42)),
    // C1/C2 buttons
    def(34, "C1 Press", ControlKind::Press, Some(162)),
    def(162, "C1 Release", ControlKind::Release, Some(34)),
    def(35, "C2 Press", ControlKind::Press, Some(163)),
    def(163, "C2 Release", ControlKind::Release, Some(35)),
];

const fn def(
    code: u8,
    name: &'static str,
    kind: ControlKind,
    paired_code: Option<u8>,
) -> ControlDef {
    ControlDef {
        code,
        name,
        kind,
        paired_code,
    }
}

/// Lookup structure over [`CONTROL_DEFS`].
///
/// Construction is cheap; most callers use the shared instance from
/// [`ControlTable::global`].
#[derive(Debug)]
pub struct ControlTable {
    by_code: HashMap<u8, ControlDef>,
    code_by_name: HashMap<&'static str, u8>,
    press_by_release: HashMap<u8, u8>,
}

impl ControlTable {
    pub fn new() -> Self {
        let mut by_code = HashMap::with_capacity(CONTROL_DEFS.len());
        let mut code_by_name = HashMap::with_capacity(CONTROL_DEFS.len());
        let mut press_by_release = HashMap::new();

        for d in CONTROL_DEFS {
            by_code.insert(d.code, *d);
            code_by_name.insert(d.name, d.code);
            if d.kind == ControlKind::Press {
                if let Some(release) = d.paired_code {
                    press_by_release.insert(release, d.code);
                }
            }
        }

        Self {
            by_code,
            code_by_name,
            press_by_release,
        }
    }

    /// Returns the process-wide read-only table.
    pub fn global() -> &'static ControlTable {
        static TABLE: OnceLock<ControlTable> = OnceLock::new();
        TABLE.get_or_init(ControlTable::new)
    }

    /// Looks up the definition for a protocol byte.  `None` means the byte is
    /// not a known control code and must be dropped by the decoder.
    pub fn get(&self, code: u8) -> Option<&ControlDef> {
        self.by_code.get(&code)
    }

    /// Exact name → code lookup.
    pub fn code_for(&self, name: &str) -> Option<u8> {
        self.code_by_name.get(name).copied()
    }

    /// Name → code lookup for held-state queries.
    ///
    /// Tries the exact name first, then retries with `" Press"` appended so
    /// callers can query by base label (`"C1"` resolves to the `"C1 Press"`
    /// code).  Returns `None` for names that match neither way.
    pub fn resolve_name(&self, name: &str) -> Option<u8> {
        self.code_for(name)
            .or_else(|| self.code_for(&format!("{name} Press")))
    }

    /// Returns the press code whose hold a given release code ends.
    pub fn press_for_release(&self, release_code: u8) -> Option<u8> {
        self.press_by_release.get(&release_code).copied()
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl Default for ControlTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
