//! Control definitions: the fixed mapping from protocol bytes to named controls.

pub mod table;

pub use table::{ControlDef, ControlKind, ControlTable};
