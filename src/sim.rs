//! The instruction-level simulator (spec.md §4.7): state, stepper, flag
//! arithmetic, memory-mapped I/O, and the interactive REPL.
//!
//! Grounded on `original_source/puc8a/simulator.py`'s `State`/`Simulator`
//! classes. The Python simulator deep-copies state on every step (Design
//! Notes §9); we instead step functionally, returning a new [`SimState`]
//! rather than mutating in place, which is the idiomatic Rust shape for the
//! same "previous vs. next, diffable" REPL contract.

pub mod disasm;
pub mod repl;
pub mod state;

pub use disasm::*;
pub use repl::*;
pub use state::*;
