//! PUC8a register and instruction-set definitions (spec.md §3, §4.1-§4.3).

pub mod registers;
pub mod instruction;
pub mod reloc;

pub use instruction::*;
pub use registers::*;
pub use reloc::*;
