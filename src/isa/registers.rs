//! The 16 named registers of the PUC8a register file (spec.md §3, §4.1).
//!
//! Grounded on `original_source/puc8a/ppci/arch/puc8a/registers.py`: 16
//! registers numbered 0..15, with `r12..r15` carrying the aliases `z`, `fp`,
//! `sp`, `pc`. `sp` resets to 255 (spec.md §3) and grows downward.

use derive_more::Display;

/// One of the PUC8a's 16 8-bit registers.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Register {
    #[display("r0")]
    R0,
    #[display("r1")]
    R1,
    #[display("r2")]
    R2,
    #[display("r3")]
    R3,
    #[display("r4")]
    R4,
    #[display("r5")]
    R5,
    #[display("r6")]
    R6,
    #[display("r7")]
    R7,
    #[display("r8")]
    R8,
    #[display("r9")]
    R9,
    #[display("r10")]
    R10,
    #[display("r11")]
    R11,
    /// r12, zero/scratch register.
    #[display("z")]
    Z,
    /// r13, frame pointer.
    #[display("fp")]
    Fp,
    /// r14, stack pointer. Reset to 255.
    #[display("sp")]
    Sp,
    /// r15, program counter.
    #[display("pc")]
    Pc,
}

pub use Register::*;

/// All 16 registers, indexed by register number.
pub static ALL_REGISTERS: [Register; 16] = [
    R0, R1, R2, R3, R4, R5, R6, R7, R8, R9, R10, R11, Z, Fp, Sp, Pc,
];

/// The semantic types a value held in a register may carry. `Ptr` is
/// aliased onto `U8` per spec.md's non-goals (no type wider than 8 bits).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegClass {
    I8,
    U8,
    Ptr,
}

/// The register-allocation pool: `r0..r11`, the twelve general-purpose
/// registers. `z`, `fp`, `sp`, and `pc` are reserved and never allocated to
/// hold IR values.
pub static ALLOC_REGISTERS: [Register; 12] = [
    R0, R1, R2, R3, R4, R5, R6, R7, R8, R9, R10, R11,
];

/// Registers a caller must preserve across a call if still live afterwards.
pub static CALLER_SAVE: [Register; 8] = [R0, R1, R2, R3, R4, R9, R10, R11];

/// Registers a callee must preserve across its body.
pub static CALLEE_SAVE: [Register; 4] = [R5, R6, R7, R8];

/// Argument registers in call order: the first scalar argument goes in
/// `r11`, the second in `r10`, the third in `r9`. At most three scalar
/// arguments are supported (spec.md §4.5).
pub static ARG_REGISTERS: [Register; 3] = [R11, R10, R9];

impl Register {
    /// The register's number, `0..16`, matching the hardware encoding.
    pub fn number(self) -> u8 {
        match self {
            R0 => 0,
            R1 => 1,
            R2 => 2,
            R3 => 3,
            R4 => 4,
            R5 => 5,
            R6 => 6,
            R7 => 7,
            R8 => 8,
            R9 => 9,
            R10 => 10,
            R11 => 11,
            Z => 12,
            Fp => 13,
            Sp => 14,
            Pc => 15,
        }
    }

    /// Look up a register by its number. Panics on an out-of-range number;
    /// the caller is expected to have validated the number already (register
    /// numbers are never parsed directly from untrusted input without a
    /// range check upstream).
    pub fn from_num(num: u8) -> Register {
        ALL_REGISTERS[num as usize]
    }

    pub fn is_callee_saved(self) -> bool {
        CALLEE_SAVE.contains(&self)
    }

    pub fn is_caller_saved(self) -> bool {
        CALLER_SAVE.contains(&self)
    }

    pub fn is_allocatable(self) -> bool {
        ALLOC_REGISTERS.contains(&self)
    }

    /// Parse a register's textual name (`"r0"`, `"fp"`, ...), the inverse of
    /// its `Display` impl. Used by the textual assembly line parser.
    pub fn from_mnemonic(s: &str) -> Option<Register> {
        ALL_REGISTERS.iter().copied().find(|r| r.to_string() == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_round_trips() {
        for r in ALL_REGISTERS {
            assert_eq!(Register::from_num(r.number()), r);
        }
    }

    #[test]
    fn mnemonic_round_trips() {
        for r in ALL_REGISTERS {
            assert_eq!(Register::from_mnemonic(&r.to_string()), Some(r));
        }
        assert_eq!(Register::from_mnemonic("bogus"), None);
    }

    #[test]
    fn fixed_roles() {
        assert_eq!(Sp.number(), 14);
        assert_eq!(Pc.number(), 15);
        assert_eq!(ARG_REGISTERS, [R11, R10, R9]);
    }
}
