//! The lowered three-address IR this backend consumes (spec.md §1, §4.4).
//!
//! Producing this IR (parsing C, applying optimizations) is an external
//! front-end's job and out of scope (spec.md §1); what's in scope is the
//! shape of the tree the pattern set in [`crate::codegen::patterns`]
//! matches against. Grounded on `middle::tir` in the teacher crate (a flat
//! `Instruction`/`Terminator` IR for a much simpler source language) and the
//! tree shapes named throughout
//! `original_source/puc8a/ppci/arch/puc8a/instructions.py`'s `@isa.pattern`
//! decorators (`ADDI8`, `CONSTU8`, `FPRELU8`, `CJMPU8`, ...).

use crate::common::Id;
use crate::isa::Register;

pub mod parse;
pub use parse::parse_program;

/// IR-level scalar types. Only `I8`/`U8`/`Ptr` are legal in codegen-visible
/// positions (spec.md's non-goals: wider types are the front-end's problem);
/// `Wider` exists purely so an illegal call argument can be represented and
/// rejected with [`crate::Puc8aError::UnsupportedType`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Type {
    I8,
    U8,
    /// Aliased onto `U8` for codegen purposes (spec.md §3).
    Ptr,
    /// A type wider than 8 bits reached a calling position; always rejected.
    Wider(u16),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// An already-tiled-leaf-aware expression tree. `Reg` is a leaf standing for
/// a value some earlier tile already placed in a register (spec.md §4.4's
/// `REGI8`/`REGU8`); every other variant is an interior tile the pattern set
/// knows how to cover.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    /// `REGI8`/`REGU8`: a value already resident in a register.
    Reg(Register),
    /// `CONSTI8`/`CONSTU8`.
    Const(u8),
    /// `LABEL`: the address of a global symbol.
    Label(Id),
    /// `FPRELU8`: a frame-pointer-relative address at offset `k` (the IR's
    /// negative-for-spill convention; `-1` denotes the saved previous frame
    /// pointer, stored at `fp` itself).
    FpRel(i32),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    /// `MULU8(reg, CONST)`: multiply by a constant. Only `0`, `1`, and
    /// powers of two are supported (spec.md §4.4); anything else is an
    /// `UnsupportedOperation`.
    Mul(Box<Expr>, u32),
    /// `SHLI8`/`SHLU8(reg, CONST)`: left shift by a constant count.
    Shl(Box<Expr>, u32),
    /// `SHRI8`/`SHRU8(reg, CONST)`: right shift by a constant count.
    Shr(Box<Expr>, u32),
    /// `NEGI8(reg)`.
    Neg(Box<Expr>),
    /// `INVI8`/`INVU8(reg)`: bitwise complement.
    Inv(Box<Expr>),
    /// `LDRI8`/`LDRU8(reg)`: load the byte at the address held in `reg`.
    Load(Box<Expr>),
    /// `I8TOU8`/`U8TOI8(reg)`: a no-op reinterpretation, since both types
    /// share the same 8-bit representation.
    Cast(Box<Expr>),
}

/// A statement tile (spec.md's `"stm"` pattern category).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Stmt {
    /// `STRI8`/`STRU8(addr, val)`.
    Store { addr: Expr, val: Expr },
    /// `MOVI8`/`MOVU8(reg)`: move the evaluated expression into `dst`,
    /// flagged as a coalescable move for the (external) allocator.
    Move { dst: Register, src: Expr },
    /// Binds a symbolic name to the address of the next statement in this
    /// function's body, the jump target `Jump`/`CJump` refer to. Not one of
    /// the tile shapes in `original_source/puc8a/ppci/arch/puc8a/instructions.py`
    /// (that IR tracks labels at the basic-block level instead); added here
    /// so a flat `Vec<Stmt>` body can still express internal control flow.
    Label(Id),
    /// `JMP`: unconditional jump to a label.
    Jump(Id),
    /// `CJMPI8`/`CJMPU8(reg, reg)`: compare `lhs` and `rhs` and branch to
    /// `yes` or `no`. Signed comparisons only support `Eq`/`Ne` (spec.md
    /// §4.4); anything else on a `Signed` comparison is an
    /// `UnsupportedOperation`.
    CJump {
        signedness: Signedness,
        op: CmpOp,
        lhs: Expr,
        rhs: Expr,
        yes: Id,
        no: Id,
    },
    /// `call label(args) -> ret`: the calling-convention call sequence
    /// (spec.md §4.5), lowered through `codegen::frame::gen_call`. `args` are
    /// evaluated left to right and moved into the fixed argument registers;
    /// `ret` names the destination register and type for the return value,
    /// if any.
    Call {
        label: Id,
        arg_types: Vec<Type>,
        args: Vec<Expr>,
        ret: Option<(Type, Register)>,
    },
}

/// A function body: a flat list of statements (no explicit basic-block
/// structure — branches/labels inside the pattern-emitted stream carry that
/// information once lowered, matching how `JMP`/`CJMP` targets are plain
/// labels rather than block references).
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Id,
    /// Frame size in bytes (spec.md §3 "Frame"). Zero for leaf functions
    /// with no locals and no spills.
    pub stacksize: u32,
    /// Parameter types, left-to-right, for call-site argument placement
    /// (spec.md §4.5). At most three scalar parameters are supported.
    pub params: Vec<Type>,
    /// Return type, if the function produces a value in `r0`.
    pub ret: Option<Type>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}
