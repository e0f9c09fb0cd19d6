//! Error kinds for the PUC8a backend and simulator (spec.md §7).
//!
//! Modeled the way `front::parse::ParseError` and `front::lex::LexError` are
//! in the teacher crate this backend grew out of: a plain `Display` impl via
//! `derive_more`, with `Debug` delegating to it so `.unwrap()` in tests and
//! `?` in `main` both print something readable.

use derive_more::Display;

#[derive(Display)]
pub enum Puc8aError {
    /// The front-end presented a type wider than 8 bits in a calling
    /// position, or any other type codegen cannot represent.
    #[display("unsupported type: {_0}")]
    UnsupportedType(String),
    /// A pattern's guard failed for all candidates (e.g. multiply by a
    /// non-power-of-two constant, or a call with more than three arguments).
    #[display("unsupported operation: {_0}")]
    UnsupportedOperation(String),
    /// The simulator decoded an opcode that has no defined semantics.
    #[display("unknown opcode: {_0}")]
    UnknownOpcode(u8),
    /// A malformed textual-assembly line or REPL command.
    #[display("parse error: {_0}")]
    ParseError(String),
}

impl std::fmt::Debug for Puc8aError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for Puc8aError {}

pub type Result<T> = std::result::Result<T, Puc8aError>;
