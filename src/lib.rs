//! Code-generation backend and instruction-level simulator for the PUC8a,
//! an 8-bit accumulator-based educational processor.
//!
//! This crate consumes an already-lowered three-address IR (see [`ir`]),
//! selects and emits PUC8a instructions (see [`codegen`]), assembles them
//! into a bit-exact encoded image, and executes that image on a
//! cycle-accurate interpreter (see [`sim`]).
//!
//! See `src/bin` for the `as-puc8a`, `cc-puc8a`, and `puc8a-sim` executables
//! built on top of this library.

pub mod common;
pub mod error;
pub mod isa;
pub mod ir;
pub mod codegen;
pub mod sim;

pub use error::Puc8aError;
