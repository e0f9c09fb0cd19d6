//! Calling convention and stack-frame code generation (spec.md §4.5).
//!
//! Grounded directly on `PUC8aArch.gen_prologue`/`gen_epilogue`/`gen_call`/
//! `gen_function_enter`/`gen_function_exit`/`push`/`pop` in
//! `original_source/puc8a/ppci/arch/puc8a/arch.py`.

use std::collections::HashSet;

use crate::common::Id;
use crate::error::{Puc8aError, Result};
use crate::ir::Type;
use crate::isa::registers::{Register, ARG_REGISTERS, CALLEE_SAVE, Fp, Pc, Sp};
use crate::isa::{Imm, Instruction};

/// Per-function frame descriptor (spec.md §3 "Frame").
pub struct Frame {
    pub name: Id,
    /// Size of the local-variable area in bytes. Zero for a leaf function
    /// with no locals and no register spills.
    pub stacksize: u32,
    used: HashSet<Register>,
}

impl Frame {
    pub fn new(name: Id, stacksize: u32) -> Frame {
        Frame { name, stacksize, used: HashSet::new() }
    }

    /// Record that `reg` is referenced somewhere in the function body, so
    /// the prologue/epilogue know to save/restore it if it's callee-saved.
    pub fn mark_used(&mut self, reg: Register) {
        self.used.insert(reg);
    }

    pub fn is_used(&self, reg: Register) -> bool {
        self.used.contains(&reg)
    }

    fn callee_saved(&self) -> Vec<Register> {
        CALLEE_SAVE.iter().copied().filter(|r| self.is_used(*r)).collect()
    }
}

/// `get reg ; sta [sp] ; dec sp`: push `reg` onto the stack.
pub fn push(reg: Register, out: &mut Vec<Instruction>) {
    out.push(Instruction::Get(reg));
    out.push(Instruction::Sta(Sp));
    out.push(Instruction::Dec(Sp));
}

/// `inc sp ; lda [sp] ; set reg`: pop the top of the stack into `reg`.
pub fn pop(reg: Register, out: &mut Vec<Instruction>) {
    out.push(Instruction::Inc(Sp));
    out.push(Instruction::Lda(Sp));
    out.push(Instruction::Set(reg));
}

fn mov(dst: Register, src: Register, out: &mut Vec<Instruction>) {
    out.push(Instruction::Mov { dst, src });
}

/// Emit the function label, callee-saved pushes, and (if the function has
/// locals) the frame-pointer setup.
pub fn gen_prologue(frame: &Frame) -> Vec<Instruction> {
    let mut out = vec![Instruction::Label(frame.name)];

    for reg in frame.callee_saved() {
        push(reg, &mut out);
    }

    if frame.stacksize > 0 {
        push(Fp, &mut out);
        mov(Fp, Sp, &mut out);
        for _ in 0..frame.stacksize {
            out.push(Instruction::Dec(Sp));
        }
    }

    out
}

/// Emit the mirror image of [`gen_prologue`], ending in `pop pc` (the
/// function's return).
pub fn gen_epilogue(frame: &Frame) -> Vec<Instruction> {
    let mut out = Vec::new();

    if frame.stacksize > 0 {
        for _ in 0..frame.stacksize {
            out.push(Instruction::Inc(Sp));
        }
        pop(Fp, &mut out);
    }

    for reg in frame.callee_saved().into_iter().rev() {
        pop(reg, &mut out);
    }

    pop(Pc, &mut out);
    out
}

/// Assign scalar call arguments to `r11, r10, r9` in left-to-right order
/// (spec.md §4.5). More than three scalar arguments, or any non-scalar
/// argument, is unsupported.
pub fn determine_arg_locations(arg_types: &[Type]) -> Result<Vec<Register>> {
    if arg_types.len() > ARG_REGISTERS.len() {
        return Err(Puc8aError::UnsupportedOperation(format!(
            "{} arguments (at most {} scalar arguments are supported)",
            arg_types.len(),
            ARG_REGISTERS.len()
        )));
    }
    arg_types
        .iter()
        .zip(ARG_REGISTERS)
        .map(|(ty, reg)| match ty {
            Type::I8 | Type::U8 | Type::Ptr => Ok(reg),
            Type::Wider(bits) => {
                Err(Puc8aError::UnsupportedType(format!("{bits}-bit argument")))
            }
        })
        .collect()
}

pub fn determine_rv_location(ret_type: Type) -> Result<Register> {
    match ret_type {
        Type::I8 | Type::U8 | Type::Ptr => Ok(Register::R0),
        Type::Wider(bits) => Err(Puc8aError::UnsupportedType(format!("{bits}-bit return value"))),
    }
}

/// Emit the call sequence for `call label(args) -> rv`.
///
/// `args` are the registers already holding each argument value (in IR
/// order); `ret` is the destination register for the return value, if any.
pub fn gen_call(
    label: Id,
    arg_types: &[Type],
    arg_values: &[Register],
    ret: Option<(Type, Register)>,
) -> Result<Vec<Instruction>> {
    let arg_locs = determine_arg_locations(arg_types)?;
    let mut out = Vec::new();

    for (loc, value) in arg_locs.iter().zip(arg_values) {
        mov(*loc, *value, &mut out);
    }

    // Synthesize the return address: 6 is the offset in encoded words from
    // this instruction to the first instruction after the call sequence.
    out.push(Instruction::Ldi(Imm::Const(6)));
    out.push(Instruction::Add(Pc));
    out.push(Instruction::Sta(Sp));
    out.push(Instruction::Dec(Sp));
    out.push(Instruction::Ldi(Imm::Label(label)));
    out.push(Instruction::Set(Pc));

    if let Some((ret_type, dst)) = ret {
        let rv_loc = determine_rv_location(ret_type)?;
        mov(dst, rv_loc, &mut out);
    }

    Ok(out)
}

/// Emit the argument-receiving code at function entry: move each argument
/// out of its fixed register into the register the body expects it in.
pub fn gen_function_enter(arg_types: &[Type], dsts: &[Register]) -> Result<Vec<Instruction>> {
    let arg_locs = determine_arg_locations(arg_types)?;
    let mut out = Vec::new();
    for (loc, dst) in arg_locs.iter().zip(dsts) {
        mov(*dst, *loc, &mut out);
    }
    Ok(out)
}

/// Emit the code that moves the return value into `r0` before the epilogue
/// runs.
pub fn gen_function_exit(rv: Option<(Type, Register)>) -> Result<Vec<Instruction>> {
    let mut out = Vec::new();
    if let Some((ret_type, src)) = rv {
        let rv_loc = determine_rv_location(ret_type)?;
        mov(rv_loc, src, &mut out);
    }
    Ok(out)
}

/// A leaf function with `stacksize == 0` and no callee-saved register use
/// emits exactly `label: ; pop pc` (spec.md §8, "Calling convention").
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id;

    #[test]
    fn leaf_function_prologue_epilogue() {
        let frame = Frame::new(id("leaf"), 0);
        let prologue = gen_prologue(&frame);
        assert_eq!(prologue, vec![Instruction::Label(frame.name)]);

        let epilogue = gen_epilogue(&frame);
        let mut expected = Vec::new();
        pop(Pc, &mut expected);
        assert_eq!(epilogue, expected);
    }

    #[test]
    fn three_arg_call_uses_r11_r10_r9() {
        let types = vec![Type::I8, Type::I8, Type::I8];
        let locs = determine_arg_locations(&types).unwrap();
        assert_eq!(locs, vec![Register::R11, Register::R10, Register::R9]);
    }

    #[test]
    fn fourth_argument_is_unsupported() {
        let types = vec![Type::I8, Type::I8, Type::I8, Type::I8];
        assert!(determine_arg_locations(&types).is_err());
    }

    #[test]
    fn wide_argument_is_unsupported_type() {
        let types = vec![Type::Wider(16)];
        let err = determine_arg_locations(&types).unwrap_err();
        assert!(matches!(err, Puc8aError::UnsupportedType(_)));
    }

    /// `ldi 6; add pc; sta [sp]; dec sp; ldi @label; set pc` (spec.md §4.5),
    /// preceded by the argument moves and followed by the return-value move.
    #[test]
    fn gen_call_emits_the_spec_sequence() {
        let label = id("add3");
        let code = gen_call(
            label,
            &[Type::I8, Type::I8],
            &[Register::R3, Register::R4],
            Some((Type::I8, Register::R5)),
        )
        .unwrap();

        assert_eq!(
            code,
            vec![
                Instruction::Mov { dst: Register::R11, src: Register::R3 },
                Instruction::Mov { dst: Register::R10, src: Register::R4 },
                Instruction::Ldi(Imm::Const(6)),
                Instruction::Add(Pc),
                Instruction::Sta(Sp),
                Instruction::Dec(Sp),
                Instruction::Ldi(Imm::Label(label)),
                Instruction::Set(Pc),
                Instruction::Mov { dst: Register::R5, src: Register::R0 },
            ]
        );
    }

    #[test]
    fn gen_call_with_no_return_value_omits_the_trailing_move() {
        let label = id("log");
        let code = gen_call(label, &[Type::U8], &[Register::R0], None).unwrap();

        assert_eq!(
            code,
            vec![
                Instruction::Mov { dst: Register::R11, src: Register::R0 },
                Instruction::Ldi(Imm::Const(6)),
                Instruction::Add(Pc),
                Instruction::Sta(Sp),
                Instruction::Dec(Sp),
                Instruction::Ldi(Imm::Label(label)),
                Instruction::Set(Pc),
            ]
        );
    }

    #[test]
    fn gen_function_enter_moves_args_out_of_convention_registers() {
        let code =
            gen_function_enter(&[Type::I8, Type::I8], &[Register::R3, Register::R4]).unwrap();
        assert_eq!(
            code,
            vec![
                Instruction::Mov { dst: Register::R3, src: Register::R11 },
                Instruction::Mov { dst: Register::R4, src: Register::R10 },
            ]
        );
    }

    #[test]
    fn gen_function_exit_moves_return_value_into_r0() {
        let code = gen_function_exit(Some((Type::I8, Register::R6))).unwrap();
        assert_eq!(code, vec![Instruction::Mov { dst: Register::R0, src: Register::R6 }]);

        assert_eq!(gen_function_exit(None).unwrap(), Vec::new());
    }
}
