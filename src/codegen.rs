//! The back-end of the PUC8a toolchain: instruction selection, calling
//! convention/frame generation, and assembly (spec.md §4.4-§4.6).

pub mod patterns;
pub mod frame;
pub mod assembler;
pub mod textasm;

pub use assembler::*;
pub use frame::*;
pub use patterns::*;
pub use textasm::*;

use crate::error::Result;
use crate::ir::{Function, Program};
use crate::isa::registers::Register;
use crate::isa::Instruction;

/// Compile one function's body into a linear instruction stream: prologue,
/// the pattern-selected body, epilogue (spec.md §4.5's frame convention).
/// A callee reads its arguments through the fixed convention registers
/// directly (`r11, r10, r9` in, `r0` out) rather than through
/// `Frame::gen_function_enter`/`gen_function_exit` moves, since this
/// backend's statements already reference those registers by name. A caller
/// reaches the same convention through `Stmt::Call`, selected by
/// [`patterns::select_stmt`] into `frame::gen_call`.
pub fn compile_function(f: &Function) -> Result<Vec<Instruction>> {
    let mut frame = Frame::new(f.name, f.stacksize);
    let mut ctx = Codegen::new();
    for stmt in &f.body {
        select_stmt(&mut ctx, stmt)?;
    }
    for inst in &ctx.instructions {
        for reg in registers_touched(inst) {
            frame.mark_used(reg);
        }
    }

    let mut out = gen_prologue(&frame);
    out.extend(ctx.instructions);
    out.extend(gen_epilogue(&frame));
    Ok(out)
}

/// Compile every function in `program` into one concatenated instruction
/// stream, ready for [`assembler::lower_pseudo`] then [`assembler::assemble`].
pub fn compile_program(program: &Program) -> Result<Vec<Instruction>> {
    let mut out = Vec::new();
    for f in &program.functions {
        out.extend(compile_function(f)?);
    }
    Ok(out)
}

fn registers_touched(inst: &Instruction) -> Vec<Register> {
    use Instruction::*;
    match inst {
        Lda(r) | Sta(r) | Get(r) | Set(r) | Add(r) | Sub(r) | Inc(r) | Dec(r) | And(r) | Or(r)
        | Xor(r) | Shft(r) => vec![*r],
        Mov { dst, src } => vec![*dst, *src],
        Ldi(_) | Branch(..) | Label(_) => vec![],
    }
}


#[cfg(test)]
mod compile_tests {
    use super::*;
    use crate::common::id;
    use crate::ir::{BinOp, Expr, Stmt, Type};
    use crate::isa::registers::Register::*;

    #[test]
    fn leaf_function_uses_argument_registers_directly() {
        let f = Function {
            name: id("add3"),
            stacksize: 0,
            params: vec![Type::I8, Type::I8, Type::I8],
            ret: Some(Type::I8),
            body: vec![
                Stmt::Move {
                    dst: R0,
                    src: Expr::Bin(BinOp::Add, Box::new(Expr::Reg(R11)), Box::new(Expr::Reg(R10))),
                },
                Stmt::Move {
                    dst: R0,
                    src: Expr::Bin(BinOp::Add, Box::new(Expr::Reg(R0)), Box::new(Expr::Reg(R9))),
                },
            ],
        };
        let code = compile_function(&f).unwrap();
        assert_eq!(code.first(), Some(&Instruction::Label(f.name)));
        assert_eq!(code.last(), Some(&Instruction::Set(crate::isa::registers::Pc)));
    }

    #[test]
    fn stmt_call_lowers_through_gen_call() {
        let f = Function {
            name: id("caller"),
            stacksize: 0,
            params: vec![],
            ret: None,
            body: vec![Stmt::Call {
                label: id("callee"),
                arg_types: vec![Type::I8],
                args: vec![Expr::Const(1)],
                ret: Some((Type::I8, R0)),
            }],
        };
        let code = compile_function(&f).unwrap();
        assert!(code.contains(&Instruction::Ldi(crate::isa::Imm::Label(id("callee")))));
        assert!(code.contains(&Instruction::Mov {
            dst: crate::isa::registers::Register::R11,
            src: R0
        }));
    }

    #[test]
    fn function_using_callee_saved_register_saves_and_restores_it() {
        let f = Function {
            name: id("uses_r5"),
            stacksize: 0,
            params: vec![],
            ret: None,
            body: vec![Stmt::Move { dst: R5, src: Expr::Const(9) }],
        };
        let code = compile_function(&f).unwrap();
        assert!(code.contains(&Instruction::Sta(crate::isa::registers::Sp)));
    }
}
