//! A minimal disassembler, used only to print the REPL's per-step trace
//! line (spec.md §4.7). It decodes straight off the bit layout in spec.md §3
//! rather than reconstructing [`crate::isa::Instruction`] values, since an
//! assembled [`crate::codegen::assembler::Image`] carries resolved
//! addresses, not labels, by the time the simulator sees it.

use crate::isa::registers::Register;

/// Decode the opcode word at `pc` (and its immediate word, if any) into a
/// mnemonic and a full textual rendering, e.g. `("ldi", "ldi 5")`.
pub fn disassemble(word0: u16, word1: u16) -> (&'static str, String) {
    let opcode = (word0 >> 12) as u8;
    let r = ((word0 >> 8) & 0xF) as u8;
    let reg = Register::from_num(r);
    let imm = (word1 & 0xFF) as u8;

    match opcode {
        0 => ("lda", format!("lda [{reg}]")),
        1 => ("sta", format!("sta [{reg}]")),
        4 => ("ldi", format!("ldi {imm}")),
        5 => {
            let mnemonic = branch_mnemonic(r);
            (mnemonic, format!("{mnemonic} {imm}"))
        }
        6 => ("get", format!("get {reg}")),
        7 => ("set", format!("set {reg}")),
        8 => ("add", format!("add {reg}")),
        9 => ("sub", format!("sub {reg}")),
        10 => ("inc", format!("inc {reg}")),
        11 => ("dec", format!("dec {reg}")),
        12 => ("and", format!("and {reg}")),
        13 => ("or", format!("or {reg}")),
        14 => ("xor", format!("xor {reg}")),
        15 => ("shft", format!("shft {reg}")),
        _ => ("???", format!("<unknown opcode {opcode}>")),
    }
}

fn branch_mnemonic(cond: u8) -> &'static str {
    match cond {
        0 => "b",
        1 => "bz",
        2 => "bnz",
        3 => "bcs",
        4 => "bcc",
        5 => "blt",
        6 => "bge",
        _ => "b?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_register_instruction() {
        let (mnemonic, text) = disassemble(0x8300, 0);
        assert_eq!(mnemonic, "add");
        assert_eq!(text, "add r3");
    }

    #[test]
    fn decodes_two_word_ldi() {
        let (mnemonic, text) = disassemble(0x4000, 42);
        assert_eq!(mnemonic, "ldi");
        assert_eq!(text, "ldi 42");
    }

    #[test]
    fn decodes_conditional_branch() {
        let (mnemonic, text) = disassemble(0x5100, 10);
        assert_eq!(mnemonic, "bz");
        assert_eq!(text, "bz 10");
    }
}
