//! A small hand-written line parser for our own textual assembly syntax
//! (spec.md §4.2, §4.6), used only by `as-puc8a`. One mnemonic per line,
//! matching [`crate::isa::Instruction`]'s `Display` syntax exactly, plus
//! labels written as `name:`.
//!
//! Grounded on the teacher's `front::lex::Lexer`: a whitespace/comment
//! skipper plus a table of regexes, one per token shape, rather than a
//! hand-rolled character-by-character scanner. This is not the general
//! macro-assembler grammar generator (out of scope, spec.md §1) — just
//! enough syntax to round-trip what [`Instruction::Display`] prints.

use regex::Regex;

use crate::common::id;
use crate::error::{Puc8aError, Result};
use crate::isa::registers::Register;
use crate::isa::{Cond, Imm, Instruction};

struct Matchers {
    label: Regex,
    bracket_reg: Regex,
    reg: Regex,
    label_ref: Regex,
    number: Regex,
}

fn matchers() -> Matchers {
    Matchers {
        label: Regex::new(r"^(?P<name>[A-Za-z_][A-Za-z0-9_]*):$").unwrap(),
        bracket_reg: Regex::new(r"^\[(?P<reg>[a-z0-9]+)\]$").unwrap(),
        reg: Regex::new(r"^[a-z0-9]+$").unwrap(),
        label_ref: Regex::new(r"^@(?P<name>[A-Za-z_][A-Za-z0-9_]*)$").unwrap(),
        number: Regex::new(r"^-?[0-9]+$").unwrap(),
    }
}

/// Parse `src` into a (still-`mov`-bearing) instruction stream, ready for
/// [`crate::codegen::assembler::lower_pseudo`] and then [`crate::codegen::assembler::assemble`].
pub fn parse_assembly(src: &str) -> Result<Vec<Instruction>> {
    let m = matchers();
    let mut out = Vec::new();

    for (lineno, raw_line) in src.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = m.label.captures(line) {
            out.push(Instruction::Label(id(&caps["name"])));
            continue;
        }

        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, tail.trim()),
            None => (line, ""),
        };

        out.push(parse_instruction(&m, lineno + 1, mnemonic, rest)?);
    }

    Ok(out)
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_instruction(m: &Matchers, lineno: usize, mnemonic: &str, rest: &str) -> Result<Instruction> {
    let err = |msg: String| Puc8aError::ParseError(format!("line {lineno}: {msg}"));

    let parse_bracket_reg = |s: &str| -> Result<Register> {
        let caps = m
            .bracket_reg
            .captures(s)
            .ok_or_else(|| err(format!("expected '[reg]', found '{s}'")))?;
        parse_reg(m, &caps["reg"]).map_err(|_| err(format!("unknown register '{}'", &caps["reg"])))
    };

    match mnemonic {
        "lda" => Ok(Instruction::Lda(parse_bracket_reg(rest)?)),
        "sta" => Ok(Instruction::Sta(parse_bracket_reg(rest)?)),
        "ldi" => Ok(Instruction::Ldi(parse_imm(m, rest).map_err(|_| {
            err(format!("expected an integer or '@label', found '{rest}'"))
        })?)),
        "mov" => {
            let (dst, src) = rest
                .split_once(',')
                .ok_or_else(|| err(format!("expected 'mov dst, src', found 'mov {rest}'")))?;
            let dst = parse_reg(m, dst.trim())
                .map_err(|_| err(format!("unknown register '{}'", dst.trim())))?;
            let src = parse_reg(m, src.trim())
                .map_err(|_| err(format!("unknown register '{}'", src.trim())))?;
            Ok(Instruction::Mov { dst, src })
        }
        "get" => Ok(Instruction::Get(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "set" => Ok(Instruction::Set(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "add" => Ok(Instruction::Add(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "sub" => Ok(Instruction::Sub(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "inc" => Ok(Instruction::Inc(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "dec" => Ok(Instruction::Dec(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "and" => Ok(Instruction::And(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "or" => Ok(Instruction::Or(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "xor" => Ok(Instruction::Xor(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        "shft" => Ok(Instruction::Shft(parse_reg(m, rest).map_err(|_| unknown_reg(err, rest))?)),
        _ => {
            if let Some(cond) = Cond::from_mnemonic(mnemonic) {
                let imm = parse_imm(m, rest).map_err(|_| {
                    err(format!("expected an integer or '@label', found '{rest}'"))
                })?;
                Ok(Instruction::Branch(cond, imm))
            } else {
                Err(err(format!("unknown mnemonic '{mnemonic}'")))
            }
        }
    }
}

fn unknown_reg(err: impl Fn(String) -> Puc8aError, rest: &str) -> Puc8aError {
    err(format!("unknown register '{rest}'"))
}

fn parse_reg(m: &Matchers, s: &str) -> std::result::Result<Register, ()> {
    if !m.reg.is_match(s) {
        return Err(());
    }
    Register::from_mnemonic(s).ok_or(())
}

fn parse_imm(m: &Matchers, s: &str) -> std::result::Result<Imm, ()> {
    if let Some(caps) = m.label_ref.captures(s) {
        return Ok(Imm::Label(id(&caps["name"])));
    }
    if m.number.is_match(s) {
        let v: i32 = s.parse().map_err(|_| ())?;
        return Ok(Imm::Const((v.rem_euclid(256)) as u8));
    }
    Err(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::registers::Register::*;

    #[test]
    fn parses_labels_and_plain_instructions() {
        let src = "loop:\nget r0\nadd r1\nset r2\n";
        let program = parse_assembly(src).unwrap();
        assert_eq!(
            program,
            vec![
                Instruction::Label(id("loop")),
                Instruction::Get(R0),
                Instruction::Add(R1),
                Instruction::Set(R2),
            ]
        );
    }

    #[test]
    fn parses_ldi_and_branch_with_label_operand() {
        let src = "ldi @loop\nbz @loop\n";
        let program = parse_assembly(src).unwrap();
        assert_eq!(
            program,
            vec![
                Instruction::Ldi(Imm::Label(id("loop"))),
                Instruction::Branch(Cond::Zero, Imm::Label(id("loop"))),
            ]
        );
    }

    #[test]
    fn parses_mov_and_memory_ops() {
        let src = "mov r0, r1\nlda [r2]\nsta [r3]\n";
        let program = parse_assembly(src).unwrap();
        assert_eq!(
            program,
            vec![
                Instruction::Mov { dst: R0, src: R1 },
                Instruction::Lda(R2),
                Instruction::Sta(R3),
            ]
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let src = "// a comment\nget r0 // trailing comment\n\n";
        let program = parse_assembly(src).unwrap();
        assert_eq!(program, vec![Instruction::Get(R0)]);
    }

    #[test]
    fn rejects_unknown_mnemonic() {
        assert!(parse_assembly("frobnicate r0\n").is_err());
    }
}
