//! A small S-expression reader for the textual lowered-IR format `cc-puc8a`
//! accepts, standing in for the out-of-scope C front-end's own output
//! format (spec.md §1, §6). Not a general IR serialization format: just
//! enough syntax to build the [`Program`]s this backend already knows how
//! to pattern-match.
//!
//! One function per `(func ...)` form:
//!
//! ```text
//! (func add3 (i8 i8 i8) i8 0
//!   (move r0 (bin add (reg r11) (reg r10)))
//!   (move r0 (bin add (reg r0) (reg r9)))
//!   (jump done)
//!   (label done))
//! ```

use crate::common::id;
use crate::error::{Puc8aError, Result};
use crate::ir::{BinOp, CmpOp, Expr, Function, Program, Signedness, Stmt, Type};
use crate::isa::registers::Register;

#[derive(Debug)]
enum Sexpr {
    Atom(String),
    List(Vec<Sexpr>),
}

fn tokenize(src: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_sexpr(tokens: &[String], pos: &mut usize) -> Result<Sexpr> {
    let err = || Puc8aError::ParseError("unexpected end of input".to_string());
    let tok = tokens.get(*pos).ok_or_else(err)?;
    if tok == "(" {
        *pos += 1;
        let mut items = Vec::new();
        loop {
            match tokens.get(*pos) {
                Some(t) if t == ")" => {
                    *pos += 1;
                    break;
                }
                Some(_) => items.push(parse_sexpr(tokens, pos)?),
                None => return Err(err()),
            }
        }
        Ok(Sexpr::List(items))
    } else if tok == ")" {
        Err(Puc8aError::ParseError("unexpected ')'".to_string()))
    } else {
        *pos += 1;
        Ok(Sexpr::Atom(tok.clone()))
    }
}

fn parse_all(src: &str) -> Result<Vec<Sexpr>> {
    let tokens = tokenize(src);
    let mut pos = 0;
    let mut forms = Vec::new();
    while pos < tokens.len() {
        forms.push(parse_sexpr(&tokens, &mut pos)?);
    }
    Ok(forms)
}

/// Parse a whole program: a sequence of top-level `(func ...)` forms.
pub fn parse_program(src: &str) -> Result<Program> {
    let forms = parse_all(src)?;
    let functions = forms.iter().map(parse_function).collect::<Result<Vec<_>>>()?;
    Ok(Program { functions })
}

fn expect_list<'a>(s: &'a Sexpr, what: &str) -> Result<&'a [Sexpr]> {
    match s {
        Sexpr::List(items) => Ok(items),
        Sexpr::Atom(a) => Err(Puc8aError::ParseError(format!("expected {what}, found atom '{a}'"))),
    }
}

fn expect_atom<'a>(s: &'a Sexpr, what: &str) -> Result<&'a str> {
    match s {
        Sexpr::Atom(a) => Ok(a),
        Sexpr::List(_) => Err(Puc8aError::ParseError(format!("expected {what}, found a list"))),
    }
}

fn parse_type(s: &str) -> Result<Type> {
    match s {
        "i8" => Ok(Type::I8),
        "u8" => Ok(Type::U8),
        "ptr" => Ok(Type::Ptr),
        _ => {
            let bits: u16 = s
                .strip_prefix('u')
                .or_else(|| s.strip_prefix('i'))
                .and_then(|b| b.parse().ok())
                .ok_or_else(|| Puc8aError::ParseError(format!("unknown type '{s}'")))?;
            Ok(Type::Wider(bits))
        }
    }
}

fn parse_function(s: &Sexpr) -> Result<Function> {
    let items = expect_list(s, "a (func ...) form")?;
    let head = items.first().map(|s| expect_atom(s, "'func'")).transpose()?;
    if head != Some("func") {
        return Err(Puc8aError::ParseError("expected a form starting with 'func'".to_string()));
    }
    if items.len() < 5 {
        return Err(Puc8aError::ParseError(
            "expected (func name (params...) ret stacksize body...)".to_string(),
        ));
    }
    let name = id(expect_atom(&items[1], "a function name")?);
    let params = expect_list(&items[2], "a parameter-type list")?
        .iter()
        .map(|t| parse_type(expect_atom(t, "a type")?))
        .collect::<Result<Vec<_>>>()?;
    let ret = match expect_atom(&items[3], "a return type or 'none'")? {
        "none" => None,
        ty => Some(parse_type(ty)?),
    };
    let stacksize: u32 = expect_atom(&items[4], "a stack size")?
        .parse()
        .map_err(|_| Puc8aError::ParseError("expected an integer stack size".to_string()))?;
    let body = items[5..].iter().map(parse_stmt).collect::<Result<Vec<_>>>()?;

    Ok(Function { name, stacksize, params, ret, body })
}

fn parse_reg(s: &str) -> Result<Register> {
    Register::from_mnemonic(s).ok_or_else(|| Puc8aError::ParseError(format!("unknown register '{s}'")))
}

fn parse_stmt(s: &Sexpr) -> Result<Stmt> {
    let items = expect_list(s, "a statement form")?;
    let head = expect_atom(items.first().ok_or_else(|| {
        Puc8aError::ParseError("empty statement form".to_string())
    })?, "a statement keyword")?;

    match head {
        "store" => {
            let addr = parse_expr(&items[1])?;
            let val = parse_expr(&items[2])?;
            Ok(Stmt::Store { addr, val })
        }
        "move" => {
            let dst = parse_reg(expect_atom(&items[1], "a destination register")?)?;
            let src = parse_expr(&items[2])?;
            Ok(Stmt::Move { dst, src })
        }
        "jump" => Ok(Stmt::Jump(id(expect_atom(&items[1], "a label")?))),
        "label" => Ok(Stmt::Label(id(expect_atom(&items[1], "a label")?))),
        "call" => {
            let label = id(expect_atom(&items[1], "a call target label")?);
            let arg_types = expect_list(&items[2], "an argument-type list")?
                .iter()
                .map(|t| parse_type(expect_atom(t, "a type")?))
                .collect::<Result<Vec<_>>>()?;
            let args = expect_list(&items[3], "an argument-expression list")?
                .iter()
                .map(parse_expr)
                .collect::<Result<Vec<_>>>()?;
            let ret = match expect_atom(&items[4], "a return type or 'none'")? {
                "none" => None,
                ty => {
                    let ret_type = parse_type(ty)?;
                    let dst = parse_reg(expect_atom(&items[5], "a return-value destination register")?)?;
                    Some((ret_type, dst))
                }
            };
            Ok(Stmt::Call { label, arg_types, args, ret })
        }
        "cjump" => {
            let signedness = match expect_atom(&items[1], "'signed' or 'unsigned'")? {
                "signed" => Signedness::Signed,
                "unsigned" => Signedness::Unsigned,
                other => {
                    return Err(Puc8aError::ParseError(format!("expected 'signed' or 'unsigned', found '{other}'")))
                }
            };
            let op = parse_cmp_op(expect_atom(&items[2], "a comparison operator")?)?;
            let lhs = parse_expr(&items[3])?;
            let rhs = parse_expr(&items[4])?;
            let yes = id(expect_atom(&items[5], "a 'yes' label")?);
            let no = id(expect_atom(&items[6], "a 'no' label")?);
            Ok(Stmt::CJump { signedness, op, lhs, rhs, yes, no })
        }
        other => Err(Puc8aError::ParseError(format!("unknown statement keyword '{other}'"))),
    }
}

fn parse_cmp_op(s: &str) -> Result<CmpOp> {
    Ok(match s {
        "eq" => CmpOp::Eq,
        "ne" => CmpOp::Ne,
        "lt" => CmpOp::Lt,
        "gt" => CmpOp::Gt,
        "le" => CmpOp::Le,
        "ge" => CmpOp::Ge,
        _ => return Err(Puc8aError::ParseError(format!("unknown comparison operator '{s}'"))),
    })
}

fn parse_bin_op(s: &str) -> Result<BinOp> {
    Ok(match s {
        "add" => BinOp::Add,
        "sub" => BinOp::Sub,
        "and" => BinOp::And,
        "or" => BinOp::Or,
        "xor" => BinOp::Xor,
        _ => return Err(Puc8aError::ParseError(format!("unknown binary operator '{s}'"))),
    })
}

fn parse_expr(s: &Sexpr) -> Result<Expr> {
    match s {
        Sexpr::Atom(a) => {
            if let Some(name) = a.strip_prefix('@') {
                return Ok(Expr::Label(id(name)));
            }
            if let Ok(v) = a.parse::<u8>() {
                return Ok(Expr::Const(v));
            }
            if let Ok(reg) = parse_reg(a) {
                return Ok(Expr::Reg(reg));
            }
            Err(Puc8aError::ParseError(format!("unrecognized expression atom '{a}'")))
        }
        Sexpr::List(items) => {
            let head = expect_atom(
                items.first().ok_or_else(|| Puc8aError::ParseError("empty expression form".to_string()))?,
                "an expression keyword",
            )?;
            match head {
                "reg" => Ok(Expr::Reg(parse_reg(expect_atom(&items[1], "a register")?)?)),
                "const" => {
                    let v: i32 = expect_atom(&items[1], "an integer")?
                        .parse()
                        .map_err(|_| Puc8aError::ParseError("expected an integer constant".to_string()))?;
                    Ok(Expr::Const(v.rem_euclid(256) as u8))
                }
                "label" => Ok(Expr::Label(id(expect_atom(&items[1], "a label")?))),
                "fprel" => {
                    let k: i32 = expect_atom(&items[1], "an integer offset")?
                        .parse()
                        .map_err(|_| Puc8aError::ParseError("expected an integer fprel offset".to_string()))?;
                    Ok(Expr::FpRel(k))
                }
                "bin" => {
                    let op = parse_bin_op(expect_atom(&items[1], "a binary operator")?)?;
                    Ok(Expr::Bin(op, Box::new(parse_expr(&items[2])?), Box::new(parse_expr(&items[3])?)))
                }
                "mul" => {
                    let factor: u32 = expect_atom(&items[2], "an integer factor")?
                        .parse()
                        .map_err(|_| Puc8aError::ParseError("expected an integer multiply factor".to_string()))?;
                    Ok(Expr::Mul(Box::new(parse_expr(&items[1])?), factor))
                }
                "shl" => {
                    let n: u32 = expect_atom(&items[2], "an integer shift count")?
                        .parse()
                        .map_err(|_| Puc8aError::ParseError("expected an integer shift count".to_string()))?;
                    Ok(Expr::Shl(Box::new(parse_expr(&items[1])?), n))
                }
                "shr" => {
                    let n: u32 = expect_atom(&items[2], "an integer shift count")?
                        .parse()
                        .map_err(|_| Puc8aError::ParseError("expected an integer shift count".to_string()))?;
                    Ok(Expr::Shr(Box::new(parse_expr(&items[1])?), n))
                }
                "neg" => Ok(Expr::Neg(Box::new(parse_expr(&items[1])?))),
                "inv" => Ok(Expr::Inv(Box::new(parse_expr(&items[1])?))),
                "load" => Ok(Expr::Load(Box::new(parse_expr(&items[1])?))),
                "cast" => Ok(Expr::Cast(Box::new(parse_expr(&items[1])?))),
                other => Err(Puc8aError::ParseError(format!("unknown expression keyword '{other}'"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::registers::Register::*;

    #[test]
    fn parses_a_leaf_function() {
        let src = "(func add3 (i8 i8) i8 0 (move r0 (bin add (reg r11) (reg r10))))";
        let program = parse_program(src).unwrap();
        assert_eq!(program.functions.len(), 1);
        let f = &program.functions[0];
        assert_eq!(f.name, id("add3"));
        assert_eq!(f.params, vec![Type::I8, Type::I8]);
        assert_eq!(f.ret, Some(Type::I8));
        assert_eq!(f.stacksize, 0);
        assert_eq!(
            f.body,
            vec![Stmt::Move {
                dst: R0,
                src: Expr::Bin(BinOp::Add, Box::new(Expr::Reg(R11)), Box::new(Expr::Reg(R10))),
            }]
        );
    }

    #[test]
    fn parses_jump_and_cjump() {
        let src = "(func f () none 0 \
                    (cjump unsigned lt (reg r0) (reg r1) yes no) \
                    (jump done))";
        let program = parse_program(src).unwrap();
        let f = &program.functions[0];
        assert_eq!(f.ret, None);
        assert_eq!(
            f.body[0],
            Stmt::CJump {
                signedness: Signedness::Unsigned,
                op: CmpOp::Lt,
                lhs: Expr::Reg(R0),
                rhs: Expr::Reg(R1),
                yes: id("yes"),
                no: id("no"),
            }
        );
        assert_eq!(f.body[1], Stmt::Jump(id("done")));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_program("(func f (i8) i8 0 (move r0 (bogus 1 2)))").is_err());
    }

    #[test]
    fn parses_call_with_return_value() {
        let src = "(func f () none 0 \
                    (call add3 (i8 i8 i8) ((reg r0) (const 1) (reg r2)) i8 r5))";
        let program = parse_program(src).unwrap();
        let f = &program.functions[0];
        assert_eq!(
            f.body[0],
            Stmt::Call {
                label: id("add3"),
                arg_types: vec![Type::I8, Type::I8, Type::I8],
                args: vec![Expr::Reg(R0), Expr::Const(1), Expr::Reg(R2)],
                ret: Some((Type::I8, R5)),
            }
        );
    }

    #[test]
    fn parses_call_without_return_value() {
        let src = "(func f () none 0 (call log (u8) ((reg r0)) none))";
        let program = parse_program(src).unwrap();
        assert_eq!(
            program.functions[0].body[0],
            Stmt::Call {
                label: id("log"),
                arg_types: vec![Type::U8],
                args: vec![Expr::Reg(R0)],
                ret: None,
            }
        );
    }
}
