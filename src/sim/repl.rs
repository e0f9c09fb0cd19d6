//! Interactive stepper: print the next instruction, accept a command, print
//! the resulting diff (spec.md §4.7).
//!
//! Grounded on `original_source/puc8a/simulator.py`'s `Simulator.process`: the
//! same command set (`h`, empty/`n`, `c`, `b a`, `p`, `q`, `rx`, `rx = y`,
//! `[a]`, `[a] = y`), the same "continue quietly until a breakpoint or a
//! self-loop" behavior for `c`, and the same trace-line format.

use std::io::{BufRead, Read, Write};

use crate::codegen::assembler::Image;
use crate::error::Result;
use crate::sim::disasm::disassemble;
use crate::sim::state::{step, SimState};

/// `h`, `n`, `c`, `b <addr>`, `p`, `q`, `r<k>`, `r<k>=<v>`, `[a]`, `[a]=<v>`.
enum Command {
    Help,
    Next,
    Continue,
    ToggleBreakpoint(u8),
    Print,
    Quit,
    GetRegister(usize),
    SetRegister(usize, u8),
    GetMemory(usize),
    SetMemory(usize, u8),
    Unknown,
}

fn parse_command(cmd: &str) -> Command {
    let cmd = cmd.trim();
    if cmd.is_empty() || cmd == "n" {
        return Command::Next;
    }
    if cmd == "h" {
        return Command::Help;
    }
    if cmd == "c" {
        return Command::Continue;
    }
    if cmd == "p" {
        return Command::Print;
    }
    if cmd == "q" {
        return Command::Quit;
    }
    if let Some(rest) = cmd.strip_prefix('b') {
        if let Ok(addr) = rest.trim().parse::<u8>() {
            return Command::ToggleBreakpoint(addr);
        }
        return Command::Unknown;
    }
    if let Some(rest) = cmd.strip_prefix('r') {
        let mut parts = rest.splitn(2, '=');
        let reg = parts.next().unwrap_or("").trim().parse::<usize>();
        match (reg, parts.next()) {
            (Ok(r), None) => return Command::GetRegister(r),
            (Ok(r), Some(v)) => {
                if let Ok(v) = parse_u8(v.trim()) {
                    return Command::SetRegister(r, v);
                }
            }
            _ => {}
        }
        return Command::Unknown;
    }
    if let Some(rest) = cmd.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let addr = addr.trim().parse::<usize>();
            let tail = tail.trim();
            return match (addr, tail.strip_prefix('=')) {
                (Ok(a), None) if tail.is_empty() => Command::GetMemory(a),
                (Ok(a), Some(v)) => match parse_u8(v.trim()) {
                    Ok(v) => Command::SetMemory(a, v),
                    Err(_) => Command::Unknown,
                },
                _ => Command::Unknown,
            };
        }
    }
    Command::Unknown
}

/// Parse `y` the way the Python REPL does (`int(s, 0)`): decimal, or
/// `0x`/`0o`/`0b`-prefixed.
fn parse_u8(s: &str) -> std::result::Result<u8, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
    } else if let Some(oct) = s.strip_prefix("0o") {
        u8::from_str_radix(oct, 8)
    } else if let Some(bin) = s.strip_prefix("0b") {
        u8::from_str_radix(bin, 2)
    } else {
        s.parse()
    }
}

fn print_help(out: &mut impl Write) {
    let _ = writeln!(
        out,
        "Available commands:\n\
         \x20  h       This help.\n\
         \x20  n       Advance to next instruction.\n\
         \x20  b a     Set or clear breakpoint at address a.\n\
         \x20  c       Execute continuously until halted.\n\
         \x20  p       Print current state.\n\
         \x20  q       Exit simulator.\n\
         \x20  rx      Print contents of register x.\n\
         \x20  rx = y  Set register x to value y.\n\
         \x20  [a]     Print contents of memory address a.\n\
         \x20  [a] = y Set memory address a to value y."
    );
}

fn trace_line(out: &mut impl Write, state: &SimState, image: &Image) {
    let pc = state.regs[15] as usize;
    let len = image.code.len().max(1);
    let w0 = image.code.get(pc % len).copied().unwrap_or(0);
    let w1 = image.code.get((pc + 1) % len).copied().unwrap_or(0);
    let (mnemonic, text) = disassemble(w0, w1);
    if mnemonic == "ldi" || mnemonic.starts_with('b') {
        let _ = writeln!(out, "{pc:3}: {:04b} {:04b} {:08b} ({text})", w0 >> 12, (w0 >> 8) & 0xF, w1 & 0xFF);
    } else {
        let _ = writeln!(out, "{pc:3}: {:04b} {:04b} ({text})", w0 >> 12, (w0 >> 8) & 0xF);
    }
}

/// Drive an interactive read-step-print loop over `image`, reading commands
/// from `commands` and writing the trace/output/prompt to `out`. Returns the
/// final state once a `q` command is read or `commands` is exhausted.
pub fn run_repl(
    image: &Image,
    commands: &mut impl BufRead,
    out: &mut impl Write,
    program_input: &mut impl Read,
) -> Result<SimState> {
    let mut state = SimState::new().with_image_data(image);
    let mut breakpoints: Vec<u8> = Vec::new();
    let mut quiet = false;
    let mut line = String::new();

    loop {
        if quiet {
            let next = step(&state, image, program_input, out)?;
            let halted = next.regs[15] == state.regs[15];
            let hit_breakpoint = breakpoints.contains(&next.regs[15]);
            state = next;
            if halted || hit_breakpoint {
                quiet = false;
            }
            continue;
        }

        trace_line(out, &state, image);
        let _ = write!(out, ">> ");
        let _ = out.flush();

        line.clear();
        let n = commands.read_line(&mut line).unwrap_or(0);
        if n == 0 {
            return Ok(state);
        }

        let mut next = state.clone();
        match parse_command(&line) {
            Command::Help => print_help(out),
            Command::Next => next = step(&state, image, program_input, out)?,
            Command::Continue => quiet = true,
            Command::ToggleBreakpoint(addr) => {
                if let Some(pos) = breakpoints.iter().position(|b| *b == addr) {
                    breakpoints.remove(pos);
                } else {
                    breakpoints.push(addr);
                }
                let _ = writeln!(out, "breakpoints: {breakpoints:?}");
            }
            Command::Print => {
                let _ = writeln!(out, "{state}");
            }
            Command::Quit => return Ok(state),
            Command::GetRegister(r) if r < 16 => {
                let _ = writeln!(out, "r{r} = {}", state.regs[r]);
            }
            Command::SetRegister(r, v) if r < 16 => next.regs[r] = v,
            Command::GetMemory(a) if a < 256 => {
                let _ = writeln!(out, "[{a}] = {}", state.mem[a]);
            }
            Command::SetMemory(a, v) if a < 256 => next.mem[a] = v,
            Command::GetRegister(_) | Command::SetRegister(..) => {
                let _ = writeln!(out, "register out of range");
            }
            Command::GetMemory(_) | Command::SetMemory(..) => {
                let _ = writeln!(out, "address out of range");
            }
            Command::Unknown => print_help(out),
        }

        let diff = state.diff(&next);
        if !diff.is_empty() {
            let _ = writeln!(out, "     {diff}");
        }
        state = next;
    }
}
