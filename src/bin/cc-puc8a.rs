//! "Compiles" a small textual lowered-IR file (standing in for the
//! out-of-scope C front-end's own output) to PUC8a machine code: selects
//! instructions, lays out each function's frame, and assembles the result
//! into an encoded image.
//!
//! Run with `--help` for more info.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use puc8a::codegen::assembler::{assemble, lower_pseudo};
use puc8a::codegen::compile_program;
use puc8a::ir::parse_program;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input lowered-IR file
    file: String,
    /// the output stage to print
    #[arg(value_enum, short, long, default_value_t = Output::Image)]
    out: Output,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Output {
    /// the parsed IR, debug-printed
    Ir,
    /// the selected, un-encoded instruction stream
    Asm,
    /// the final encoded, relocated image
    Image,
}

fn main() -> ExitCode {
    use Output::*;
    let args = Args::parse();

    let input = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read '{}': {e}", args.file);
            return ExitCode::FAILURE;
        }
    };

    let program = match parse_program(&input) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Ir = args.out {
        println!("{program:#?}");
        return ExitCode::SUCCESS;
    }

    let instructions = match compile_program(&program) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.out {
        Ir => unreachable!(),
        Asm => {
            for inst in &instructions {
                println!("{inst}");
            }
        }
        Image => {
            let lowered = lower_pseudo(&instructions);
            match assemble(&lowered, vec![]) {
                Ok(image) => print!("{image}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
