//! Assembles a PUC8a textual assembly file to an encoded image.
//!
//! Run with `--help` for more info.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use puc8a::codegen::assembler::{assemble, lower_pseudo};
use puc8a::codegen::textasm::parse_assembly;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input assembly file
    file: String,
    /// the output stage to print
    #[arg(value_enum, short, long, default_value_t = Output::Image)]
    out: Output,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Output {
    /// the parsed, un-encoded instruction stream
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

    let instructions = match parse_assembly(&input) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.out {
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
