//! Loads an encoded PUC8a image and either runs it headlessly for a fixed
//! step budget or drives the interactive REPL of `sim::repl`.
//!
//! Run with `--help` for more info.

use std::io::{stdin, stdout};
use std::process::ExitCode;

use clap::Parser;

use puc8a::codegen::assembler::Image;
use puc8a::sim::repl::run_repl;
use puc8a::sim::state::run;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input image file
    file: String,
    /// drop into the interactive stepper instead of running headlessly
    #[arg(short, long, default_value_t = false)]
    interactive: bool,
    /// maximum number of instructions to execute in headless mode
    #[arg(long, default_value_t = 1000)]
    steps: u32,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read '{}': {e}", args.file);
            return ExitCode::FAILURE;
        }
    };

    let image = match Image::parse(&text) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut command_input = stdin().lock();
    let mut out = stdout().lock();

    // A second handle onto the same terminal backs the `lda [2]` keyboard
    // port; the REPL's command prompt and the simulated program share one
    // stdin the way `original_source/puc8a/simulator.py`'s single `input()`
    // calls do.
    let mut program_input = stdin();

    let result = if args.interactive {
        run_repl(&image, &mut command_input, &mut out, &mut program_input)
    } else {
        run(&image, args.steps, &mut program_input, &mut out)
    };

    match result {
        Ok(state) => {
            if !args.interactive {
                println!("{state}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
