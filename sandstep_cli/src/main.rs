// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod helper;
mod theme;

use clap::{Parser, Subcommand};
use cliclack::{input, intro, set_theme};
use helper::{initialize_global_object, render_value};
use sandstep_vm::{ast::AstArena, source, FatalError, Interpreter};
use theme::ReplTheme;

/// A step-wise ECMAScript 5 interpreter
#[derive(Debug, Parser)]
#[command(name = "sandstep")]
#[command(about = "A step-wise ECMAScript 5 interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parses a file and logs out the lowered AST
    Parse {
        /// The path of the file to parse
        path: String,
    },

    /// Evaluates one or more files
    Eval {
        /// The files to evaluate
        #[arg(required = true)]
        paths: Vec<String>,

        /// Print the final value of each program
        #[arg(short, long)]
        verbose: bool,
    },

    /// Runs the REPL
    Repl,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    match args.command {
        Command::Parse { path } => {
            let file = std::fs::read_to_string(&path)?;
            let mut arena = AstArena::new();
            match source::parse_program(&file, &mut arena, true) {
                Ok(program) => {
                    println!("program node: {program:?}");
                    println!("{arena:#?}");
                }
                Err(failure) => {
                    eprintln!("Parse errors in {path}:\n{failure}");
                    std::process::exit(1);
                }
            }
        }
        Command::Eval { paths, verbose } => {
            for path in paths {
                let file = std::fs::read_to_string(&path)?;
                let mut interpreter =
                    match Interpreter::new_with_init(&file, initialize_global_object) {
                        Ok(interpreter) => interpreter,
                        Err(FatalError::Parse(failure)) => {
                            eprintln!("Parse errors in {path}:\n{failure}");
                            std::process::exit(1);
                        }
                        Err(error) => return Err(error.into()),
                    };
                match interpreter.run() {
                    Ok(false) => {
                        if verbose {
                            println!("{}", render_value(&interpreter, interpreter.value()));
                        }
                    }
                    Ok(true) => {
                        eprintln!(
                            "{path}: an async native is still pending with no host resolver"
                        );
                        std::process::exit(1);
                    }
                    Err(error) => {
                        eprintln!("{error}");
                        std::process::exit(1);
                    }
                }
            }
        }
        Command::Repl => {
            let mut interpreter = Interpreter::new_with_init("", initialize_global_object)?;
            interpreter.run()?;

            set_theme(ReplTheme);
            println!("\n");
            let mut placeholder = "Enter a line of JavaScript".to_string();

            let _ = ctrlc::set_handler(|| {
                std::process::exit(0);
            });
            loop {
                intro("Sandstep Repl")?;
                let line: String = input("").placeholder(&placeholder).interact()?;

                if line.trim() == "exit" {
                    std::process::exit(0);
                }
                placeholder = line.to_string();
                // The interpreter is idle between lines, so the program
                // frame is on top and the line can be appended live.
                if let Err(error) = interpreter.append_code(&line) {
                    eprintln!("{error}");
                    continue;
                }
                match interpreter.run() {
                    Ok(_) => {
                        println!("{}\n", render_value(&interpreter, interpreter.value()));
                    }
                    Err(error) => {
                        eprintln!("{error}");
                    }
                }
            }
        }
    }
    Ok(())
}
