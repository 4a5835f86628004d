use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use lispr::{ExecutionContext, Interpreter, Repl};

#[derive(Parser)]
#[command(author, version, about = "A small homoiconic Lisp interpreter")]
struct Args {
    /// Start with an empty root scope instead of the standard library
    #[arg(long, global = true)]
    no_prelude: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive REPL session
    Repl,
    /// Evaluate every form of a script file
    Run { script: PathBuf },
    /// Evaluate a snippet and print the rendering of its result
    Eval { source: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_module("rustyline", LevelFilter::Warn)
        .init();

    let args = Args::parse();
    let prelude = !args.no_prelude;
    let outcome = match args.command.unwrap_or(Command::Repl) {
        Command::Repl => Repl::with_context(ExecutionContext {
            source_name: None,
            prelude,
        })
        .run()
        .map_err(|err| err.to_string()),
        Command::Run { script } => run_script(script, prelude),
        Command::Eval { source } => {
            let mut interpreter = Interpreter::with_context(ExecutionContext {
                source_name: None,
                prelude,
            });
            interpreter
                .eval_source(&source)
                .map(|value| println!("{value}"))
                .map_err(|err| err.to_string())
        }
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(path: PathBuf, prelude: bool) -> Result<(), String> {
    let name = path.display().to_string();
    let source = fs::read_to_string(&path).map_err(|err| format!("{name}: {err}"))?;
    let mut interpreter = Interpreter::with_context(ExecutionContext {
        source_name: Some(name),
        prelude,
    });
    match interpreter.eval_source(&source) {
        Ok(_) => Ok(()),
        Err(err) => Err(interpreter.report(&err)),
    }
}
