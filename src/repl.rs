use log::info;
use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{LispError, Result},
    runtime::{ExecutionContext, Interpreter},
};

const PROMPT: &str = ">>> ";

pub struct Repl {
    interpreter: Interpreter,
}

impl Repl {
    pub fn new() -> Self {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Self {
        Self {
            interpreter: Interpreter::with_context(context),
        }
    }

    /// Reads and evaluates lines until `:quit`, `:exit`, Ctrl-C or Ctrl-D.
    /// Evaluation errors are reported and the session continues.
    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(readline_error)?;
        info!("starting REPL session");
        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.interpreter.eval_source(trimmed) {
                        Ok(value) => println!("{value}"),
                        Err(err) => eprintln!("{err}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(readline_error(err)),
            }
        }
        Ok(())
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

fn readline_error(err: ReadlineError) -> LispError {
    LispError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
}
