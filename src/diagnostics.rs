use thiserror::Error;

use crate::position::Position;

/// Reasons the lexer produces an `Invalid` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("newline inside string literal")]
    NewlineInString,
    /// Not produced by `Lexer`: a symbol scan starts on a non-delimiter, so it
    /// always consumes at least one character.
    #[error("empty symbol")]
    EmptySymbol,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected `)` at {position}")]
    UnexpectedClose { position: Position },
    #[error("unterminated list starting at {position}")]
    UnterminatedList { position: Position },
    #[error("malformed numeric literal `{lexeme}` at {position}")]
    MalformedLiteral { lexeme: String, position: Position },
    #[error("{source} at {position}")]
    InvalidToken {
        #[source]
        source: LexError,
        position: Position,
    },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedClose { position }
            | ParseError::UnterminatedList { position }
            | ParseError::MalformedLiteral { position, .. }
            | ParseError::InvalidToken { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unbound symbol `{0}`")]
    UnboundSymbol(String),
    #[error("value `{0}` is not callable")]
    NotCallable(String),
    #[error("`{callee}` expected {expected} arguments but received {received}")]
    TooFewArguments {
        callee: String,
        expected: usize,
        received: usize,
    },
    #[error("`{callee}` expected {expected} arguments but received {received}")]
    TooManyArguments {
        callee: String,
        expected: usize,
        received: usize,
    },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid lambda: {0}")]
    InvalidLambda(String),
}

impl EvalError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch(message.into())
    }

    /// Checks that exactly `expected` arguments were supplied to `callee`.
    pub fn check_arity(
        callee: &str,
        expected: usize,
        received: usize,
    ) -> std::result::Result<(), EvalError> {
        EvalError::check_min_arity(callee, expected, received)?;
        if received > expected {
            return Err(EvalError::TooManyArguments {
                callee: callee.to_string(),
                expected,
                received,
            });
        }
        Ok(())
    }

    pub fn check_min_arity(
        callee: &str,
        min: usize,
        received: usize,
    ) -> std::result::Result<(), EvalError> {
        if received < min {
            return Err(EvalError::TooFewArguments {
                callee: callee.to_string(),
                expected: min,
                received,
            });
        }
        Ok(())
    }
}

/// Unified error type for the interpreter.
#[derive(Debug, Error)]
pub enum LispError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LispError {
    /// Renders the error with positions prefixed by `source_name`, when one is known.
    pub fn report(&self, source_name: Option<&str>) -> String {
        match (self, source_name) {
            (LispError::Parse(err), Some(name)) => {
                format!("{}: parse error: {err}", err.position().with_source(name))
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LispError>;
