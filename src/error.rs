use std::io;
use thiserror::Error;

/// Raised by the scanner. Fatal to the whole `tokenize` call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexicalError {
    #[error("[line {line}] Error: Unexpected character '{character}'.")]
    UnexpectedCharacter { character: char, line: usize },
    #[error("[line {line}] Error: Unterminated string.")]
    UnterminatedString { line: usize },
    #[error("[line {line}] Error: Invalid number literal '{text}'.")]
    InvalidNumber { text: String, line: usize },
}

/// Raised by the parser. There is no recovery, the whole parse fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("[line {line}] Parse Error: Expected {expected} but found '{found}'.")]
    Unexpected {
        expected: String,
        found: String,
        line: usize,
    },
    #[error("[line {line}] Parse Error: Constant '{name}' must be initialized.")]
    UninitializedConstant { name: String, line: usize },
    #[error("[line {line}] Parse Error: Invalid {operator} target.")]
    InvalidTarget { operator: String, line: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("Undefined variable '{0}'.")]
    Undefined(String),
    #[error("Cannot redefine '{0}'.")]
    Redefinition(String),
    #[error("Cannot reassign '{0}'.")]
    Reassignment(String),
    #[error("Cannot delete '{0}'.")]
    Deletion(String),
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Zero division is not allowed.")]
    DivisionByZero,
    #[error("Invalid count value: {0}.")]
    InvalidCount(String),
    #[error("'{0}' is not a function.")]
    NotCallable(String),
    #[error("{function}() expects {expected} argument(s).")]
    MissingArgument {
        function: &'static str,
        expected: usize,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Anything that can stop the evaluation of a top-level statement.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl From<io::Error> for RuntimeError {
    fn from(err: io::Error) -> RuntimeError {
        RuntimeError::Evaluation(EvaluationError::Io(err))
    }
}

/// Any failure of the source → tokens → tree → values pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<BindingError> for Error {
    fn from(err: BindingError) -> Error {
        Error::Runtime(err.into())
    }
}

impl From<EvaluationError> for Error {
    fn from(err: EvaluationError) -> Error {
        Error::Runtime(err.into())
    }
}
