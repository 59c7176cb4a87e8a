pub mod ast;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod operators;
pub mod parser;
pub mod scanner;
pub mod stdlib;
pub mod token;
pub mod value;

pub use crate::error::Error;
pub use crate::interpreter::Interpreter;
pub use crate::value::Value;

/// Tokenizes, parses and evaluates `source` in the interpreter's root
/// scope, returning one value per top-level node.
pub fn run(source: &str, interpreter: &mut Interpreter, echo: bool) -> Result<Vec<Value>, Error> {
    let tokens = scanner::tokenize(source)?;
    let program = parser::parse(&tokens)?;
    Ok(interpreter.interpret(&program.body, echo)?)
}
