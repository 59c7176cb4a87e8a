use crate::ast::Node;
use crate::environment::EnvId;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;
use std::fmt;
use std::fmt::Debug;
use std::rc::Rc;
use tracing::trace;

/// A user-defined function. Built once per declaration and shared by
/// every value that refers to it.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Node>>,
    /// Scope the declaration was evaluated in.
    pub closure: EnvId,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name)
    }
}

impl Function {
    /// Runs the body in a fresh child of the closure scope. Parameters bind
    /// positionally; missing arguments are `Null` and extra ones are ignored.
    /// The call ends at the first `return` among the body's own statements;
    /// a `return` nested in a block or loop does not leave the function.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
        trace!(function = %self.name, arguments = arguments.len(), "call");
        let environment = interpreter.environments_mut().new_child(self.closure);
        interpreter.in_scope(environment, |interpreter| {
            for (i, param) in self.params.iter().enumerate() {
                let value = arguments.get(i).cloned().unwrap_or(Value::Null);
                interpreter
                    .environments_mut()
                    .define(environment, param, value, false, false)?;
            }
            for statement in self.body.iter() {
                let value = interpreter.evaluate(statement)?;
                if let Node::Return(_) = statement {
                    return Ok(value);
                }
            }
            Ok(Value::Null)
        })
    }
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

/// A host function installed into the root scope.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub call: NativeFn,
}

impl NativeFunction {
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
        trace!(native = self.name, arguments = arguments.len(), "call");
        (self.call)(interpreter, arguments)
    }
}

impl Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
