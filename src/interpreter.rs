use crate::ast::{Node, Visitor};
use crate::callable::Function;
use crate::environment::{EnvId, Environments};
use crate::error::{EvaluationError, RuntimeError};
use crate::operators;
use crate::stdlib;
use crate::value::Value;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use tracing::debug;

pub struct Interpreter {
    environments: Environments,
    current: EnvId,
    out: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout and reading `input()` from stdin.
    pub fn new() -> Interpreter {
        Interpreter::with_io(Box::new(io::stdout()), Box::new(io::stdin().lock()))
    }
    /// An interpreter with the standard library installed in its root scope.
    pub fn with_io(out: Box<dyn Write>, input: Box<dyn BufRead>) -> Interpreter {
        let mut environments = Environments::new();
        stdlib::install(&mut environments);
        let current = environments.root();
        Interpreter {
            environments,
            current,
            out,
            input,
        }
    }
    pub fn environments(&self) -> &Environments {
        &self.environments
    }
    pub fn environments_mut(&mut self) -> &mut Environments {
        &mut self.environments
    }
    /// The scope statements are currently evaluated in.
    pub fn current(&self) -> EnvId {
        self.current
    }
    pub fn output(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }
    pub fn input(&mut self) -> &mut dyn BufRead {
        self.input.as_mut()
    }

    /// Evaluates each top-level node in order and returns one value per
    /// node. With `echo`, every non-null result is written to the output.
    /// The first failure stops the run; bindings made so far are kept.
    pub fn interpret(&mut self, body: &[Node], echo: bool) -> Result<Vec<Value>, RuntimeError> {
        debug!(statements = body.len(), echo, "interpreting");
        body.iter().map(|node| self.statement(node, echo)).collect()
    }

    /// Like [`interpret`](Interpreter::interpret), but a failing node does
    /// not stop the ones after it. Used by the prompt.
    pub fn interpret_all(&mut self, body: &[Node], echo: bool) -> Vec<Result<Value, RuntimeError>> {
        debug!(statements = body.len(), echo, "interpreting all");
        body.iter().map(|node| self.statement(node, echo)).collect()
    }

    fn statement(&mut self, node: &Node, echo: bool) -> Result<Value, RuntimeError> {
        let value = self.execute(node)?;
        if echo && value != Value::Null {
            writeln!(self.out, "{}", value)?;
        }
        Ok(value)
    }

    /// Evaluates one top-level node. A `return` outside a function just
    /// yields its value.
    pub fn execute(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        self.evaluate(node)
    }

    pub(crate) fn evaluate(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        node.accept(self)
    }

    /// Runs `f` with `scope` as the current scope, then restores the
    /// previous one and releases `scope`, whether or not `f` failed.
    pub(crate) fn in_scope<T>(
        &mut self,
        scope: EnvId,
        f: impl FnOnce(&mut Interpreter) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let previous = std::mem::replace(&mut self.current, scope);
        let result = f(self);
        self.current = previous;
        self.environments.release(scope);
        result
    }

    fn block(&mut self, statements: &[Node]) -> Result<Value, RuntimeError> {
        let scope = self.environments.new_child(self.current);
        self.in_scope(scope, |interpreter| {
            for statement in statements {
                interpreter.evaluate(statement)?;
            }
            Ok(Value::Null)
        })
    }

    fn call(&mut self, callee: &str, arguments: &[Node]) -> Result<Value, RuntimeError> {
        let function = self.environments.get(self.current, callee)?;
        let arguments = arguments
            .iter()
            .map(|argument| self.evaluate(argument))
            .collect::<Result<Vec<Value>, RuntimeError>>()?;
        let value = match function {
            Value::Function(function) => function.call(self, &arguments)?,
            Value::NativeFunction(native) => native.call(self, &arguments)?,
            _ => return Err(EvaluationError::NotCallable(callee.to_string()).into()),
        };
        Ok(value)
    }
}

impl Visitor<Node, Result<Value, RuntimeError>> for Interpreter {
    fn visit(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        match node {
            Node::Number(text) => Ok(Value::Number(text.clone())),
            Node::String(s) => Ok(Value::String(s.clone())),
            Node::Boolean(b) => Ok(Value::Boolean(*b)),
            Node::Null | Node::Empty => Ok(Value::Null),
            Node::Identifier(name) => Ok(self.environments.get(self.current, name)?),
            Node::VarDeclaration {
                name,
                initializer,
                constant,
            } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Null,
                };
                Ok(self
                    .environments
                    .define(self.current, name, value, *constant, false)?)
            }
            Node::Assign { name, value } => {
                let value = self.evaluate(value)?;
                Ok(self.environments.set(self.current, name, value)?)
            }
            Node::Unary { operator, operand } => {
                let operand = self.evaluate(operand)?;
                Ok(operators::unary(*operator, &operand))
            }
            Node::Update { operator, name } => {
                let current = self.environments.get(self.current, name)?;
                match operators::update(*operator, &current) {
                    Some(updated) => Ok(self.environments.set(self.current, name, updated)?),
                    None => Ok(Value::Null),
                }
            }
            Node::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(operators::binary(*operator, &left, &right)?)
            }
            Node::Block(statements) => self.block(statements),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_true() {
                    self.evaluate(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.evaluate(else_branch)?;
                }
                Ok(Value::Null)
            }
            Node::While { condition, body } => {
                loop {
                    let scope = self.environments.new_child(self.current);
                    let again = self.in_scope(scope, |interpreter| {
                        if !interpreter.evaluate(condition)?.is_true() {
                            return Ok(false);
                        }
                        interpreter.evaluate(body)?;
                        Ok(true)
                    })?;
                    if !again {
                        break;
                    }
                }
                Ok(Value::Null)
            }
            Node::For {
                init,
                condition,
                update,
                body,
            } => {
                let scope = self.environments.new_child(self.current);
                self.in_scope(scope, |interpreter| {
                    interpreter.evaluate(init)?;
                    while interpreter.evaluate(condition)?.is_true() {
                        interpreter.evaluate(body)?;
                        interpreter.evaluate(update)?;
                    }
                    Ok(Value::Null)
                })
            }
            Node::Function { name, params, body } => {
                let function = Rc::new(Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::clone(body),
                    closure: self.current,
                });
                self.environments.capture(&function);
                Ok(self
                    .environments
                    .define(self.current, name, Value::Function(function), false, true)?)
            }
            Node::Call { callee, arguments } => self.call(callee, arguments),
            // Only a call body statement ends the call; elsewhere it is just its value.
            Node::Return(value) => match value {
                Some(value) => self.evaluate(value),
                None => Ok(Value::Null),
            },
            Node::Delete(name) => Ok(self.environments.delete(self.current, name)?),
            Node::Array(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.evaluate(element))
                    .collect::<Result<Vec<Value>, RuntimeError>>()?;
                Ok(Value::array(elements))
            }
            Node::Index { target, index } => {
                let target = self.evaluate(target)?;
                let index = self.evaluate(index)?;
                Ok(target.index(index.to_number()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{BindingError, Error, EvaluationError, RuntimeError};
    use crate::interpreter::Interpreter;
    use crate::value::Value;
    use crate::{parser, run, scanner};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Sink(Rc<RefCell<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    fn interpreter() -> (Interpreter, Sink) {
        let sink = Sink::default();
        let interpreter = Interpreter::with_io(Box::new(sink.clone()), Box::new(Cursor::new(Vec::new())));
        (interpreter, sink)
    }

    fn last(source: &str) -> Value {
        let (mut interpreter, _) = interpreter();
        run(source, &mut interpreter, false)
            .unwrap()
            .pop()
            .unwrap()
    }

    fn runtime_error(source: &str) -> RuntimeError {
        let (mut interpreter, _) = interpreter();
        match run(source, &mut interpreter, false) {
            Err(Error::Runtime(e)) => e,
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn one_value_per_top_level_node() {
        let (mut interpreter, _) = interpreter();
        let values = run("var x = 5; x; x + 1;", &mut interpreter, false).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Number("5".to_string()),
                Value::Number("5".to_string()),
                Value::number(6.0)
            ]
        );
    }

    #[test]
    fn echo_skips_null_results() {
        let (mut interpreter, sink) = interpreter();
        run("var x = 2; x * 3; {}; \"hi\";", &mut interpreter, true).unwrap();
        assert_eq!(sink.text(), "2\n6\nhi\n");
    }

    #[test]
    fn interpret_all_keeps_going_after_a_failure() {
        let (mut interpreter, sink) = interpreter();
        let tokens = scanner::tokenize("var x = 1; missing; print(x); x / 0; x + 1;").unwrap();
        let program = parser::parse(&tokens).unwrap();
        let results = interpreter.interpret_all(&program.body, true);
        assert_eq!(results.len(), 5);
        assert!(matches!(
            results[1],
            Err(RuntimeError::Binding(BindingError::Undefined(ref name))) if name == "missing"
        ));
        assert!(matches!(
            results[3],
            Err(RuntimeError::Evaluation(EvaluationError::DivisionByZero))
        ));
        assert_eq!(results[4].as_ref().unwrap(), &Value::number(2.0));
        assert_eq!(sink.text(), "1\n1\n2\n");
    }

    #[test]
    fn declaration_without_initializer_is_null() {
        assert_eq!(last("var x; x;"), Value::Null);
    }

    #[test]
    fn assignment_evaluates_to_the_new_value() {
        assert_eq!(last("var x = 1; x = x + 4;"), Value::number(5.0));
        assert_eq!(last("var s = \"ab\"; s += \"c\"; s;"), Value::string("abc"));
    }

    #[test]
    fn updates() {
        assert_eq!(last("var i = 1; i++;"), Value::number(2.0));
        assert_eq!(last("var i = 1; ++i; i;"), Value::number(2.0));
        assert_eq!(last("var s = \"abc\"; s--; s;"), Value::string("ab"));
        assert_eq!(last("var b = true; --b; b;"), Value::Boolean(false));
        assert_eq!(last("var s = \"abc\"; s++; s;"), Value::string("abc"));
    }

    #[test]
    fn conditions_need_textual_true() {
        let (mut interpreter, sink) = interpreter();
        let source = "if (1) { print(\"one\"); } else { print(\"other\"); }
                      if (1 < 2) { print(\"less\"); }
                      if (false) { print(\"a\"); } else if (true) { print(\"b\"); }
                      if (\"true\") { print(\"text\"); }
                      if (\"yes\") { print(\"yes\"); } else { print(\"no\"); }
                      var n = 0;
                      while (string(n < 2)) { n++; }
                      print(n);";
        run(source, &mut interpreter, false).unwrap();
        assert_eq!(sink.text(), "other\nless\nb\ntext\nno\n2\n");
    }

    #[test]
    fn while_loop() {
        let (mut interpreter, sink) = interpreter();
        run(
            "var i = 0; while (i < 3) { var sq = i * i; print(sq); i++; }",
            &mut interpreter,
            false,
        )
        .unwrap();
        assert_eq!(sink.text(), "0\n1\n4\n");
    }

    #[test]
    fn for_scope_ends_with_the_loop() {
        let (mut interpreter, sink) = interpreter();
        run(
            "for (var i = 0; i < 3; i++) { print(i); }",
            &mut interpreter,
            false,
        )
        .unwrap();
        assert_eq!(sink.text(), "0\n1\n2\n");
        let err = run("i;", &mut interpreter, false).unwrap_err();
        assert!(matches!(
            err,
            Error::Runtime(RuntimeError::Binding(BindingError::Undefined(ref name))) if name == "i"
        ));
    }

    #[test]
    fn only_body_level_return_ends_a_call() {
        assert_eq!(
            last("function f() { if (true) { return 1; } return 2; } f();"),
            Value::Number("2".to_string())
        );
        let source = "function count() {
                          var n = 0;
                          while (n < 3) { n++; return 99; }
                          return n;
                          n = 100;
                      }
                      count();";
        assert_eq!(last(source), Value::Number("3".to_string()));
    }

    #[test]
    fn functions_without_return_give_null() {
        assert_eq!(last("function f() { 1 + 1; } f();"), Value::Null);
        assert_eq!(last("function f() { return; } f();"), Value::Null);
        assert_eq!(last("function f() { { return 5; } } f();"), Value::Null);
    }

    #[test]
    fn top_level_return_yields_its_value() {
        assert_eq!(last("return 4; 5;"), Value::Number("5".to_string()));
        assert_eq!(last("return 4;"), Value::Number("4".to_string()));
    }

    #[test]
    fn missing_arguments_are_null_and_extras_ignored() {
        assert_eq!(last("function f(a, b) { return b; } f(1);"), Value::Null);
        assert_eq!(last("function f(a) { return a; } f(1, 2, 3);"), Value::Number("1".to_string()));
    }

    #[test]
    fn recursion() {
        let source = "function fib(n) {
                          var r = n;
                          if (n >= 2) { r = fib(n - 1) + fib(n - 2); }
                          return r;
                      }
                      fib(15);";
        assert_eq!(last(source), Value::number(610.0));
    }

    #[test]
    fn closures_outlive_their_block() {
        let (mut interpreter, sink) = interpreter();
        let source = "var greet;
                      {
                          var name = \"world\";
                          function hello() { return \"hello \" + name; }
                          greet = hello;
                      }
                      { var name = \"reused\"; }
                      print(greet());";
        run(source, &mut interpreter, false).unwrap();
        assert_eq!(sink.text(), "hello world\n");
    }

    #[test]
    fn repeated_calls_do_not_grow_the_scope_arena() {
        let (mut interpreter, sink) = interpreter();
        let source = "function mk(n) {
                          var seen = n * 2;
                          function inner() { return seen; }
                          return inner;
                      }
                      var kept = mk(21);
                      var i = 0;
                      while (i < 10000) { mk(i); i++; }
                      print(kept());";
        run(source, &mut interpreter, false).unwrap();
        assert_eq!(sink.text(), "42\n");
        assert!(interpreter.environments().allocated() < 200);
    }

    #[test]
    fn functions_cannot_be_reassigned_or_deleted() {
        assert!(matches!(
            runtime_error("function f() {} f = 1;"),
            RuntimeError::Binding(BindingError::Reassignment(_))
        ));
        assert!(matches!(
            runtime_error("function f() {} delete f;"),
            RuntimeError::Binding(BindingError::Deletion(_))
        ));
    }

    #[test]
    fn calling_a_non_function() {
        assert!(matches!(
            runtime_error("var x = 3; x();"),
            RuntimeError::Evaluation(EvaluationError::NotCallable(ref name)) if name == "x"
        ));
        assert!(matches!(
            runtime_error("nope();"),
            RuntimeError::Binding(BindingError::Undefined(_))
        ));
    }

    #[test]
    fn division_by_zero_inside_a_call_propagates() {
        assert!(matches!(
            runtime_error("function f(x) { return x / 0; } f(1);"),
            RuntimeError::Evaluation(EvaluationError::DivisionByZero)
        ));
    }

    #[test]
    fn failure_keeps_earlier_bindings_and_restores_scope() {
        let (mut interpreter, _) = interpreter();
        let root = interpreter.current();
        assert!(run("var kept = 1; { var x = 1 / 0; }", &mut interpreter, false).is_err());
        assert_eq!(interpreter.current(), root);
        assert_eq!(
            run("kept;", &mut interpreter, false).unwrap(),
            vec![Value::Number("1".to_string())]
        );
    }

    #[test]
    fn arrays_and_indexing() {
        assert_eq!(last("var xs = [1, \"a\", null]; xs;").to_string(), "[1, \"a\", null]");
        assert_eq!(last("[10, 20, 30][1];"), Value::Number("20".to_string()));
        assert_eq!(last("var xs = [1]; xs[5];"), Value::Null);
        assert_eq!(last("\"hey\"[2];"), Value::string("y"));
        assert_eq!(last("(\"a,b\" / \",\")[1];"), Value::string("b"));
    }

    #[test]
    fn delete_removes_the_binding() {
        assert_eq!(last("var x = 4; delete x;"), Value::Number("4".to_string()));
        assert!(matches!(
            runtime_error("var x = 4; delete x; x;"),
            RuntimeError::Binding(BindingError::Undefined(_))
        ));
    }
}
