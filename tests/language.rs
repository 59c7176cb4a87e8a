use npl::error::{BindingError, EvaluationError, LexicalError, ParseError, RuntimeError};
use npl::{run, Error, Interpreter, Value};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

#[derive(Clone, Default)]
struct Output(Rc<RefCell<Vec<u8>>>);

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Output {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

fn session() -> (Interpreter, Output) {
    let output = Output::default();
    let interpreter = Interpreter::with_io(Box::new(output.clone()), Box::new(Cursor::new(Vec::new())));
    (interpreter, output)
}

/// Runs a whole program and returns what it printed.
fn printed(source: &str) -> String {
    let (mut interpreter, output) = session();
    run(source, &mut interpreter, false).unwrap();
    output.text()
}

fn failure(source: &str) -> Error {
    let (mut interpreter, _) = session();
    run(source, &mut interpreter, false).unwrap_err()
}

#[test]
fn declared_variable_reads_back() {
    let (mut interpreter, _) = session();
    let values = run("var x = 5; x;", &mut interpreter, false).unwrap();
    assert_eq!(values[1], Value::Number("5".to_string()));
    assert_eq!(values[1].to_number(), 5.0);
}

#[test]
fn for_loop_counts_and_scopes_its_variable() {
    let (mut interpreter, output) = session();
    run("for (var i = 0; i < 3; i++) { print(i); }", &mut interpreter, false).unwrap();
    assert_eq!(output.text(), "0\n1\n2\n");
    assert!(matches!(
        run("print(i);", &mut interpreter, false),
        Err(Error::Runtime(RuntimeError::Binding(BindingError::Undefined(_))))
    ));
}

#[test]
fn block_shadowing_leaves_outer_binding_alone() {
    let source = r#"
        var x = "outer";
        {
            var x = "inner";
            print(x);
        }
        print(x);
    "#;
    assert_eq!(printed(source), "inner\nouter\n");
}

#[test]
fn assignment_from_a_block_reaches_the_outer_binding() {
    assert_eq!(printed("var n = 1; { n = n + 1; { n *= 10; } } print(n);"), "20\n");
}

#[test]
fn constants_cannot_change() {
    assert!(matches!(
        failure("const x = 1; x = 2;"),
        Error::Runtime(RuntimeError::Binding(BindingError::Reassignment(_)))
    ));
    assert!(matches!(
        failure("const x = 1; delete x;"),
        Error::Runtime(RuntimeError::Binding(BindingError::Deletion(_)))
    ));
    assert!(matches!(
        failure("var x = 1; var x = 2;"),
        Error::Runtime(RuntimeError::Binding(BindingError::Redefinition(_)))
    ));
}

#[test]
fn closure_keeps_its_declaring_scope() {
    let source = r#"
        var counter;
        {
            var count = 0;
            function next() {
                count++;
                return count;
            }
            counter = next;
        }
        for (var i = 0; i < 3; i++) { var unrelated = i; }
        counter();
        counter();
        print(counter());
    "#;
    assert_eq!(printed(source), "3\n");
}

#[test]
fn closures_made_in_a_loop_see_their_own_iteration() {
    let source = r#"
        var first;
        var latest;
        var i = 0;
        while (i < 3) {
            var captured = i * 10;
            function get() { return captured; }
            if (i == 0) { first = get; }
            latest = get;
            i++;
        }
        print(first(), latest());
    "#;
    assert_eq!(printed(source), "0 20\n");
}

#[test]
fn recursive_function_returns_a_result_variable() {
    let source = r#"
        function fact(n) {
            var result = 1;
            if (n > 1) {
                result = n * fact(n - 1);
            }
            return result;
        }
        print(fact(10));
    "#;
    assert_eq!(printed(source), "3628800\n");
}

#[test]
fn closures_held_in_arrays_survive_many_calls() {
    let source = r#"
        function mk(n) {
            function get() { return n; }
            return get;
        }
        function churn() {
            var j = 0;
            while (j < 300) { mk(j); j++; }
            return j;
        }
        var fns = [mk(1), churn(), mk(2)];
        var a = fns[0];
        var b = fns[2];
        print(a(), fns[1], b());
    "#;
    assert_eq!(printed(source), "1 300 2
");
}

#[test]
fn string_operators_in_programs() {
    let source = r#"
        var word = "banana";
        print(word - "an", word - 2, 2 - word, "ab" * 3);
        var parts = "a-b--c" / "-";
        print(parts, length(parts), parts[2]);
        print("abcde" / 0);
    "#;
    assert_eq!(
        printed(source),
        "bana bana nana ababab\n[\"a\", \"b\", \"c\"] 3 c\n[\"ab\", \"cd\", \"e\"]\n"
    );
}

#[rstest]
#[case("\"ab\" + 1;", "ab1")]
#[case("3 * true;", "3")]
#[case("!0;", "true")]
#[case("!\"\";", "true")]
#[case("\"abcd\" / \"b\";", "[\"a\", \"cd\"]")]
#[case("1 + 2 * 3;", "7")]
#[case("(1 + 2) * 3;", "9")]
#[case("2 ** 3 ** 2;", "64")]
#[case("10 % 4;", "2")]
#[case("0.1 + 0.2;", "0.30000000000000004")]
#[case("1 < 2 && 2 < 3;", "true")]
#[case("007 == 7;", "false")]
#[case("1 == 1.0;", "false")]
#[case("2 ** 100;", "1.2676506002282294e+30")]
#[case("10 ** 21;", "1e+21")]
#[case("1 / 10000000;", "1e-7")]
fn expression_results(#[case] source: &str, #[case] expected: &str) {
    let (mut interpreter, output) = session();
    run(source, &mut interpreter, true).unwrap();
    assert_eq!(output.text(), format!("{}\n", expected));
}

#[test]
fn division_by_zero_is_an_error() {
    assert!(matches!(
        failure("5 / 0;"),
        Error::Runtime(RuntimeError::Evaluation(EvaluationError::DivisionByZero))
    ));
}

#[test]
fn errors_report_the_pipeline_stage() {
    assert!(matches!(
        failure("var x = @;"),
        Error::Lexical(LexicalError::UnexpectedCharacter { character: '@', line: 1 })
    ));
    assert!(matches!(
        failure("var x = ;"),
        Error::Parse(ParseError::Unexpected { line: 1, .. })
    ));
    assert_eq!(
        failure("\n\nconst y;").to_string(),
        "[line 3] Parse Error: Constant 'y' must be initialized."
    );
    assert_eq!(failure("missing;").to_string(), "Undefined variable 'missing'.");
}

#[test]
fn session_survives_a_failed_line() {
    let (mut interpreter, output) = session();
    run("var total = 1;", &mut interpreter, true).unwrap();
    assert!(run("total = total / 0;", &mut interpreter, true).is_err());
    run("total + 1;", &mut interpreter, true).unwrap();
    assert_eq!(output.text(), "1\n2\n");
}

#[test]
fn comments_and_whitespace_only() {
    let (mut interpreter, _) = session();
    let values = run("// nothing\n/* at\n all */  \n", &mut interpreter, true).unwrap();
    assert!(values.is_empty());
}
