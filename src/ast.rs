use std::rc::Rc;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "!")]
    Not,
}

/// `++` / `--`. Always applied to a named binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UpdateOp {
    #[strum(serialize = "++")]
    Increment,
    #[strum(serialize = "--")]
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Remainder,
    #[strum(serialize = "**")]
    Power,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Kept as source text; see `Value::Number`.
    Number(String),
    String(String),
    Boolean(bool),
    Null,
    Identifier(String),
    VarDeclaration {
        name: String,
        initializer: Option<Box<Node>>,
        constant: bool,
    },
    Assign {
        name: String,
        value: Box<Node>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Node>,
    },
    Update {
        operator: UpdateOp,
        name: String,
    },
    Binary {
        left: Box<Node>,
        operator: BinaryOp,
        right: Box<Node>,
    },
    Block(Vec<Node>),
    If {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    For {
        init: Box<Node>,
        condition: Box<Node>,
        update: Box<Node>,
        body: Box<Node>,
    },
    Function {
        name: String,
        params: Vec<String>,
        body: Rc<Vec<Node>>,
    },
    Call {
        callee: String,
        arguments: Vec<Node>,
    },
    Return(Option<Box<Node>>),
    Delete(String),
    Array(Vec<Node>),
    Index {
        target: Box<Node>,
        index: Box<Node>,
    },
    Empty,
}

/// Root of a parsed source text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Node>,
}

pub trait Visitor<T, Output> {
    fn visit(&mut self, n: &T) -> Output;
}

impl Node {
    pub fn accept<T>(&self, v: &mut dyn Visitor<Node, T>) -> T {
        v.visit(self)
    }
}

/// Renders a tree as nested S-expressions, one line per top-level node.
pub struct AstPrinter {}

impl AstPrinter {
    pub fn print(program: &Program) -> String {
        let mut printer = AstPrinter {};
        program
            .body
            .iter()
            .map(|node| node.accept(&mut printer))
            .collect::<Vec<_>>()
            .join("\n")
    }
    fn parenthesize(&mut self, name: &str, args: Vec<&Node>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push(' ');
            x.push_str(arg.accept(self).as_str());
        }
        x.push(')');
        x
    }
    fn sequence(&mut self, name: &str, nodes: &[Node]) -> String {
        self.parenthesize(name, nodes.iter().collect())
    }
}

impl Visitor<Node, String> for AstPrinter {
    fn visit(&mut self, n: &Node) -> String {
        match n {
            Node::Number(x) => x.clone(),
            Node::String(x) => format!("{:?}", x),
            Node::Boolean(x) => x.to_string(),
            Node::Null => String::from("null"),
            Node::Identifier(x) => x.clone(),
            Node::VarDeclaration {
                name,
                initializer,
                constant,
            } => {
                let keyword = if *constant { "const" } else { "var" };
                match initializer {
                    Some(value) => {
                        self.parenthesize(&format!("{} {}", keyword, name), vec![value.as_ref()])
                    }
                    None => format!("({} {})", keyword, name),
                }
            }
            Node::Assign { name, value } => {
                self.parenthesize(&format!("assign {}", name), vec![value.as_ref()])
            }
            Node::Unary { operator, operand } => {
                self.parenthesize(&operator.to_string(), vec![operand.as_ref()])
            }
            Node::Update { operator, name } => format!("({} {})", operator, name),
            Node::Binary {
                left,
                operator,
                right,
            } => self.parenthesize(
                &operator.to_string(),
                vec![left.as_ref(), right.as_ref()],
            ),
            Node::Block(body) => self.sequence("block", body),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(otherwise) => self.parenthesize(
                    "if",
                    vec![condition.as_ref(), then_branch.as_ref(), otherwise.as_ref()],
                ),
                None => self.parenthesize("if", vec![condition.as_ref(), then_branch.as_ref()]),
            },
            Node::While { condition, body } => {
                self.parenthesize("while", vec![condition.as_ref(), body.as_ref()])
            }
            Node::For {
                init,
                condition,
                update,
                body,
            } => self.parenthesize(
                "for",
                vec![init.as_ref(), condition.as_ref(), update.as_ref(), body.as_ref()],
            ),
            Node::Function { name, params, body } => {
                self.sequence(&format!("fun {} ({})", name, params.join(" ")), body)
            }
            Node::Call { callee, arguments } => {
                self.sequence(&format!("call {}", callee), arguments)
            }
            Node::Return(value) => match value {
                Some(value) => self.parenthesize("return", vec![value.as_ref()]),
                None => String::from("(return)"),
            },
            Node::Delete(name) => format!("(delete {})", name),
            Node::Array(elements) => self.sequence("array", elements),
            Node::Index { target, index } => {
                self.parenthesize("index", vec![target.as_ref(), index.as_ref()])
            }
            Node::Empty => String::from("(empty)"),
        }
    }
}

#[cfg(test)]
mod ast_tests {
    use crate::ast::{AstPrinter, BinaryOp, Node, Program, UnaryOp};
    use pretty_assertions::assert_eq;

    #[test]
    fn basic_ast_test() {
        let expression = Node::Binary {
            left: Box::new(Node::Unary {
                operator: UnaryOp::Negate,
                operand: Box::new(Node::Number("123".to_string())),
            }),
            operator: BinaryOp::Multiply,
            right: Box::new(Node::Number("45.67".to_string())),
        };
        let program = Program {
            body: vec![expression],
        };
        assert_eq!(AstPrinter::print(&program), "(* (- 123) 45.67)");
    }

    #[test]
    fn statements_print_one_per_line() {
        let program = Program {
            body: vec![
                Node::VarDeclaration {
                    name: "greeting".to_string(),
                    initializer: Some(Box::new(Node::String("hi".to_string()))),
                    constant: true,
                },
                Node::Call {
                    callee: "print".to_string(),
                    arguments: vec![Node::Identifier("greeting".to_string()), Node::Null],
                },
                Node::Empty,
            ],
        };
        assert_eq!(
            AstPrinter::print(&program),
            "(const greeting \"hi\")\n(call print greeting null)\n(empty)"
        );
    }
}
