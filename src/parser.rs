use crate::ast::{BinaryOp, Node, Program, UnaryOp, UpdateOp};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};
use phf::phf_map;
use std::rc::Rc;
use tracing::debug;

/// Reserved words. The scanner hands these over as plain identifiers;
/// only the parser gives them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Var,
    Const,
    If,
    Else,
    While,
    For,
    Function,
    Return,
    Delete,
    Null,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "var" => Keyword::Var,
    "const" => Keyword::Const,
    "if" => Keyword::If,
    "else" => Keyword::Else,
    "while" => Keyword::While,
    "for" => Keyword::For,
    "function" => Keyword::Function,
    "return" => Keyword::Return,
    "delete" => Keyword::Delete,
    "null" => Keyword::Null,
};

fn keyword(token: &Token) -> Option<Keyword> {
    match token.kind {
        TokenKind::Identifier => KEYWORDS.get(token.text.as_str()).copied(),
        _ => None,
    }
}

pub fn parse(tokens: &[Token]) -> Result<Program, ParseError> {
    let program = Parser::new(tokens)?.parse()?;
    debug!(nodes = program.body.len(), "parsed program");
    Ok(program)
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Parser<'a> {
    /// The token slice must end with an `Eof` token, as `tokenize` guarantees.
    pub fn new(tokens: &'a [Token]) -> Result<Parser<'a>, ParseError> {
        match tokens.last() {
            Some(last) if last.kind == TokenKind::Eof => Ok(Parser { tokens, current: 0 }),
            last => Err(ParseError::Unexpected {
                expected: TokenKind::Eof.to_string(),
                found: last.map_or_else(String::new, |t| t.text.clone()),
                line: last.map_or(1, |t| t.line),
            }),
        }
    }
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut body: Vec<Node> = Vec::new();
        while !self.is_at_end() {
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }
    fn statement(&mut self) -> Result<Node, ParseError> {
        if self.next_if(TokenKind::Semicolon) {
            return Ok(Node::Empty);
        }
        if self.check(TokenKind::LeftBrace) {
            return self.block();
        }
        match keyword(self.peek()) {
            Some(Keyword::Var) => self.var_declaration(false),
            Some(Keyword::Const) => self.var_declaration(true),
            Some(Keyword::If) => self.if_statement(),
            Some(Keyword::While) => self.while_statement(),
            Some(Keyword::For) => self.for_statement(),
            Some(Keyword::Function) => self.function_declaration(),
            Some(Keyword::Return) => self.return_statement(),
            Some(Keyword::Delete) => self.delete_statement(),
            _ => self.expression_statement(),
        }
    }
    fn var_declaration(&mut self, constant: bool) -> Result<Node, ParseError> {
        self.advance();
        let name_line = self.peek().line;
        let name = self.name("variable name")?;
        let initializer = if self.next_if(TokenKind::Equal) {
            Some(Box::new(self.expression()?))
        } else if constant {
            return Err(ParseError::UninitializedConstant {
                name,
                line: name_line,
            });
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "';' after variable declaration")?;
        Ok(Node::VarDeclaration {
            name,
            initializer,
            constant,
        })
    }
    fn if_statement(&mut self) -> Result<Node, ParseError> {
        self.advance();
        self.consume(TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after if condition")?;
        let then_branch = self.block()?;
        let else_branch = if keyword(self.peek()) == Some(Keyword::Else) {
            self.advance();
            if keyword(self.peek()) == Some(Keyword::If) {
                Some(Box::new(self.if_statement()?))
            } else {
                Some(Box::new(self.block()?))
            }
        } else {
            None
        };
        Ok(Node::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }
    fn while_statement(&mut self) -> Result<Node, ParseError> {
        self.advance();
        self.consume(TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after while condition")?;
        let body = self.block()?;
        Ok(Node::While {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }
    fn for_statement(&mut self) -> Result<Node, ParseError> {
        self.advance();
        self.consume(TokenKind::LeftParen, "'(' after 'for'")?;

        let init = match keyword(self.peek()) {
            Some(Keyword::Var) => self.var_declaration(false)?,
            Some(Keyword::Const) => self.var_declaration(true)?,
            _ => {
                if self.check(TokenKind::Semicolon) {
                    return Err(self.error("for loop initializer"));
                }
                let init = self.expression()?;
                self.consume(TokenKind::Semicolon, "';' after for loop initializer")?;
                init
            }
        };

        if self.check(TokenKind::Semicolon) {
            return Err(self.error("for loop condition"));
        }
        let condition = self.expression()?;
        self.consume(TokenKind::Semicolon, "';' after for loop condition")?;

        if self.check(TokenKind::RightParen) {
            return Err(self.error("for loop update"));
        }
        let update = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after for loop clauses")?;

        let body = self.block()?;
        Ok(Node::For {
            init: Box::new(init),
            condition: Box::new(condition),
            update: Box::new(update),
            body: Box::new(body),
        })
    }
    fn function_declaration(&mut self) -> Result<Node, ParseError> {
        self.advance();
        let name = self.name("function name")?;
        self.consume(TokenKind::LeftParen, "'(' after function name")?;
        let mut params: Vec<String> = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.name("parameter name")?);
                if !self.next_if(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after parameters")?;
        let body = match self.block()? {
            Node::Block(statements) => statements,
            other => vec![other],
        };
        Ok(Node::Function {
            name,
            params,
            body: Rc::new(body),
        })
    }
    fn return_statement(&mut self) -> Result<Node, ParseError> {
        self.advance();
        let value = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        self.next_if(TokenKind::Semicolon);
        Ok(Node::Return(value))
    }
    fn delete_statement(&mut self) -> Result<Node, ParseError> {
        self.advance();
        let name = self.name("variable name after 'delete'")?;
        self.consume(TokenKind::Semicolon, "';' after delete")?;
        Ok(Node::Delete(name))
    }
    fn block(&mut self) -> Result<Node, ParseError> {
        self.consume(TokenKind::LeftBrace, "'{'")?;
        let mut statements: Vec<Node> = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }
        self.consume(TokenKind::RightBrace, "'}' after block")?;
        Ok(Node::Block(statements))
    }
    fn expression_statement(&mut self) -> Result<Node, ParseError> {
        let expr = self.expression()?;
        self.next_if(TokenKind::Semicolon);
        Ok(expr)
    }
    fn expression(&mut self) -> Result<Node, ParseError> {
        self.assignment()
    }
    fn assignment(&mut self) -> Result<Node, ParseError> {
        let expr = self.logical()?;
        let compound = match self.peek().kind {
            TokenKind::Equal => None,
            TokenKind::PlusEqual => Some(BinaryOp::Add),
            TokenKind::MinusEqual => Some(BinaryOp::Subtract),
            TokenKind::StarEqual => Some(BinaryOp::Multiply),
            TokenKind::SlashEqual => Some(BinaryOp::Divide),
            TokenKind::PercentEqual => Some(BinaryOp::Remainder),
            _ => return Ok(expr),
        };
        let equals = self.advance();
        let value = self.assignment()?;
        let name = match expr {
            Node::Identifier(name) => name,
            _ => {
                return Err(ParseError::InvalidTarget {
                    operator: format!("'{}'", equals.text),
                    line: equals.line,
                })
            }
        };
        let value = match compound {
            None => value,
            Some(operator) => Node::Binary {
                left: Box::new(Node::Identifier(name.clone())),
                operator,
                right: Box::new(value),
            },
        };
        Ok(Node::Assign {
            name,
            value: Box::new(value),
        })
    }
    fn logical(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.comparison()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::AndAnd => BinaryOp::And,
                TokenKind::OrOr => BinaryOp::Or,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn comparison(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.addition()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::BangEqual => BinaryOp::NotEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                _ => break,
            };
            self.advance();
            let right = self.addition()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn addition(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.multiplication()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.multiplication()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn multiplication(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.unary()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Remainder,
                TokenKind::StarStar => BinaryOp::Power,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn unary(&mut self) -> Result<Node, ParseError> {
        let operator = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let operator = self.advance();
                let operand = self.unary()?;
                return update(operator, operand);
            }
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Node::Unary {
            operator,
            operand: Box::new(operand),
        })
    }
    fn postfix(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.primary()?;
        while self.next_if(TokenKind::LeftBracket) {
            let index = self.expression()?;
            self.consume(TokenKind::RightBracket, "']' after index")?;
            expr = Node::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        match self.peek().kind {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let operator = self.advance();
                update(operator, expr)
            }
            _ => Ok(expr),
        }
    }
    fn primary(&mut self) -> Result<Node, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Node::Number(token.text.clone()))
            }
            TokenKind::String => {
                self.advance();
                Ok(Node::String(token.text.clone()))
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(Node::Boolean(token.text == "true"))
            }
            TokenKind::Identifier => match keyword(token) {
                Some(Keyword::Null) => {
                    self.advance();
                    Ok(Node::Null)
                }
                Some(_) => Err(self.error("expression")),
                None => {
                    self.advance();
                    if self.next_if(TokenKind::LeftParen) {
                        let arguments = self.arguments(TokenKind::RightParen, "')' after arguments")?;
                        Ok(Node::Call {
                            callee: token.text.clone(),
                            arguments,
                        })
                    } else {
                        Ok(Node::Identifier(token.text.clone()))
                    }
                }
            },
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "')' after expression")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => {
                self.advance();
                let elements = self.arguments(TokenKind::RightBracket, "']' after array elements")?;
                Ok(Node::Array(elements))
            }
            _ => Err(self.error("expression")),
        }
    }
    /// Comma separated expressions up to and including `close`.
    fn arguments(&mut self, close: TokenKind, expected: &str) -> Result<Vec<Node>, ParseError> {
        let mut arguments: Vec<Node> = Vec::new();
        if !self.check(close) {
            loop {
                arguments.push(self.expression()?);
                if !self.next_if(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(close, expected)?;
        Ok(arguments)
    }
    /// An identifier that is not a reserved word.
    fn name(&mut self, expected: &str) -> Result<String, ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::Identifier && keyword(token).is_none() {
            self.advance();
            Ok(token.text.clone())
        } else {
            Err(self.error(expected))
        }
    }
    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }
    fn next_if(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }
    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }
    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }
    fn peek(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[self.current.min(tokens.len() - 1)]
    }
    fn error(&self, expected: &str) -> ParseError {
        let found = self.peek();
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: match found.kind {
                TokenKind::Eof => found.kind.to_string(),
                _ => found.text.clone(),
            },
            line: found.line,
        }
    }
}

fn binary(left: Node, operator: BinaryOp, right: Node) -> Node {
    Node::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

fn update(operator: &Token, operand: Node) -> Result<Node, ParseError> {
    let op = match operator.kind {
        TokenKind::PlusPlus => UpdateOp::Increment,
        _ => UpdateOp::Decrement,
    };
    match operand {
        Node::Identifier(name) => Ok(Node::Update { operator: op, name }),
        _ => Err(ParseError::InvalidTarget {
            operator: format!("'{}'", operator.text),
            line: operator.line,
        }),
    }
}
