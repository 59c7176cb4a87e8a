use crate::error::LexicalError;
use crate::token::{Token, TokenKind};
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::debug;

struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
}

/// Turns source text into tokens, always terminated by an `Eof` token.
/// Whitespace and comments produce nothing; newlines only bump the line.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexicalError> {
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();

    while let Some(&(idx, _)) = scanner.iter.peek() {
        scanner.start = idx;
        if let Some(token) = scanner.scan_token()? {
            tokens.push(token);
        }
    }
    tokens.push(Token::new(TokenKind::Eof, "", scanner.line));
    debug!(tokens = tokens.len(), lines = scanner.line, "tokenized source");
    Ok(tokens)
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Option<Token>, LexicalError> {
        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(None),
        };
        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '+' => {
                if self.next_if('+') {
                    TokenKind::PlusPlus
                } else if self.next_if('=') {
                    TokenKind::PlusEqual
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.next_if('-') {
                    TokenKind::MinusMinus
                } else if self.next_if('=') {
                    TokenKind::MinusEqual
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.next_if('*') {
                    TokenKind::StarStar
                } else if self.next_if('=') {
                    TokenKind::StarEqual
                } else {
                    TokenKind::Star
                }
            }
            '%' => {
                if self.next_if('=') {
                    TokenKind::PercentEqual
                } else {
                    TokenKind::Percent
                }
            }
            '/' => {
                if self.next_if('/') {
                    self.line_comment();
                    return Ok(None);
                } else if self.next_if('*') {
                    self.block_comment();
                    return Ok(None);
                } else if self.next_if('=') {
                    TokenKind::SlashEqual
                } else {
                    TokenKind::Slash
                }
            }
            '=' => {
                if self.next_if('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                if self.next_if('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            '>' => {
                if self.next_if('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '<' => {
                if self.next_if('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '&' if self.next_if('&') => TokenKind::AndAnd,
            '|' if self.next_if('|') => TokenKind::OrOr,
            ' ' | '\r' | '\t' => return Ok(None),
            '\n' => {
                self.line += 1;
                return Ok(None);
            }
            '"' | '\'' | '`' => return self.string(c).map(Some),
            '0'..='9' => return self.number().map(Some),
            'a'..='z' | 'A'..='Z' | '_' => return Ok(Some(self.identifier())),
            _ => {
                return Err(LexicalError::UnexpectedCharacter {
                    character: c,
                    line: self.line,
                })
            }
        };
        Ok(Some(self.token(kind)))
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, kind: TokenKind) -> Token {
        let current = self.current();
        Token::new(kind, &self.source[self.start..current], self.line)
    }
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().map(|&(_, c)| c)
    }
    fn next_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }
    fn advance(&mut self) -> Option<char> {
        self.iter.next().map(|(_, c)| c)
    }
    fn line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }
    fn block_comment(&mut self) {
        while let Some(c) = self.advance() {
            match c {
                '\n' => self.line += 1,
                '*' if self.next_if('/') => return,
                _ => {}
            }
        }
    }
    fn string(&mut self, delimiter: char) -> Result<Token, LexicalError> {
        let opened_on = self.line;
        loop {
            match self.advance() {
                None => return Err(LexicalError::UnterminatedString { line: opened_on }),
                Some(c) if c == delimiter => break,
                Some('\n') => self.line += 1,
                Some(_) => {}
            }
        }
        let current = self.current();
        let body = &self.source[self.start + 1..current - delimiter.len_utf8()];
        Ok(Token::new(TokenKind::String, body, opened_on))
    }
    fn number(&mut self) -> Result<Token, LexicalError> {
        while let Some('0'..='9' | '.') = self.peek() {
            self.advance();
        }
        let token = self.token(TokenKind::Number);
        if !is_number_literal(&token.text) {
            return Err(LexicalError::InvalidNumber {
                text: token.text,
                line: self.line,
            });
        }
        Ok(token)
    }
    fn identifier(&mut self) -> Token {
        while let Some('0'..='9' | 'a'..='z' | 'A'..='Z' | '_') = self.peek() {
            self.advance();
        }
        let current = self.current();
        match &self.source[self.start..current] {
            "true" | "false" => self.token(TokenKind::Boolean),
            _ => self.token(TokenKind::Identifier),
        }
    }
}

/// `^[0-9]+(\.[0-9]+)?$`
fn is_number_literal(text: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match text.split_once('.') {
        None => all_digits(text),
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
    }
}
