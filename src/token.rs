use std::fmt;
use strum_macros::AsRefStr;

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum TokenKind {
    // Literals.
    #[strum(serialize = "number")] Number,
    #[strum(serialize = "string")] String,
    #[strum(serialize = "boolean")] Boolean,
    #[strum(serialize = "identifier")] Identifier,

    // Arithmetic.
    #[strum(serialize = "+")] Plus,
    #[strum(serialize = "-")] Minus,
    #[strum(serialize = "*")] Star,
    #[strum(serialize = "/")] Slash,
    #[strum(serialize = "%")] Percent,
    #[strum(serialize = "**")] StarStar,
    #[strum(serialize = "++")] PlusPlus,
    #[strum(serialize = "--")] MinusMinus,

    // Assignment.
    #[strum(serialize = "=")] Equal,
    #[strum(serialize = "+=")] PlusEqual,
    #[strum(serialize = "-=")] MinusEqual,
    #[strum(serialize = "*=")] StarEqual,
    #[strum(serialize = "/=")] SlashEqual,
    #[strum(serialize = "%=")] PercentEqual,

    // Comparison and logic.
    #[strum(serialize = "==")] EqualEqual,
    #[strum(serialize = "!=")] BangEqual,
    #[strum(serialize = ">")] Greater,
    #[strum(serialize = ">=")] GreaterEqual,
    #[strum(serialize = "<")] Less,
    #[strum(serialize = "<=")] LessEqual,
    #[strum(serialize = "&&")] AndAnd,
    #[strum(serialize = "||")] OrOr,
    #[strum(serialize = "!")] Bang,

    // Punctuation.
    #[strum(serialize = "(")] LeftParen,
    #[strum(serialize = ")")] RightParen,
    #[strum(serialize = "{")] LeftBrace,
    #[strum(serialize = "}")] RightBrace,
    #[strum(serialize = "[")] LeftBracket,
    #[strum(serialize = "]")] RightBracket,
    #[strum(serialize = ",")] Comma,
    #[strum(serialize = ".")] Dot,
    #[strum(serialize = ":")] Colon,
    #[strum(serialize = ";")] Semicolon,

    #[strum(serialize = "end of input")] Eof,
}

// The `Display` derive reads braces as format placeholders.
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
        }
    }
}
