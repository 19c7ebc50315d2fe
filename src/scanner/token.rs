use crate::span::Span;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, span: Span) -> Self {
        Token {
            token_type,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// The literal value carried by this token, if any. `nil` carries none.
    pub fn literal(&self) -> Option<Literal> {
        match &self.token_type {
            TokenType::Number(n) => Some(Literal::Number(*n)),
            TokenType::String(s) => Some(Literal::Str(s.clone())),
            TokenType::True => Some(Literal::Bool(true)),
            TokenType::False => Some(Literal::Bool(false)),
            _ => None,
        }
    }

    pub fn is_comment_marker(&self) -> bool {
        matches!(
            self.token_type,
            TokenType::BlockCommentStart | TokenType::BlockCommentEnd
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} '{}' [line {}, column {}]",
            self.token_type, self.lexeme, self.span.line, self.span.col
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,  // (
    RightParen, // )
    LeftBrace,  // {
    RightBrace, // }
    Comma,      // ,
    Dot,        // .
    Minus,      // -
    Plus,       // +
    Semicolon,  // ;
    Slash,      // /
    Star,       // *
    Question,   // ?
    Colon,      // :
    Ampersand,  // &
    Pipe,       // |

    // One or two character tokens
    Bang,         // !
    BangEqual,    // !=
    Equal,        // =
    EqualEqual,   // ==
    Greater,      // >
    GreaterEqual, // >=
    Less,         // <
    LessEqual,    // <=

    // Literals
    Identifier,
    String(String), // "hello world"
    Number(f64),    // 123, 45.67, .5

    // Keywords
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    // Comment markers
    BlockCommentStart, // /*
    BlockCommentEnd,   // */

    Eof,
}
