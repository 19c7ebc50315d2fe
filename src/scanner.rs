pub mod token;

use crate::diagnostics::Diagnostics;
use crate::keywords::{default_keywords, Keywords};
use crate::scanner::token::{Token, TokenType};
use crate::span::Span;

/// Scans `source` with the default keyword table.
pub fn scan(source: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let keywords = default_keywords();
    Scanner::new(source, &keywords, diagnostics).scan_tokens()
}

pub struct Scanner<'a> {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    line_start: usize,
    keywords: &'a Keywords,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &str, keywords: &'a Keywords, diagnostics: &'a mut Diagnostics) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
            keywords,
            diagnostics,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Always terminates and always ends with exactly one EOF token, placed one
    /// line past the last source line.
    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens
            .push(Token::new(TokenType::Eof, "", Span::new(self.line + 1, 1, 0)));
        tracing::debug!(tokens = self.tokens.len(), lines = self.line, "scanned source");
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '?' => self.add_token(TokenType::Question),
            ':' => self.add_token(TokenType::Colon),
            '&' => self.add_token(TokenType::Ampersand),
            '|' => self.add_token(TokenType::Pipe),

            // Dot, or a number written without its integer part (.5)
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.handle_number();
                } else {
                    self.add_token(TokenType::Dot);
                }
            }

            // One or two character tokens
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }

            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }

            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }

            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }

            '/' => {
                if self.match_char('/') {
                    // Comment goes until end of line
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                } else if self.match_char('*') {
                    self.handle_block_comment();
                } else {
                    self.add_token(TokenType::Slash);
                }
            }

            // Whitespace
            ' ' | '\r' | '\t' => {}
            '\n' => self.new_line(),

            '"' => self.handle_string(),

            c if c.is_ascii_digit() => self.handle_number(),

            c if c.is_alphabetic() || c == '_' => self.handle_identifier(),

            _ => {
                tracing::trace!(character = %c, "skipping unexpected character");
                self.report_error("Unexpected character.")
            }
        }
    }

    fn advance(&mut self) -> char {
        let ch = self.source[self.current];
        self.current += 1;
        ch
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.current += 1;
                true
            }
            _ => false,
        }
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.line_start = self.current;
    }

    fn handle_block_comment(&mut self) {
        self.add_token(TokenType::BlockCommentStart);
        let opening = self.span_of(self.start, self.current);

        loop {
            match (self.peek(), self.peek_next()) {
                (None, _) => {
                    self.diagnostics
                        .lexical_error(opening, "Unterminated block comment.");
                    return;
                }
                // Only the exact pair closes, a stray '*' or '/' is part of the body.
                (Some('*'), Some('/')) => {
                    self.start = self.current;
                    self.advance();
                    self.advance();
                    self.add_token(TokenType::BlockCommentEnd);
                    return;
                }
                (Some(_), _) => {
                    if self.advance() == '\n' {
                        self.new_line();
                    }
                }
            }
        }
    }

    fn handle_string(&mut self) {
        let mut value = String::new();
        let mut bad_escape = false;

        loop {
            match self.peek() {
                None => {
                    self.report_error("Unterminated string.");
                    return;
                }
                Some('\n') => {
                    // leave the newline for scan_token so line tracking stays right
                    self.report_error("Illegal new line character in string literal.");
                    return;
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let escape_start = self.current;
                    self.advance(); // consume the backslash
                    let Some(escaped) = self.peek().filter(|&c| c != '\n') else {
                        continue; // reported as unterminated on the next turn
                    };
                    self.advance();
                    match escaped {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        _ => {
                            let span = self.span_of(escape_start, self.current);
                            self.diagnostics.lexical_error(
                                span,
                                "Illegal escape character in string literal.",
                            );
                            bad_escape = true;
                        }
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        if !bad_escape {
            self.add_token(TokenType::String(value));
        }
    }

    fn handle_number(&mut self) {
        // First character is already consumed and is a digit or a leading '.'
        let mut seen_dot = self.source[self.start] == '.';

        loop {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }

            if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                if seen_dot {
                    // swallow the rest of the malformed literal so it can't resurface as tokens
                    while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                        self.advance();
                    }
                    self.report_error("Illegal character in number literal.");
                    return;
                }
                seen_dot = true;
                self.advance(); // consume '.'
            } else {
                break;
            }
        }

        let raw: String = self.source[self.start..self.current].iter().collect();
        match raw.parse::<f64>() {
            Ok(num) => {
                if num.is_infinite() {
                    let span = self.span_of(self.start, self.current);
                    self.diagnostics
                        .lexical_warning(span, "Number literal is out of range.");
                }
                self.add_token(TokenType::Number(num));
            }
            Err(_) => self.report_error(format!("Invalid number '{}'.", raw)),
        }
    }

    fn handle_identifier(&mut self) {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let token_type = self
            .keywords
            .get(&text)
            .cloned()
            .unwrap_or(TokenType::Identifier);

        self.add_token(token_type);
    }

    fn span_of(&self, start: usize, end: usize) -> Span {
        // A lexeme that started on an earlier line (only block comments do) has
        // no meaningful column on the current one.
        let col = if start >= self.line_start {
            start - self.line_start + 1
        } else {
            1
        };
        Span::new(self.line, col, end.saturating_sub(start).max(1))
    }

    fn add_token(&mut self, t: TokenType) {
        let text = self.source[self.start..self.current]
            .iter()
            .collect::<String>();
        let span = self.span_of(self.start, self.current);
        let token = Token::new(t, text, span);
        tracing::trace!(%token, "token");
        self.tokens.push(token);
    }

    fn report_error(&mut self, message: impl Into<String>) {
        let span = self.span_of(self.start, self.current);
        self.diagnostics.lexical_error(span, message);
    }
}
