use crate::interpreter::RuntimeError;
use crate::scanner::token::{Token, TokenType};
use crate::span::Span;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Which stage raised the diagnostic. Scan and parse problems are both syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Syntax,
    Runtime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Unspecified,
    AtEnd,
    AtLexeme(String),
}

impl Location {
    fn of(token: &Token) -> Self {
        if token.token_type == TokenType::Eof {
            Location::AtEnd
        } else {
            Location::AtLexeme(token.lexeme.clone())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub severity: Severity,
    pub span: Span,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        write!(
            f,
            "[line {}, column {}] {}",
            self.span.line, self.span.col, label
        )?;
        match &self.location {
            Location::Unspecified => {}
            Location::AtEnd => write!(f, " at end")?,
            Location::AtLexeme(lexeme) => write!(f, " at '{}'", lexeme)?,
        }
        write!(f, ": {}", self.message)
    }
}

/// Everything the scanner, parser and interpreter had to complain about during
/// a session, plus the two sticky flags the driver checks between stages.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    had_syntax_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lexical error with no meaningful lexeme to point at.
    pub fn lexical_error(&mut self, span: Span, message: impl Into<String>) {
        self.had_syntax_error = true;
        self.push(Phase::Syntax, Severity::Error, span, Location::Unspecified, message);
    }

    pub fn lexical_warning(&mut self, span: Span, message: impl Into<String>) {
        self.push(Phase::Syntax, Severity::Warning, span, Location::Unspecified, message);
    }

    pub fn syntax_error(&mut self, token: &Token, message: impl Into<String>) {
        self.had_syntax_error = true;
        self.push(
            Phase::Syntax,
            Severity::Error,
            token.span,
            Location::of(token),
            message,
        );
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        self.had_runtime_error = true;
        self.push(
            Phase::Runtime,
            Severity::Error,
            error.token.span,
            Location::of(&error.token),
            error.message.clone(),
        );
    }

    fn push(
        &mut self,
        phase: Phase,
        severity: Severity,
        span: Span,
        location: Location,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            phase,
            severity,
            span,
            location,
            message: message.into(),
        };
        tracing::debug!(%diagnostic, "recorded diagnostic");
        self.entries.push(diagnostic);
    }

    pub fn had_syntax_error(&self) -> bool {
        self.had_syntax_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    /// Hands over the recorded entries; the flags stay set.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    /// Clears entries and flags, e.g. between two REPL lines.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.had_syntax_error = false;
        self.had_runtime_error = false;
    }
}

/// Header line followed by the offending source line and a caret underline.
pub fn render(source: &str, diagnostic: &Diagnostic) -> String {
    let mut out = format!("{}\n", diagnostic);

    let line_idx = diagnostic.span.line.saturating_sub(1);
    let Some(source_line) = source.lines().nth(line_idx) else {
        // EOF sits one line past the end; there's nothing to underline.
        return out;
    };

    let line_num = diagnostic.span.line.to_string();
    let gutter_width = line_num.len();

    let pointer_col = diagnostic.span.col.saturating_sub(1);
    let pointer_len = diagnostic.span.length.max(1);

    // empty gutter line
    out.push_str(&format!("{:>width$} |\n", " ", width = gutter_width));

    // source line
    out.push_str(&format!(
        "{:>width$} | {}\n",
        diagnostic.span.line,
        source_line,
        width = gutter_width
    ));

    // pointer line
    let padding: String = source_line
        .chars()
        .take(pointer_col)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let carets = "^".repeat(pointer_len);
    out.push_str(&format!(
        "{:>width$} | {}{}\n",
        " ",
        padding,
        carets,
        width = gutter_width
    ));

    if let Some(hint) = suggest_hint(&diagnostic.message) {
        out.push_str(&format!(
            "{:>width$} = hint: {}\n",
            " ",
            hint,
            width = gutter_width
        ));
    }

    out
}

pub fn suggest_hint(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.starts_with("undefined variable") {
        return Some("declare it first, e.g. 'var name = value;'".into());
    }

    if msg.contains("two numbers or two strings") {
        return Some("'+' adds two numbers or joins two strings, not a mix".into());
    }

    if msg.contains("whole numbers") {
        return Some("'&' and '|' only work on numbers without a fractional part".into());
    }

    if msg.contains("invalid assignment target") {
        return Some("only a variable name can appear on the left of '='".into());
    }

    if msg.contains("missing left operand") {
        return Some("put an expression before the operator".into());
    }

    if msg.starts_with("expect ';'") {
        return Some("every statement ends with a semicolon".into());
    }

    None
}
