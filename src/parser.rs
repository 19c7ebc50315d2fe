pub mod ast;

use crate::diagnostics::Diagnostics;
use crate::parser::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::scanner::token::{Literal, Token, TokenType};
use crate::span::Span;

/// Parses `tokens` into statements. The flag is true when any syntax error
/// (scan or parse) has been recorded, in which case nothing should be run.
pub fn parse(tokens: Vec<Token>, diagnostics: &mut Diagnostics) -> (Vec<Stmt>, bool) {
    let statements = Parser::new(tokens, diagnostics).parse();
    (statements, diagnostics.had_syntax_error())
}

// The diagnostic is recorded where the error is found; this only unwinds the
// current statement back to the recovery point in `parse`.
#[derive(Debug)]
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

// Caps on nested sub-expressions being parsed at once and on the height of
// any finished expression tree. Both keep parsing and evaluation off the
// end of the stack.
const MAX_NESTING: usize = 64;
const MAX_EXPR_HEIGHT: usize = 256;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'a mut Diagnostics) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !t.is_comment_marker())
            .collect();

        // Everything below relies on a trailing EOF
        if tokens.last().map(|t| &t.token_type) != Some(&TokenType::Eof) {
            let line = tokens.last().map_or(1, |t| t.span.line + 1);
            tokens.push(Token::new(TokenType::Eof, "", Span::new(line, 1, 0)));
        }

        Self {
            tokens,
            current: 0,
            depth: 0,
            diagnostics,
        }
    }

    // utility methods
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        &self.peek().token_type == token_type
    }

    fn match_any(&mut self, types: &[TokenType]) -> bool {
        for t in types {
            if self.check(t) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        self.diagnostics.syntax_error(token, message);
        ParseError
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> ParseResult<&Token> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.error(&token, message))
        }
    }

    fn nested<T, F>(&mut self, parse: F) -> ParseResult<T>
    where
        F: FnOnce(&mut Self) -> ParseResult<T>,
    {
        if self.depth >= MAX_NESTING {
            let token = self.peek().clone();
            return Err(self.error(&token, "Too much nesting."));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => {
                    tracing::trace!(?stmt, "parsed statement");
                    statements.push(stmt);
                }
                Err(ParseError) => self.synchronize(), // skip to next statement
            }
        }

        tracing::debug!(
            statements = statements.len(),
            had_error = self.diagnostics.had_syntax_error(),
            "parsed program"
        );
        statements
    }

    fn synchronize(&mut self) {
        self.advance(); // Skip the token that caused the error

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance(); // Keep skipping
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.match_any(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let span = self.previous().span;
        let name = self
            .consume(TokenType::Identifier, "Expect variable name.")?
            .clone();

        let initializer = if self.match_any(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt {
            kind: StmtKind::Var { name, initializer },
            span,
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_any(&[TokenType::Print]) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let span = keyword.span;
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;

        Ok(Stmt {
            kind: StmtKind::Print { keyword, expr },
            span,
        })
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let span = self.peek().span;
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;

        Ok(Stmt {
            kind: StmtKind::Expression(expr),
            span,
        })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.conditional()?;

        if self.match_any(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = self.nested(|p| p.assignment())?; // right-associative

            if let ExprKind::Variable { name } = &expr.kind {
                return Ok(Expr::new(
                    ExprKind::Assign {
                        name: name.clone(),
                        value: Box::new(value),
                    },
                    equals.span,
                ));
            }

            // Reported, but the statement is still well-formed without the assignment
            self.error(&equals, "Invalid assignment target.");
        }

        Ok(expr)
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let condition = self.equality()?;

        if self.match_any(&[TokenType::Question]) {
            let span = self.previous().span;
            let then_branch = self.nested(|p| p.expression())?;
            self.consume(
                TokenType::Colon,
                "Expect ':' in conditional expression.",
            )?;
            let else_branch = self.nested(|p| p.conditional())?; // right-associative

            return Ok(Expr::new(
                ExprKind::Conditional {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
                span,
            ));
        }

        Ok(condition)
    }

    // Every left-associative binary tier has the same shape, only the operators
    // and the next tier differ.
    fn binary_expression<F>(&mut self, tokens: &[TokenType], mut next_precedence: F) -> ParseResult<Expr>
    where
        F: FnMut(&mut Self) -> ParseResult<Expr>,
    {
        let mut left = next_precedence(self)?;

        while self.match_any(tokens) {
            let operator = self.previous().clone();
            let span = operator.span;
            let right = next_precedence(self)?;

            // Long operator chains deepen the tree without recursing here
            if left.height().max(right.height()) >= MAX_EXPR_HEIGHT {
                return Err(self.error(&operator, "Too much nesting."));
            }

            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_expression(&[TokenType::BangEqual, TokenType::EqualEqual], |p| {
            p.comparison()
        })
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_expression(
            &[
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
            ],
            |p| p.bitwise(),
        )
    }

    fn bitwise(&mut self) -> ParseResult<Expr> {
        self.binary_expression(&[TokenType::Ampersand, TokenType::Pipe], |p| p.term())
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_expression(&[TokenType::Plus, TokenType::Minus], |p| p.factor())
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary_expression(&[TokenType::Star, TokenType::Slash], |p| p.unary())
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_any(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let span = operator.span;
            let operand = self.nested(|p| p.unary())?; // recursive for chained unary: !!x
            Ok(Expr::new(
                ExprKind::Unary {
                    operator,
                    operand: Box::new(operand),
                },
                span,
            ))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let span = token.span;

        if let Some(literal) = token.literal() {
            self.advance();
            return Ok(Expr::new(ExprKind::Literal(literal), span));
        }

        match &token.token_type {
            TokenType::Nil => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Nil), span))
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expr::new(ExprKind::Variable { name: token }, span))
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.nested(|p| p.expression())?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                Ok(Expr::new(ExprKind::Grouping(Box::new(expr)), span))
            }

            // A binary operator where an operand should start: the left side is missing.
            TokenType::EqualEqual | TokenType::BangEqual => {
                self.missing_left_operand(|p| p.equality())
            }
            TokenType::Greater
            | TokenType::GreaterEqual
            | TokenType::Less
            | TokenType::LessEqual => self.missing_left_operand(|p| p.comparison()),
            TokenType::Ampersand | TokenType::Pipe => self.missing_left_operand(|p| p.bitwise()),
            TokenType::Plus => self.missing_left_operand(|p| p.term()),
            TokenType::Star | TokenType::Slash => self.missing_left_operand(|p| p.factor()),

            _ => Err(self.error(&token, "Expect expression.")),
        }
    }

    fn missing_left_operand<F>(&mut self, mut right_operand: F) -> ParseResult<Expr>
    where
        F: FnMut(&mut Self) -> ParseResult<Expr>,
    {
        let operator = self.advance().clone();
        self.error(&operator, "Missing left operand.");
        // consume the orphaned right-hand side so recovery starts after it
        self.nested(|p| right_operand(p))?;
        Err(ParseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::parenthesize;
    use crate::scanner::scan;

    fn parse_source(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let (statements, _) = parse(tokens, &mut diagnostics);
        (statements, diagnostics)
    }

    fn parse_expr(source: &str) -> String {
        let (statements, diagnostics) = parse_source(source);
        assert!(
            !diagnostics.had_syntax_error(),
            "unexpected errors: {:?}",
            diagnostics.entries()
        );
        match &statements[0].kind {
            StmtKind::Expression(expr) => parenthesize(expr),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn error_messages(diagnostics: &Diagnostics) -> Vec<String> {
        diagnostics.entries().iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn parse_precedence() {
        assert_eq!(parse_expr("1 + 2 * 3;"), "(1 + (2 * 3))");
        assert_eq!(parse_expr("1 + 2 & 3 < 4;"), "(((1 + 2) & 3) < 4)");
        assert_eq!(parse_expr("1 < 2 == 3 > 4;"), "((1 < 2) == (3 > 4))");
        assert_eq!(parse_expr("!-1 / 2;"), "((!(-1)) / 2)");
    }

    #[test]
    fn parse_binary_tiers_are_left_associative() {
        assert_eq!(parse_expr("1 - 2 - 3;"), "((1 - 2) - 3)");
        assert_eq!(parse_expr("8 / 4 * 2;"), "((8 / 4) * 2)");
        assert_eq!(parse_expr("1 | 2 & 3;"), "((1 | 2) & 3)");
    }

    #[test]
    fn parse_negated_product_with_grouping() {
        let (statements, diagnostics) = parse_source("-123 * (45.67);");
        assert!(diagnostics.entries().is_empty());

        let StmtKind::Expression(expr) = &statements[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary {
            left,
            operator,
            right,
        } = &expr.kind
        else {
            panic!("expected binary, got {:?}", expr.kind);
        };
        assert_eq!(operator.token_type, TokenType::Star);
        assert!(matches!(
            &left.kind,
            ExprKind::Unary { operator, operand }
                if operator.token_type == TokenType::Minus
                    && operand.kind == ExprKind::Literal(Literal::Number(123.0))
        ));
        assert!(matches!(
            &right.kind,
            ExprKind::Grouping(inner) if inner.kind == ExprKind::Literal(Literal::Number(45.67))
        ));
    }

    #[test]
    fn parse_conditional_is_right_associative_and_below_equality() {
        assert_eq!(parse_expr("a ? b : c ? d : e;"), "(a ? b : (c ? d : e))");
        assert_eq!(parse_expr("1 == 2 ? 3 : 4;"), "((1 == 2) ? 3 : 4)");
    }

    #[test]
    fn parse_assignment_is_right_associative() {
        assert_eq!(parse_expr("a = b = 1;"), "(a = (b = 1))");
        assert_eq!(parse_expr("a = true ? 1 : 2;"), "(a = (true ? 1 : 2))");
    }

    #[test]
    fn parse_declarations_and_print() {
        let (statements, diagnostics) = parse_source("var a; var b = 2; print a;");
        assert!(diagnostics.entries().is_empty());
        assert_eq!(statements.len(), 3);
        assert!(matches!(
            &statements[0].kind,
            StmtKind::Var { name, initializer: None } if name.lexeme == "a"
        ));
        assert!(matches!(
            &statements[1].kind,
            StmtKind::Var { initializer: Some(_), .. }
        ));
        assert!(matches!(&statements[2].kind, StmtKind::Print { .. }));
    }

    #[test]
    fn parse_ignores_block_comment_markers() {
        let (statements, diagnostics) = parse_source("print /* the answer */ 42;");
        assert!(diagnostics.entries().is_empty());
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn parse_error_on_missing_closing_paren() {
        let (_, diagnostics) = parse_source("(1 + 2");
        assert_eq!(
            error_messages(&diagnostics),
            vec!["[line 2, column 1] Error at end: Expect ')' after expression."]
        );
    }

    #[test]
    fn parse_error_on_missing_semicolon() {
        let (_, diagnostics) = parse_source("print 1");
        assert_eq!(
            error_messages(&diagnostics),
            vec!["[line 2, column 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn parse_invalid_assignment_target_keeps_statement() {
        let (statements, diagnostics) = parse_source("1 = 2; print 3;");
        assert_eq!(
            error_messages(&diagnostics),
            vec!["[line 1, column 3] Error at '=': Invalid assignment target."]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn parse_missing_left_operand_drops_only_that_statement() {
        let (statements, diagnostics) = parse_source("== 1; print 2;");
        assert_eq!(
            error_messages(&diagnostics),
            vec!["[line 1, column 1] Error at '==': Missing left operand."]
        );
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0].kind, StmtKind::Print { .. }));
    }

    #[test]
    fn parse_missing_left_operand_for_every_binary_tier() {
        for source in ["!= 1;", ">= 1;", "< 1;", "& 1;", "| 1;", "+ 1;", "* 1;", "/ 1;"] {
            let (statements, diagnostics) = parse_source(source);
            assert!(statements.is_empty(), "{}", source);
            assert_eq!(diagnostics.entries().len(), 1, "{}", source);
            assert_eq!(diagnostics.entries()[0].message, "Missing left operand.");
        }
    }

    #[test]
    fn parse_reports_multiple_errors_in_one_pass() {
        let (statements, diagnostics) = parse_source("print ;\nvar = 1;\n1 + ;\nprint 4;");
        assert_eq!(
            error_messages(&diagnostics),
            vec![
                "[line 1, column 7] Error at ';': Expect expression.",
                "[line 2, column 5] Error at '=': Expect variable name.",
                "[line 3, column 5] Error at ';': Expect expression.",
            ]
        );
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn parse_synchronizes_at_statement_keyword() {
        let (statements, diagnostics) = parse_source("var 1 print 2;");
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0].kind, StmtKind::Print { .. }));
    }

    #[test]
    fn parse_conditional_missing_colon() {
        let (_, diagnostics) = parse_source("true ? 1 2;");
        assert_eq!(
            error_messages(&diagnostics),
            vec!["[line 1, column 10] Error at '2': Expect ':' in conditional expression."]
        );
    }

    #[test]
    fn parse_reports_deep_nesting_instead_of_overflowing() {
        let depth = 50_000;
        let source = format!("print {}1{}; print 2;", "(".repeat(depth), ")".repeat(depth));
        let (statements, diagnostics) = parse_source(&source);

        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(diagnostics.entries()[0].message, "Too much nesting.");
        // recovery still picks up the next statement
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn parse_nesting_cap_covers_every_recursive_rule() {
        let deep = 10_000;
        let sources = [
            format!("{}1;", "-".repeat(deep)),
            format!("{}1;", "a = ".repeat(deep)),
            format!("{}1;", "true ? 1 : ".repeat(deep)),
            format!("{}1;", "true ? ".repeat(deep)),
            format!("{}1;", "== ".repeat(deep)),
        ];
        for source in &sources {
            let (_, diagnostics) = parse_source(source);
            assert!(
                diagnostics
                    .entries()
                    .iter()
                    .any(|d| d.message == "Too much nesting."),
                "{}",
                &source[..20]
            );
        }
    }

    #[test]
    fn parse_long_operator_chain_is_capped() {
        let (statements, diagnostics) = parse_source(&format!("1{};", " + 1".repeat(100_000)));
        assert!(statements.is_empty());
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(diagnostics.entries()[0].message, "Too much nesting.");
    }

    #[test]
    fn parse_moderate_nesting_is_fine() {
        let grouped = format!("{}1{};", "(".repeat(60), ")".repeat(60));
        assert!(parse_expr(&grouped).starts_with("(((("));

        let chain = format!("1{};", " + 1".repeat(199));
        assert!(parse_expr(&chain).ends_with("+ 1)"));
    }

    #[test]
    fn parse_tolerates_token_stream_without_eof() {
        let mut diagnostics = Diagnostics::new();
        let mut tokens = scan("print 1;", &mut diagnostics);
        tokens.pop();

        let (statements, had_error) = parse(tokens, &mut diagnostics);
        assert!(!had_error);
        assert_eq!(statements.len(), 1);
    }
}
