//! Two textual renderings of the AST, used by `--print-ast` / `--rpn` and by
//! the round-trip tests. `parenthesize` output is valid source again.

use crate::parser::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::scanner::token::{Literal, TokenType};

/// Fully parenthesized infix form, e.g. `((-123) * (45.67))`.
pub fn parenthesize(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(literal) => literal_source(literal),
        ExprKind::Grouping(inner) => format!("({})", parenthesize(inner)),
        ExprKind::Variable { name } => name.lexeme.clone(),
        ExprKind::Unary { operator, operand } => {
            format!("({}{})", operator.lexeme, parenthesize(operand))
        }
        ExprKind::Binary {
            left,
            operator,
            right,
        } => format!(
            "({} {} {})",
            parenthesize(left),
            operator.lexeme,
            parenthesize(right)
        ),
        ExprKind::Conditional {
            condition,
            then_branch,
            else_branch,
        } => format!(
            "({} ? {} : {})",
            parenthesize(condition),
            parenthesize(then_branch),
            parenthesize(else_branch)
        ),
        ExprKind::Assign { name, value } => {
            format!("({} = {})", name.lexeme, parenthesize(value))
        }
    }
}

pub fn parenthesize_stmt(stmt: &Stmt) -> String {
    match &stmt.kind {
        StmtKind::Expression(expr) => format!("{};", parenthesize(expr)),
        StmtKind::Print { keyword, expr } => {
            format!("{} {};", keyword.lexeme, parenthesize(expr))
        }
        StmtKind::Var {
            name,
            initializer: Some(init),
        } => format!("var {} = {};", name.lexeme, parenthesize(init)),
        StmtKind::Var {
            name,
            initializer: None,
        } => format!("var {};", name.lexeme),
    }
}

/// Reverse polish form: operands first, then the operator. Unary minus is
/// written `neg` to keep it apart from subtraction; groupings vanish.
pub fn rpn(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(Literal::Number(n)) if !n.is_finite() => {
            let source = if n.is_nan() {
                "0 0 /"
            } else if *n > 0.0 {
                "1 0 /"
            } else {
                "1 neg 0 /"
            };
            source.to_string()
        }
        ExprKind::Literal(literal) => literal_source(literal),
        ExprKind::Grouping(inner) => rpn(inner),
        ExprKind::Variable { name } => name.lexeme.clone(),
        ExprKind::Unary { operator, operand } => {
            let op = match operator.token_type {
                TokenType::Minus => "neg",
                _ => operator.lexeme.as_str(),
            };
            format!("{} {}", rpn(operand), op)
        }
        ExprKind::Binary {
            left,
            operator,
            right,
        } => format!("{} {} {}", rpn(left), rpn(right), operator.lexeme),
        ExprKind::Conditional {
            condition,
            then_branch,
            else_branch,
        } => format!(
            "{} {} {} ?:",
            rpn(condition),
            rpn(then_branch),
            rpn(else_branch)
        ),
        ExprKind::Assign { name, value } => format!("{} {} =", name.lexeme, rpn(value)),
    }
}

fn literal_source(literal: &Literal) -> String {
    match literal {
        // an out-of-range literal has no digits that read back as infinity
        Literal::Number(n) if n.is_nan() => "(0 / 0)".to_string(),
        Literal::Number(n) if *n > 0.0 && n.is_infinite() => "(1 / 0)".to_string(),
        Literal::Number(n) if n.is_infinite() => "(-1 / 0)".to_string(),
        Literal::Number(n) => n.to_string(),
        Literal::Str(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c => out.push(c),
                }
            }
            out.push('"');
            out
        }
        Literal::Bool(b) => b.to_string(),
        Literal::Nil => "nil".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::parser::parse;
    use crate::scanner::scan;

    fn statements(source: &str) -> Vec<Stmt> {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let (statements, had_error) = parse(tokens, &mut diagnostics);
        assert!(!had_error, "{:?}", diagnostics.entries());
        statements
    }

    fn first_expr(source: &str) -> Expr {
        match statements(source).remove(0).kind {
            StmtKind::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn parenthesize_every_expression_kind() {
        let expr = first_expr("x = !nil ? -1.5 : (\"a\" + y) == false;");
        assert_eq!(
            parenthesize(&expr),
            "(x = ((!nil) ? (-1.5) : (((\"a\" + y)) == false)))"
        );
    }

    #[test]
    fn parenthesize_reescapes_strings() {
        let expr = first_expr(r#""tab\there \"quoted\" back\\slash";"#);
        assert_eq!(parenthesize(&expr), r#""tab\there \"quoted\" back\\slash""#);
    }

    #[test]
    fn out_of_range_numbers_print_as_division_by_zero() {
        let huge = format!("1{}", "0".repeat(400));
        let expr = first_expr(&format!("{} + 1;", huge));
        assert_eq!(parenthesize(&expr), "((1 / 0) + 1)");
        assert_eq!(rpn(&expr), "1 0 / 1 +");
    }

    #[test]
    fn parenthesize_statements() {
        let rendered: Vec<String> = statements("var a; var b = 1 + 2; print b; b = 3;")
            .iter()
            .map(parenthesize_stmt)
            .collect();
        assert_eq!(
            rendered,
            vec!["var a;", "var b = (1 + 2);", "print b;", "(b = 3);"]
        );
    }

    #[test]
    fn rpn_of_negated_product() {
        assert_eq!(rpn(&first_expr("-123 * (45.67);")), "123 neg 45.67 *");
    }

    #[test]
    fn rpn_of_conditional_and_assignment() {
        assert_eq!(rpn(&first_expr("a = b > 1 ? !c : 2;")), "a b 1 > c ! 2 ?: =");
    }
}
