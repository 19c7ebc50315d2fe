use crate::scanner::token::{Literal, Token};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expression(Expr),
    Print {
        keyword: Token,
        expr: Expr,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    height: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        let height = 1 + match &kind {
            ExprKind::Literal(_) | ExprKind::Variable { .. } => 0,
            ExprKind::Grouping(inner) => inner.height,
            ExprKind::Unary { operand, .. } => operand.height,
            ExprKind::Assign { value, .. } => value.height,
            ExprKind::Binary { left, right, .. } => left.height.max(right.height),
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => condition
                .height
                .max(then_branch.height)
                .max(else_branch.height),
        };
        Self { kind, span, height }
    }

    /// Longest path from this node down to a leaf, counting both ends.
    pub fn height(&self) -> usize {
        self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // Primary Expressions
    Literal(Literal),
    Grouping(Box<Expr>),
    Variable {
        name: Token,
    },

    // Operator Expressions
    Unary {
        operator: Token,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Assign {
        name: Token,
        value: Box<Expr>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::token::TokenType;

    fn number(n: f64) -> Expr {
        Expr::new(ExprKind::Literal(Literal::Number(n)), Span::default())
    }

    #[test]
    fn height_follows_the_deepest_child() {
        let plus = Token::new(TokenType::Plus, "+", Span::default());
        let grouped = Expr::new(ExprKind::Grouping(Box::new(number(1.0))), Span::default());
        let sum = Expr::new(
            ExprKind::Binary {
                left: Box::new(grouped),
                operator: plus,
                right: Box::new(number(2.0)),
            },
            Span::default(),
        );

        assert_eq!(number(1.0).height(), 1);
        assert_eq!(sum.height(), 3);
    }
}
