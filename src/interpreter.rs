pub mod environment;
pub mod value;

use crate::diagnostics::Diagnostics;
use crate::interpreter::environment::Environment;
use crate::interpreter::value::Value;
use crate::parser::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::scanner::token::{Token, TokenType};
use std::io::{self, Stdout, Write};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
    /// The token the error is reported at, usually the operator.
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

/// Tree-walking evaluator. Owns the session's global environment, which
/// survives across `run` calls, and the sink `print` writes to.
pub struct Interpreter<W: Write = Stdout> {
    env: Environment,
    out: W,
}

impl Interpreter<Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(out: W) -> Self {
        Self {
            env: Environment::new(),
            out,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs `statements` unless a syntax error is already on record, reporting
    /// any runtime error into `diagnostics`. Returns whether one occurred.
    pub fn run(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) -> bool {
        if diagnostics.had_syntax_error() {
            tracing::debug!("syntax errors on record, not running");
            return false;
        }

        match self.interpret(statements) {
            Ok(()) => false,
            Err(error) => {
                diagnostics.runtime_error(&error);
                true
            }
        }
    }

    /// Executes in order and stops at the first runtime error. Bindings made
    /// before the failing statement are kept.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        tracing::debug!(statements = statements.len(), "interpreting");
        for stmt in statements {
            self.execute(stmt)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        tracing::trace!(line = stmt.span.line, "executing statement");
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.evaluate(expr)?;
            }
            StmtKind::Print { keyword, expr } => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value).map_err(|e| {
                    RuntimeError::new(keyword.clone(), format!("Could not write output: {}.", e))
                })?;
            }
            StmtKind::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.env.define(name.lexeme.clone(), value);
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, expression: &Expr) -> Result<Value, RuntimeError> {
        match &expression.kind {
            // primary
            ExprKind::Literal(literal) => Ok(Value::from(literal)),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Variable { name } => self.env.get(name),

            // assignment
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.env.assign(name, value.clone())?;
                Ok(value)
            }

            // unary
            ExprKind::Unary { operator, operand } => {
                let operand_value = self.evaluate(operand)?;
                match (&operator.token_type, operand_value) {
                    (TokenType::Bang, v) => Ok(Value::Bool(!v.is_truthy())),
                    (TokenType::Minus, Value::Num(n)) => Ok(Value::Num(-n)),
                    (TokenType::Minus, _) => Err(RuntimeError::new(
                        operator.clone(),
                        "Operand must be a number.",
                    )),
                    (_, _) => Err(unknown_operator(operator)),
                }
            }

            // only one branch is ever evaluated
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            // binary
            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;
                let right_value = self.evaluate(right)?;
                binary(operator, left_value, right_value)
            }
        }
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match &operator.token_type {
        // equality never type-errors
        TokenType::EqualEqual => Ok(Value::Bool(left == right)),
        TokenType::BangEqual => Ok(Value::Bool(left != right)),

        TokenType::Plus => match (left, right) {
            (Value::Num(n1), Value::Num(n2)) => Ok(Value::Num(n1 + n2)),
            (Value::Str(s1), Value::Str(s2)) => {
                let mut s = String::with_capacity(s1.len() + s2.len());
                s.push_str(&s1);
                s.push_str(&s2);
                Ok(Value::Str(Rc::from(s)))
            }
            _ => Err(RuntimeError::new(
                operator.clone(),
                "Operand must be two numbers or two strings.",
            )),
        },

        // arithmetic and comparison, numbers only
        TokenType::Minus
        | TokenType::Star
        | TokenType::Slash
        | TokenType::Greater
        | TokenType::GreaterEqual
        | TokenType::Less
        | TokenType::LessEqual => {
            let (Value::Num(n1), Value::Num(n2)) = (&left, &right) else {
                return Err(RuntimeError::new(
                    operator.clone(),
                    "Operand must be a number.",
                ));
            };
            let (n1, n2) = (*n1, *n2);
            Ok(match operator.token_type {
                TokenType::Minus => Value::Num(n1 - n2),
                TokenType::Star => Value::Num(n1 * n2),
                TokenType::Slash => Value::Num(n1 / n2), // IEEE: x/0 is +-Infinity or NaN
                TokenType::Greater => Value::Bool(n1 > n2),
                TokenType::GreaterEqual => Value::Bool(n1 >= n2),
                TokenType::Less => Value::Bool(n1 < n2),
                _ => Value::Bool(n1 <= n2),
            })
        }

        TokenType::Ampersand | TokenType::Pipe => {
            let (Some(n1), Some(n2)) = (as_whole(&left), as_whole(&right)) else {
                return Err(RuntimeError::new(
                    operator.clone(),
                    "Operand must be two whole numbers.",
                ));
            };
            let combined = if operator.token_type == TokenType::Ampersand {
                n1 & n2
            } else {
                n1 | n2
            };
            Ok(Value::Num(combined as f64))
        }

        _ => Err(unknown_operator(operator)),
    }
}

// A number with no fractional part, wrapped modulo 2^32 into an i32.
fn as_whole(value: &Value) -> Option<i32> {
    match value {
        Value::Num(n) if n.is_finite() && n.fract() == 0.0 => {
            Some(n.rem_euclid(4_294_967_296.0) as u32 as i32)
        }
        _ => None,
    }
}

fn unknown_operator(operator: &Token) -> RuntimeError {
    RuntimeError::new(
        operator.clone(),
        format!("Unknown operator '{}'.", operator.lexeme),
    )
}
