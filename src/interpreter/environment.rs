use crate::interpreter::value::Value;
use crate::interpreter::RuntimeError;
use crate::scanner::token::Token;
use std::collections::HashMap;

// Single global scope. Nested scopes would chain an `enclosing` environment here.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declaring an existing name again simply overwrites it.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.values
            .get(&name.lexeme)
            .cloned()
            .ok_or_else(|| undefined(name))
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        match self.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(name)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name.clone(), format!("Undefined variable '{}'.", name.lexeme))
}
