// src/expression/mod.rs
//! A small interpreted rule language for verification expressions.
//!
//! An expression is the body of a one-argument function: the parsed API
//! response is bound to `response`, and the body is expected to `return 1`
//! for a valid task and `0` otherwise. The language is a JavaScript-flavoured
//! subset (literals, `const`/`let`, `if`/`else`, `return`, the usual
//! operators, property access and a handful of string/array methods) with no
//! loops or user-defined functions, so every evaluation terminates, and the
//! strings a run may build are capped at [`MAX_STRING_BYTES`].

use serde_json::Value as Json;
use thiserror::Error;

mod interpreter;
mod lexer;
mod parser;
mod value;

pub use interpreter::{MAX_STRING_BYTES, RESPONSE_BINDING};
pub use parser::MAX_DEPTH;

/// Default cap on expression source size, in bytes.
pub const DEFAULT_MAX_SOURCE_LEN: usize = 4096;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("expression is {len} bytes, the limit is {limit}")]
    TooLong { len: usize, limit: usize },

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("{0}")]
    Runtime(String),
}

/// What the body returned, as JSON. `None` means it returned `undefined`.
pub type Returned = Option<Json>;

/// A parsed expression, reusable across responses.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    body: Vec<parser::Stmt>,
}

impl Expression {
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        Self::compile_with_limit(source, DEFAULT_MAX_SOURCE_LEN)
    }

    pub fn compile_with_limit(source: &str, max_len: usize) -> Result<Self, ExpressionError> {
        if source.len() > max_len {
            return Err(ExpressionError::TooLong {
                len: source.len(),
                limit: max_len,
            });
        }
        let body = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            body,
        })
    }

    pub fn evaluate(&self, response: &Json) -> Result<Returned, ExpressionError> {
        interpreter::run(&self.body, response).map(|value| value.to_json())
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Compiles and runs `source` against `response` in one step.
pub fn evaluate(source: &str, response: &Json) -> Result<Returned, ExpressionError> {
    Expression::compile(source)?.evaluate(response)
}

/// Only a returned number equal to 1 counts as valid.
pub fn is_valid(returned: &Returned) -> bool {
    matches!(returned, Some(Json::Number(n)) if n.as_f64() == Some(1.0))
}

/// The compatibility view of an outcome: whatever was returned, or `0` when
/// compiling or running the expression failed.
pub fn legacy_verdict(outcome: &Result<Returned, ExpressionError>) -> Returned {
    match outcome {
        Ok(returned) => returned.clone(),
        Err(_) => Some(Json::from(0)),
    }
}

/// `1` when the expression returns exactly 1, `0` for anything else,
/// including any failure.
pub fn verdict(source: &str, response: &Json) -> u8 {
    match evaluate(source, response) {
        Ok(returned) if is_valid(&returned) => 1,
        _ => 0,
    }
}
