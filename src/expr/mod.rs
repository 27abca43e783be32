//! Rule expression language.
//!
//! A rule is a boolean condition over part fields, e.g. `inner_diameter < outer_diameter`.
//! It is compiled once with [`Expr::parse`] and evaluated per part against an [`Env`].
//!
//! Supported:
//! - literals: numbers, quoted strings, True / False / None
//! - arithmetic: + - * / // % ** and unary - +
//! - comparisons: < <= > >= == != (chainable, `0 < x < 10`)
//! - boolean: and / or / not (also && and ||)
//!
//! Every name used by the expression must be bound in the environment. This is
//! checked before evaluation, so a misspelled field is always reported even if a
//! short-circuit would never reach it.

mod eval;
mod lexer;
mod parser;
mod value;

pub use value::{Env, Value};

use eval::Evaluator;
use parser::{Node, Parser};
use thiserror::Error;

/// Rule-definition defects. These describe a broken rule, not a bad part.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("syntax error in '{expr}' at offset {offset}: {message}")]
    Syntax {
        expr: String,
        offset: usize,
        message: String,
    },

    #[error("name '{name}' is not defined (in '{expr}')")]
    NameReference { expr: String, name: String },

    #[error("type mismatch in '{expr}': {message}")]
    TypeMismatch { expr: String, message: String },
}

/// A compiled rule expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    source: String,
    root: Node,
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = lexer::tokenize(source)?;
        let root = Parser::new(source, tokens).parse()?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names referenced by the expression, in order of first appearance.
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.root.collect_names(&mut names);
        names
    }

    pub fn eval(&self, env: &Env) -> Result<Value, ExprError> {
        if let Some(missing) = self.names().into_iter().find(|n| !env.contains(n)) {
            return Err(ExprError::NameReference {
                expr: self.source.clone(),
                name: missing.to_string(),
            });
        }
        Evaluator::new(&self.source, env).eval(&self.root)
    }

    /// True only when the expression evaluates to boolean `True`.
    pub fn is_satisfied(&self, env: &Env) -> Result<bool, ExprError> {
        Ok(matches!(self.eval(env)?, Value::Bool(true)))
    }
}

/// Parse and evaluate in one go.
pub fn evaluate(source: &str, env: &Env) -> Result<bool, ExprError> {
    Expr::parse(source)?.is_satisfied(env)
}
