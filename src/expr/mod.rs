//! Safe boolean condition language for routing decisions.
//!
//! Conditions are parsed once at load time and evaluated against the live
//! state at every routing step. The language is a closed grammar: logical
//! connectives, comparisons, nullness tests and a whitelisted `len()` over
//! paths rooted at `quality`, `artifacts` or `context`. There is no other
//! function call, no interpolation, and no dynamic code execution; an
//! expression outside the grammar is rejected structurally.

mod eval;
mod lexer;
mod parser;

use crate::error::ExprError;
use crate::state::GlobalState;

/// A parsed, reusable routing condition.
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    ast: parser::Ast,
}

impl Condition {
    /// Parse an expression. Fails on anything outside the grammar.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ExprError::syntax(0, "empty expression"));
        }
        let tokens = lexer::tokenize(trimmed)?;
        let ast = parser::parse(&tokens, trimmed.len())?;
        Ok(Self {
            source: trimmed.to_string(),
            ast,
        })
    }

    /// Evaluate against the current state. Pure: the state is untouched.
    ///
    /// The result is the truthiness of the expression value, so a bare
    /// path like `quality.next_agent` counts as "present and non-empty".
    pub fn evaluate(&self, state: &GlobalState) -> Result<bool, ExprError> {
        eval::eval(&self.ast, state).map(|value| eval::truthy(&value))
    }

    /// The original expression text, for logs and error messages.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_source_text() {
        let condition = Condition::parse("  quality.attempts < 3 ").unwrap();
        assert_eq!(condition.source(), "quality.attempts < 3");
        assert_eq!(condition.to_string(), "quality.attempts < 3");
    }

    #[test]
    fn empty_expression_is_rejected() {
        assert!(Condition::parse("   ").is_err());
    }

    #[test]
    fn conditions_are_cloneable_for_reuse_across_steps() {
        let condition = Condition::parse("quality.review_status == 'APROVADO'").unwrap();
        let copy = condition.clone();
        assert_eq!(condition.source(), copy.source());
    }
}
