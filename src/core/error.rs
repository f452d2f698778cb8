use std::fmt;

use thiserror::Error;

use crate::core::value::{Attrs, Value};

/// A single problem recorded against a record instance, usually by a
/// validator. Carries the message plus whatever extra fields the reporter
/// attached (the built-in validators tag `type = "validation"` and name the
/// offending attribute).
#[derive(Debug, Clone)]
pub struct Issue {
    pub message: String,
    pub extra: Attrs,
}

impl Issue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extra: Attrs::new(),
        }
    }

    /// Attach an extra field to this issue.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The attribute this issue refers to, if any.
    pub fn attribute(&self) -> Option<&str> {
        self.extra.get("attribute").and_then(Value::as_str)
    }

    pub fn is_validation(&self) -> bool {
        self.extra
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == "validation")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Primary attribute already exists: {0}")]
    PrimaryExists(String),

    #[error("Primary key has not been defined.")]
    NoPrimaryKey,

    #[error("Unknown attribute '{attribute}' for model '{model}'")]
    UnknownAttribute { model: String, attribute: String },

    /// Validation failure surfaced by `save()`, carrying a snapshot of the
    /// instance's issue list taken at the moment validation ran.
    #[error("Validations failed.")]
    Validation(Vec<Issue>),

    /// Whatever error a persistence handler produced, forwarded verbatim.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl ModelError {
    /// The collected validation issues, when this is a validation failure.
    pub fn issues(&self) -> &[Issue] {
        match self {
            Self::Validation(issues) => issues,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// What a registered handler returns. Handler errors are opaque to the core
/// and reach the caller unchanged as [`ModelError::Handler`].
pub type HandlerResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_message_is_exact() {
        let err = ModelError::Validation(vec![Issue::new("name is required.")]);
        assert_eq!(err.to_string(), "Validations failed.");
        assert_eq!(err.issues().len(), 1);
    }

    #[test]
    fn handler_error_passes_through_verbatim() {
        let err = ModelError::Handler(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn issue_extras_are_queryable() {
        let issue = Issue::new("age is not of type number.")
            .with("type", "validation")
            .with("attribute", "age");
        assert!(issue.is_validation());
        assert_eq!(issue.attribute(), Some("age"));
    }
}
