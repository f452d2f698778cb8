use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type tag an attribute can be declared with. The type validator
/// compares a non-null value's [`tag`](crate::core::Value::tag) against the
/// declared tag; `Integer` and `Float` values both tag as `Number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Number,
    Text,
    Date,
    Array,
    Object,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Text => "text",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
