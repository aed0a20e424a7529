use serde_json::Value;
use thiserror::Error;

/// A draft or patch was rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent, null, blank or an empty list.
    #[error("{field} is required")]
    Missing { field: String },

    /// A numeric field is outside its allowed range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        value: i64,
    },

    /// A field has the wrong type or an unsupported value.
    #[error("{field} is invalid: {reason}")]
    Invalid { field: String, reason: String },

    /// The draft or patch did not serialize to a JSON object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// The draft or patch could not be serialized.
    #[error("malformed input: {0}")]
    Malformed(String),
}

impl ValidationError {
    pub fn missing(field: &str) -> Self {
        Self::Missing {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Checks that `field`, when present, is an integer within `min..=max`.
    pub fn check_range(
        fields: &crate::Fields,
        field: &str,
        min: i64,
        max: i64,
    ) -> Result<(), Self> {
        let Some(value) = fields.get(field) else {
            return Ok(());
        };
        let n = value
            .as_i64()
            .ok_or_else(|| Self::invalid(field, "expected an integer"))?;
        if n < min || n > max {
            return Err(Self::OutOfRange {
                field: field.to_string(),
                min,
                max,
                value: n,
            });
        }
        Ok(())
    }
}

/// Whether fields describe a whole new record or a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Patch,
}

pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
