//! Error types for record access and value typing.

/// Error raised when a [`Value`](crate::Value) holds a different kind than
/// the one requested.
#[derive(Debug, Clone, thiserror::Error)]
#[error("expected {expected}, found {found}")]
pub struct ValueKindError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl ValueKindError {
    pub fn new(expected: &'static str, found: &'static str) -> Self {
        Self { expected, found }
    }
}

/// Error returned when reading or writing a named field on a
/// [`Record`](crate::Record).
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccessError {
    /// The record has no field with the requested name.
    #[error("missing field '{field}'")]
    MissingField { field: String },

    /// The field exists but its value kind does not match the request.
    #[error("field '{field}': {source}")]
    Kind {
        field: String,
        #[source]
        source: ValueKindError,
    },
}
