//! Error type shared by the codec, the query builder, and the guard workflows.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AclGuardError>;

#[derive(Debug, Error)]
pub enum AclGuardError {
    /// An ACE field holds a value outside its vocabulary.
    #[error("Invalid ACL {field} value: {value}. Valid values are: {valid}")]
    InvalidAceValue {
        field: &'static str,
        value: String,
        valid: String,
    },

    #[error("no search-indexed document types among: {types}")]
    NoIndexedTypes { types: String },

    #[error("unknown document type: {name}")]
    UnknownDocumentType { name: String },

    #[error("invalid document: {reason}")]
    InvalidDocument { reason: String },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Failure reported by a document store or search index backend.
    #[error("store error: {reason}")]
    Store { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AclGuardError {
    pub(crate) fn invalid_value<I, S>(field: &'static str, value: &str, valid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let valid = valid
            .into_iter()
            .map(|value| value.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self::InvalidAceValue {
            field,
            value: value.to_string(),
            valid,
        }
    }
}
