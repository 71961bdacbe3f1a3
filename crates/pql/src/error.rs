//! Error types for pql

use thiserror::Error;

/// Result type alias for pql operations
pub type PqlResult<T> = Result<T, PqlError>;

/// Errors reported by the query builder
#[derive(Debug, Error)]
pub enum PqlError {
    /// IN / NOT IN called with no values
    #[error("Empty value set for IN condition on '{0}'")]
    EmptyValueSet(String),

    /// Negative LIMIT or OFFSET
    #[error("Invalid {clause}: {value} (must be a non-negative integer)")]
    InvalidLimit { clause: &'static str, value: i64 },

    /// Rendering requested before any source was set
    #[error("Builder incomplete: {0}")]
    BuilderIncomplete(String),

    /// The same alias names two sources or joins
    #[error("Duplicate alias '{alias}' (already used by '{existing}', now also by '{entity}')")]
    DuplicateAlias {
        alias: String,
        existing: String,
        entity: String,
    },

    /// Unknown logical operator token
    #[error("Invalid operator '{0}' (expected 'and' or 'or')")]
    InvalidOperator(String),

    /// Builder definition could not be read
    #[error("Definition error: {0}")]
    Definition(#[from] serde_json::Error),
}

impl PqlError {
    /// Create an invalid LIMIT error
    pub fn invalid_limit(value: i64) -> Self {
        Self::InvalidLimit {
            clause: "LIMIT",
            value,
        }
    }

    /// Create an invalid OFFSET error
    pub fn invalid_offset(value: i64) -> Self {
        Self::InvalidLimit {
            clause: "OFFSET",
            value,
        }
    }

    /// Create a builder-incomplete error
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::BuilderIncomplete(message.into())
    }

    /// Check if this is an empty value set error
    pub fn is_empty_value_set(&self) -> bool {
        matches!(self, Self::EmptyValueSet(_))
    }

    /// Check if this is an invalid limit error
    pub fn is_invalid_limit(&self) -> bool {
        matches!(self, Self::InvalidLimit { .. })
    }

    /// Check if this is a builder-incomplete error
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::BuilderIncomplete(_))
    }

    /// Check if this is a duplicate alias error
    pub fn is_duplicate_alias(&self) -> bool {
        matches!(self, Self::DuplicateAlias { .. })
    }
}
