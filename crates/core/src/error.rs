//! Error types for the snapshot codec
//!
//! Two families of failure live here: decode failures (a malformed tagged
//! value, an unrecognized tag, a corrupt payload) and schema mismatches
//! (row/column length disagreement or a missing id column). Both abort only
//! the current call.

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codec errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed wire value or tagged payload
    #[error("decode error: {reason}")]
    Decode {
        /// What was wrong with the input
        reason: String,
    },

    /// Tagged object carried a tag this codec does not know
    #[error("unrecognized object tag: {tag}")]
    UnknownTag {
        /// The offending tag
        tag: String,
    },

    /// A column's length disagrees with the row-id count
    #[error("schema mismatch in table {table}: column {column} has {actual} values, expected {expected}")]
    SchemaMismatch {
        /// Table being decoded
        table: String,
        /// Offending column
        column: String,
        /// Number of row ids
        expected: usize,
        /// Number of values in the column
        actual: usize,
    },

    /// Non-empty snapshot without the sentinel id column
    #[error("snapshot of table {table} has no id column")]
    MissingIdColumn {
        /// Table being decoded
        table: String,
    },

    /// Encoder failure
    #[error("serialization error: {reason}")]
    Serialization {
        /// Underlying encoder message
        reason: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Decode`] with the given reason.
    pub fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            reason: reason.into(),
        }
    }

    /// Stable name of the failure, used as the error kind across the boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Decode { .. } => "DecodeError",
            Error::UnknownTag { .. } => "UnknownTag",
            Error::SchemaMismatch { .. } => "SchemaMismatch",
            Error::MissingIdColumn { .. } => "MissingIdColumn",
            Error::Serialization { .. } => "SerializationError",
        }
    }

    /// True for malformed values and unknown tags.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::UnknownTag { .. })
    }

    /// True for length disagreements and a missing id column.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            Error::SchemaMismatch { .. } | Error::MissingIdColumn { .. }
        )
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Decode {
            reason: e.to_string(),
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization {
            reason: e.to_string(),
        }
    }
}
