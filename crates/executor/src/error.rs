//! Error types for method dispatch.
//!
//! All errors from dispatching a call are represented by the [`Error`] enum.
//!
//! # Categories
//!
//! | Category | Variants | Reported as |
//! |----------|----------|-------------|
//! | Codec | `Codec` | call failure |
//! | Arguments | `MissingArgument`, `InvalidArgument` | call failure |
//! | Dispatch | `UnknownMethod`, `Protocol` | call failure |
//! | Engine | `Engine` | call failure, passed through unmodified |
//! | Startup | `DuplicateMethod`, `Config` | fatal before serving |
//! | Channel | `Io`, `FrameTooLarge` | ends the serve loop (an oversized reply is sent as a call failure) |

use crate::facade::EngineError;

/// Dispatch errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    // ==================== Codec ====================
    /// Snapshot or cell could not be decoded/encoded
    #[error(transparent)]
    Codec(#[from] sandbox_core::Error),

    // ==================== Arguments ====================
    /// Required argument not supplied
    #[error("{method}() missing required argument '{argument}'")]
    MissingArgument { method: String, argument: String },

    /// Argument of the wrong shape, or supplied twice, or not expected at all
    #[error("{method}() argument '{argument}': {reason}")]
    InvalidArgument {
        method: String,
        argument: String,
        reason: String,
    },

    // ==================== Dispatch ====================
    /// No method registered under this name
    #[error("unknown method: {name}")]
    UnknownMethod { name: String },

    /// Inbound message is not a well-formed call
    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    // ==================== Engine ====================
    /// Failure raised by the engine facade
    #[error(transparent)]
    Engine(#[from] EngineError),

    // ==================== Startup ====================
    /// Two registrations under one name
    #[error("method registered twice: {name}")]
    DuplicateMethod { name: String },

    /// Configuration could not be read or parsed
    #[error("configuration error: {reason}")]
    Config { reason: String },

    // ==================== Channel ====================
    /// I/O error on the call channel
    #[error("I/O error: {reason}")]
    Io { reason: String },

    /// Frame length above the configured limit
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },
}

impl Error {
    /// Stable name of the failure, sent to the host as the error kind.
    ///
    /// Engine errors keep the kind the engine gave them.
    pub fn kind(&self) -> &str {
        match self {
            Error::Codec(e) => e.kind(),
            Error::MissingArgument { .. } | Error::InvalidArgument { .. } => "TypeError",
            Error::UnknownMethod { .. } => "UnknownMethod",
            Error::Protocol { .. } => "ProtocolError",
            Error::Engine(e) => &e.kind,
            Error::DuplicateMethod { .. } => "DuplicateMethod",
            Error::Config { .. } => "ConfigError",
            Error::Io { .. } => "IoError",
            Error::FrameTooLarge { .. } => "FrameTooLarge",
        }
    }

    /// Message sent to the host next to [`Error::kind`].
    pub fn message(&self) -> String {
        match self {
            Error::Engine(e) => e.message.clone(),
            other => other.to_string(),
        }
    }

    /// True when the serve loop cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io { .. } | Error::FrameTooLarge { .. } | Error::DuplicateMethod { .. }
        )
    }
}
