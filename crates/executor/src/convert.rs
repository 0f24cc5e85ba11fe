//! Error conversion from channel and encoder error types.
//!
//! Codec and engine errors convert through `#[from]` on [`Error`]; this
//! module covers the remaining sources so handlers and the transport can use
//! `?` throughout.

use std::io;

use crate::Error;

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io {
            reason: err.to_string(),
        }
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Error::Protocol {
            reason: err.to_string(),
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Error::Codec(sandbox_core::Error::Serialization {
            reason: err.to_string(),
        })
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config {
            reason: err.to_string(),
        }
    }
}
