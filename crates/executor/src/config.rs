//! Sandbox configuration via `sandbox.toml`
//!
//! The binary reads this file once at startup. Every field has a default, so
//! an empty or partial file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::transport::DEFAULT_MAX_MESSAGE_BYTES;
use crate::{Error, Result};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "sandbox.toml";

/// Sandbox configuration loaded from `sandbox.toml`.
///
/// # Example
///
/// ```toml
/// log_filter = "sandbox::dispatch=debug"
/// max_message_bytes = 67108864
/// schema_version = 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Upper bound on a single message body, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Schema version reported by the in-memory engine.
    #[serde(default = "default_schema_version")]
    pub schema_version: i64,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

fn default_schema_version() -> i64 {
    1
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            max_message_bytes: default_max_message_bytes(),
            schema_version: default_schema_version(),
        }
    }
}

impl SandboxConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Sandbox configuration
#
# Log filter used when RUST_LOG is not set (default: "info").
# Logs go to stderr; stdout carries the call channel.
log_filter = "info"

# Largest accepted message body in bytes (default: 64 MiB).
# A larger frame ends the session.
max_message_bytes = 67108864

# Schema version reported by get_version (default: 1).
schema_version = 1
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, cannot be parsed,
    /// or sets a zero message limit.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let config: SandboxConfig = toml::from_str(&content).map_err(|e| Error::Config {
            reason: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the sandbox cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_message_bytes == 0 {
            return Err(Error::Config {
                reason: "max_message_bytes must be greater than zero".to_string(),
            });
        }
        if self.max_message_bytes > u32::MAX as usize {
            return Err(Error::Config {
                reason: format!(
                    "max_message_bytes {} does not fit the 32-bit frame header",
                    self.max_message_bytes
                ),
            });
        }
        Ok(())
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| Error::Config {
                reason: format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            reason: format!("Failed to write config file '{}': {}", path.display(), e),
        })
    }
}
