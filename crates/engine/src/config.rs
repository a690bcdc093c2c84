//! Client configuration via `redtx.toml`
//!
//! A default `redtx.toml` can be written on first start. To change settings,
//! edit the file and restart.

use redtx_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name looked up next to the application.
pub const CONFIG_FILE_NAME: &str = "redtx.toml";

// ============================================================================
// Retry Configuration
// ============================================================================

/// Configuration for the opt-in transaction retry helper
///
/// Only conflicts (`TransactionAborted`) are retried, and only when the
/// caller goes through `transaction_with_retry`. Nothing is retried
/// implicitly.
///
/// # Example
/// ```text
/// let retry = RetryConfig::default().with_max_retries(5);
/// executor.transaction_with_retry(ctx, &["balance"], &retry, |tx| { ... })?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: usize,
    /// Base delay between retries in milliseconds (exponential backoff)
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a RetryConfig with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set maximum number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set maximum delay between retries
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay_ms`
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let shift = attempt.min(63);
        let delay_ms = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

// ============================================================================
// Client Configuration
// ============================================================================

fn default_convert() -> bool {
    true
}

fn default_max_idle() -> usize {
    redtx_storage::DEFAULT_MAX_IDLE
}

/// Client configuration loaded from `redtx.toml`.
///
/// # Example
///
/// ```toml
/// convert_pipeline_and_tx_results = true
/// max_idle_connections = 8
///
/// [retry]
/// max_retries = 3
/// base_delay_ms = 10
/// max_delay_ms = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Normalize the replies of commits and pipelines. When false they are
    /// returned as `Output::Raw`.
    #[serde(default = "default_convert")]
    pub convert_pipeline_and_tx_results: bool,
    /// Idle connections kept by the pooled provider.
    #[serde(default = "default_max_idle")]
    pub max_idle_connections: usize,
    /// Retry policy for `transaction_with_retry` when none is passed.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            convert_pipeline_and_tx_results: default_convert(),
            max_idle_connections: default_max_idle(),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Set the reply conversion flag
    pub fn with_conversion(mut self, convert: bool) -> Self {
        self.convert_pipeline_and_tx_results = convert;
        self
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# redtx client configuration
#
# Convert the replies of EXEC and pipelines into the shape each command
# returns standalone (booleans, OK markers, optional values).
# When false, commit and pipeline return the raw server replies.
convert_pipeline_and_tx_results = true

# Idle connections kept in the pool (default: 8)
max_idle_connections = 8

# Retry policy for transaction_with_retry. Only aborted transactions
# (a watched key changed) are retried.
[retry]
max_retries = 3
base_delay_ms = 10
max_delay_ms = 100
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
