//! Shared configuration for the chat protocol core.
//!
//! The configuration is intentionally small: the log filter and format
//! consumed by the telemetry bootstrap, the event pump budget, an optional
//! reply timeout that switches requests onto the timed wait, and the number of
//! header bytes the transport reserves in front of every outgoing packet.
//!
//! Values are layered by `ortho_config`: defaults, then `.wacore.toml` (or the
//! file named by `WACORE_CONFIG_PATH`), then `WACORE_*` environment variables,
//! then command-line flags when loading from an argument list.
//!
//! | variable                  | flag                 |
//! |---------------------------|----------------------|
//! | `WACORE_LOG_FILTER`       | `--log-filter`       |
//! | `WACORE_LOG_FORMAT`       | `--log-format`       |
//! | `WACORE_EVENT_TIMEOUT_MS` | `--event-timeout-ms` |
//! | `WACORE_REPLY_TIMEOUT_MS` | `--reply-timeout-ms` |

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_EVENT_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_TRANSPORT_HEADROOM, ENV_PREFIX,
    default_event_timeout_ms, default_log_filter, default_log_filter_string, default_log_format,
    default_transport_headroom,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for a protocol connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WACORE")]
pub struct Config {
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `wacore_dispatch=debug`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Budget for a single event pump iteration, in milliseconds.
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,
    /// Upper bound on request round trips. `None` keeps the blocking wait.
    #[serde(default)]
    pub reply_timeout_ms: Option<u64>,
    /// Header bytes reserved for lower-layer framing in outgoing packets.
    #[serde(default = "default_transport_headroom")]
    pub transport_headroom: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            event_timeout_ms: DEFAULT_EVENT_TIMEOUT_MS,
            reply_timeout_ms: None,
            transport_headroom: DEFAULT_TRANSPORT_HEADROOM,
        }
    }
}

impl Config {
    /// Loads defaults, the configuration file and `WACORE_*` variables.
    ///
    /// The process arguments are not consulted, so embedding programs keep
    /// their own command line.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer cannot be read or merged and
    /// [`ConfigError::InvalidValue`] when the log filter is blank.
    pub fn load_layers() -> Result<Self, ConfigError> {
        Self::load_with_args([OsString::from(env!("CARGO_PKG_NAME"))])
    }

    /// Like [`Self::load_layers`], with command-line flags from `args` as the
    /// final layer. The first item is the program name.
    ///
    /// # Errors
    ///
    /// As [`Self::load_layers`].
    pub fn load_with_args<I, A>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString> + Clone,
    {
        Self::load_from_iter(args)
            .map_err(|source| ConfigError::Load { source })?
            .validated()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Event pump budget.
    #[must_use]
    pub const fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }

    /// Request round-trip bound, when configured.
    #[must_use]
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms.map(Duration::from_millis)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "log_filter",
                value: self.log_filter,
                reason: "filter must not be empty",
            });
        }
        Ok(self)
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration layer could not be read, parsed or merged.
    #[error("failed to load configuration: {source}")]
    Load {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// A merged field held an unusable value.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Field name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },
}
