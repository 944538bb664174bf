//! Layered configuration for the invoke engine.
//!
//! Values are resolved by `ortho_config` from, in increasing precedence, the
//! built-in defaults, an optional configuration file, `IM_*` environment
//! variables and command-line flags. [`Config::validate`] then checks the
//! engine limits before the configuration is used.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_INTERACTION_MODEL_REVISION, DEFAULT_LOG_FILTER, DEFAULT_MAX_PATHS_PER_INVOKE,
    DEFAULT_MAX_RESPONSE_SIZE, MIN_RESPONSE_SIZE, default_interaction_model_revision,
    default_log_filter, default_log_filter_string, default_log_format,
    default_max_paths_per_invoke, default_max_response_size,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by the engine and its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "IM")]
pub struct Config {
    /// `tracing` filter expression, e.g. `im_invoke=debug`.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the telemetry subscriber.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Maximum number of command paths accepted in one invoke request.
    #[serde(default = "defaults::default_max_paths_per_invoke")]
    #[ortho_config(default = defaults::default_max_paths_per_invoke())]
    pub max_paths_per_invoke: usize,
    /// Size in bytes requested from the transport for each response message.
    #[serde(default = "defaults::default_max_response_size")]
    #[ortho_config(default = defaults::default_max_response_size())]
    pub max_response_size: usize,
    /// Interaction Model revision written into outgoing messages.
    #[serde(default = "defaults::default_interaction_model_revision")]
    #[ortho_config(default = defaults::default_interaction_model_revision())]
    pub interaction_model_revision: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            max_paths_per_invoke: default_max_paths_per_invoke(),
            max_response_size: default_max_response_size(),
            interaction_model_revision: default_interaction_model_revision(),
        }
    }
}

impl Config {
    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Maximum number of command paths per invoke request.
    #[must_use]
    pub const fn max_paths_per_invoke(&self) -> usize {
        self.max_paths_per_invoke
    }

    /// Response buffer size in bytes.
    #[must_use]
    pub const fn max_response_size(&self) -> usize {
        self.max_response_size
    }

    /// Interaction Model revision written into outgoing messages.
    #[must_use]
    pub const fn interaction_model_revision(&self) -> u8 {
        self.interaction_model_revision
    }

    /// Checks that the engine limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPathCapacity`] when no paths are allowed and
    /// [`ConfigError::ResponseSizeTooSmall`] when a response buffer could not
    /// hold a single status entry.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_paths_per_invoke == 0 {
            return Err(ConfigError::NoPathCapacity);
        }
        if self.max_response_size < MIN_RESPONSE_SIZE {
            return Err(ConfigError::ResponseSizeTooSmall {
                configured: self.max_response_size,
                minimum: MIN_RESPONSE_SIZE,
            });
        }
        Ok(())
    }
}

/// Errors reported by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_paths_per_invoke` was zero.
    #[error("max_paths_per_invoke must allow at least one path")]
    NoPathCapacity,
    /// `max_response_size` cannot hold a minimal status response.
    #[error("max_response_size of {configured} bytes is below the minimum of {minimum}")]
    ResponseSizeTooSmall {
        /// Configured size.
        configured: usize,
        /// Smallest accepted size.
        minimum: usize,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.max_paths_per_invoke(), 8);
        assert_eq!(config.max_response_size(), 1194);
        assert_eq!(config.interaction_model_revision(), 12);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_path_capacity() {
        let config = Config {
            max_paths_per_invoke: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPathCapacity));
    }

    #[rstest]
    #[case(0)]
    #[case(MIN_RESPONSE_SIZE - 1)]
    fn rejects_undersized_response_buffer(#[case] size: usize) {
        let config = Config {
            max_response_size: size,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ResponseSizeTooSmall {
                configured: size,
                minimum: MIN_RESPONSE_SIZE,
            })
        );
    }

    #[test]
    fn accepts_minimum_response_buffer() {
        let config = Config {
            max_response_size: MIN_RESPONSE_SIZE,
            ..Config::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
