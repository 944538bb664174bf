//! Engine limits derived from configuration.

use im_config::{
    Config, DEFAULT_INTERACTION_MODEL_REVISION, DEFAULT_MAX_PATHS_PER_INVOKE,
    DEFAULT_MAX_RESPONSE_SIZE,
};

/// Limits applied to one invoke interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    /// Maximum number of paths in one request.
    pub max_paths_per_invoke: usize,
    /// Size requested for each response buffer.
    pub max_response_size: usize,
    /// Revision written into every outgoing message.
    pub interaction_model_revision: u8,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_paths_per_invoke: DEFAULT_MAX_PATHS_PER_INVOKE,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            interaction_model_revision: DEFAULT_INTERACTION_MODEL_REVISION,
        }
    }
}

impl From<&Config> for EngineLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_paths_per_invoke: config.max_paths_per_invoke(),
            max_response_size: config.max_response_size(),
            interaction_model_revision: config.interaction_model_revision(),
        }
    }
}
