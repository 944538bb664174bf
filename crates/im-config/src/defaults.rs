//! Built-in configuration defaults.

use crate::logging::LogFormat;

/// Default `tracing` filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default number of command paths accepted in one invoke request.
pub const DEFAULT_MAX_PATHS_PER_INVOKE: usize = 8;

/// Default size in bytes requested for each response buffer.
///
/// Matches the largest application payload of an unfragmented message.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1194;

/// Smallest accepted response buffer size.
///
/// A buffer of this size always holds the message framing plus one status
/// entry carrying a full command path, a cluster status and a ref.
pub const MIN_RESPONSE_SIZE: usize = 64;

/// Interaction Model revision written into every outgoing message.
pub const DEFAULT_INTERACTION_MODEL_REVISION: u8 = 12;

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default registry capacity.
#[must_use]
pub const fn default_max_paths_per_invoke() -> usize {
    DEFAULT_MAX_PATHS_PER_INVOKE
}

/// Default response buffer size.
#[must_use]
pub const fn default_max_response_size() -> usize {
    DEFAULT_MAX_RESPONSE_SIZE
}

/// Default Interaction Model revision.
#[must_use]
pub const fn default_interaction_model_revision() -> u8 {
    DEFAULT_INTERACTION_MODEL_REVISION
}
