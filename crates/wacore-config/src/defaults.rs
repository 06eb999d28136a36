use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default budget for a single `wait_event` call made by the event pump.
pub const DEFAULT_EVENT_TIMEOUT_MS: u64 = 1_000;

/// Default number of bytes reserved in front of every outgoing packet.
pub const DEFAULT_TRANSPORT_HEADROOM: usize = 16;

/// Prefix of the `WACORE_*` environment variables and of `.wacore.toml`.
pub const ENV_PREFIX: &str = "WACORE_";

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
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

/// Default event pump budget in milliseconds.
#[must_use]
pub const fn default_event_timeout_ms() -> u64 {
    DEFAULT_EVENT_TIMEOUT_MS
}

/// Default transport headroom in bytes.
#[must_use]
pub const fn default_transport_headroom() -> usize {
    DEFAULT_TRANSPORT_HEADROOM
}
