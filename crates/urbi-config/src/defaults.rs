use crate::endpoint::ServerEndpoint;
use crate::logging::LogFormat;

/// Standard port of an Urbi server.
pub const DEFAULT_PORT: u16 = 54000;

/// Host contacted when no server is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Default log filter expression used by the client programs.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the client programs.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Endpoint of the server contacted when none is configured.
#[must_use]
pub fn default_server_endpoint() -> ServerEndpoint {
    ServerEndpoint::tcp(DEFAULT_HOST, DEFAULT_PORT)
}
