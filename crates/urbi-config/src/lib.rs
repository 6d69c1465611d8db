//! Shared configuration for the Urbi client programs.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a discovered
//! configuration file, then `URBI_*` environment variables, then command-line
//! flags. The only setting the protocol core needs is the server endpoint; the
//! remaining fields drive the programs' telemetry.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, default_log_filter_string,
    default_log_format, default_server_endpoint,
};
pub use endpoint::{EndpointParseError, ServerEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for a client program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "URBI")]
pub struct Config {
    /// Server to connect to, for example `tcp://localhost:54000`.
    #[ortho_config(default = default_server_endpoint())]
    pub server: ServerEndpoint,
    /// `tracing` filter expression applied to the programs' logs.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the programs' logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration treating `args` as the command line.
    ///
    /// The first element is the program name, as with [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer fails to parse.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Server the client connects to.
    #[must_use]
    pub const fn server(&self) -> &ServerEndpoint {
        &self.server
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
}
