//! Diagnostics for the client programs.
//!
//! Everything is written to stderr: stdout carries the server's own output,
//! which scripts downstream of `urbi-send` expect to read unadorned.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt};

use urbi_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Telemetry could not be brought up.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TelemetryError {
    /// `--log-filter` was not a valid filter directive list.
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        /// The expression as configured.
        filter: String,
        /// Parser diagnostic.
        #[source]
        source: ParseError,
    },
    /// Something else claimed the global subscriber first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the process-wide subscriber described by `config`.
///
/// Only the first successful call has an effect; a program that runs twice in
/// one process (as the tests do) keeps the subscriber it started with.
pub(crate) fn initialise(config: &Config) -> Result<(), TelemetryError> {
    INSTALLED.get_or_try_init(|| install_subscriber(config))?;
    Ok(())
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let events = fmt::Subscriber::builder()
        .with_env_filter(parse_filter(config.log_filter())?)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        // Callbacks log from the receive loop's named thread.
        .with_thread_names(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Compact => Box::new(events.compact().finish()),
        LogFormat::Json => Box::new(events.json().flatten_event(true).finish()),
    };
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn parse_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter).map_err(|source| TelemetryError::Filter {
        filter: filter.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_filters_name_the_expression() {
        let error = parse_filter("urbi_client=loud").expect_err("filter must not parse");
        assert!(
            error.to_string().starts_with("invalid log filter 'urbi_client=loud'"),
            "got {error}"
        );
    }

    #[test]
    fn malformed_filters_are_caught_before_installation() {
        let config = Config {
            log_filter: String::from("urbi_client=loud"),
            ..Config::default()
        };
        let error = install_subscriber(&config).expect_err("filter must not parse");
        assert!(matches!(error, TelemetryError::Filter { .. }), "got {error}");
    }

    #[test]
    fn repeated_initialisation_is_idempotent() {
        let config = Config::default();
        initialise(&config).expect("first initialisation");
        initialise(&config).expect("second initialisation");
    }
}
