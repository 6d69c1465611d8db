//! Error types for the client programs.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use urbi_client::ClientError;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}

impl AppError {
    /// Adds a hint for the common case of no server listening.
    pub(crate) fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Client(error) if error.is_server_unavailable() => {
                Some("is an Urbi server running? Use --server to point at it.")
            }
            _ => None,
        }
    }
}
