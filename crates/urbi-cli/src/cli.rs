//! Argument definitions for the client programs.

use std::path::PathBuf;

use clap::Parser;

/// Sends commands and script files to an Urbi server and prints its output.
#[derive(Parser, Debug)]
#[command(name = "urbi-send", version)]
pub(crate) struct SendArgs {
    /// Command to send before any file. May be repeated.
    #[arg(short = 'e', long = "execute", value_name = "COMMAND")]
    pub(crate) commands: Vec<String>,
    /// Sends `quit;` once everything has been uploaded.
    #[arg(long)]
    pub(crate) quit: bool,
    /// How long to relay output while waiting for the server to close the
    /// connection, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    pub(crate) wait_ms: u64,
    /// Script files uploaded in order after the commands.
    #[arg(value_name = "FILE")]
    pub(crate) files: Vec<PathBuf>,
}

/// Measures round trips of a tagged command to an Urbi server.
#[derive(Parser, Debug)]
#[command(name = "urbi-ping", version)]
pub(crate) struct PingArgs {
    /// Delay between pings, in milliseconds.
    #[arg(short = 'i', long, value_name = "MS", default_value_t = 1000)]
    pub(crate) interval: u64,
    /// Number of pings to send; 0 pings until the connection is lost.
    #[arg(short = 'c', long, value_name = "N", default_value_t = 4)]
    pub(crate) count: u64,
    /// How long to wait for each reply, in milliseconds.
    #[arg(short = 't', long, value_name = "MS", default_value_t = 2000)]
    pub(crate) timeout: u64,
    /// Tag the command is sent under and the reply is matched on.
    #[arg(long, default_value = "uping")]
    pub(crate) tag: String,
    /// Command sent on each ping.
    #[arg(long, default_value = "ping;")]
    pub(crate) command: String,
}
