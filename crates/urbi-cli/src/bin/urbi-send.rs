//! Entry point for `urbi-send`.
//!
//! Delegates to [`urbi_cli::run_send`], which loads configuration, uploads
//! the requested commands and scripts, and relays server output to stdout.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    urbi_cli::run_send(std::env::args_os(), &mut stdout, &mut stderr)
}
