//! Entry point for `urbi-ping`.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    urbi_cli::run_ping(std::env::args_os(), &mut stdout, &mut stderr)
}
