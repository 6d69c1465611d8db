//! Command-line programs built on the Urbi client.
//!
//! `urbi-send` uploads commands and script files to a server and relays
//! whatever it prints; `urbi-ping` measures round trips of a tagged command.
//! Both share configuration bootstrapping and telemetry, and both run against
//! substitutable IO streams and configuration loaders so tests can drive them
//! without a terminal.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use urbi_config::Config;

mod cli;
mod config;
mod errors;
mod ping;
mod send;
mod telemetry;

use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use ping::PingProgram;
use send::SendProgram;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of [`urbi_config::Config`].
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--server", "--log-filter", "--log-format"];

/// Exit status for command-line usage errors.
const USAGE_EXIT_CODE: u8 = 2;

/// A program run once configuration and arguments have been resolved.
pub(crate) trait Program {
    /// Program arguments left after configuration flags are split off.
    type Args: Parser;

    /// Runs the program, writing user-facing output to `stdout`.
    fn execute<W: Write>(
        args: Self::Args,
        config: &Config,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError>;
}

/// Runs `urbi-send` with the provided arguments and IO handles.
#[must_use]
pub fn run_send<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_program::<SendProgram, _, _, _, _>(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs `urbi-ping` with the provided arguments and IO handles.
#[must_use]
pub fn run_ping<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_program::<PingProgram, _, _, _, _>(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_program<P, I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    P: Program,
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let program_arguments = prepare_program_arguments(&args, &split);

    let parsed = match P::Args::try_parse_from(program_arguments) {
        Ok(parsed) => parsed,
        Err(error) => return report_usage(&error, stdout, stderr),
    };

    let result = loader.load(&split.config_arguments).and_then(|config| {
        telemetry::initialise(&config)?;
        P::execute(parsed, &config, stdout)
    });

    match result {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            if let Some(hint) = error.hint() {
                let _ = writeln!(stderr, "hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn prepare_program_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut program_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        program_arguments.push(first.clone());
    }
    program_arguments.extend(args.iter().skip(split.command_start).cloned());
    program_arguments
}

/// Prints help and version requests to stdout, other parse failures to stderr.
fn report_usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    if error.use_stderr() {
        let _ = write!(stderr, "{}", error.render());
        ExitCode::from(USAGE_EXIT_CODE)
    } else {
        let _ = write!(stdout, "{}", error.render());
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests;
