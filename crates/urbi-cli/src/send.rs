//! `urbi-send`: upload commands and scripts, relay server output.

use std::io::Write;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use urbi_client::{CallbackAction, CallbackResult, Client, Message};
use urbi_config::Config;

use crate::cli::SendArgs;
use crate::{AppError, Program};

const SEND_TARGET: &str = "urbi_cli::send";

/// Command asking the server to close the connection.
pub(crate) const QUIT_COMMAND: &str = "quit;";

pub(crate) struct SendProgram;

impl Program for SendProgram {
    type Args = SendArgs;

    fn execute<W: Write>(
        args: SendArgs,
        config: &Config,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError> {
        let client = Client::connect(config.server())?;
        let (lines, output) = mpsc::channel();
        client.set_wildcard_callback(move |message: &Message| -> CallbackResult {
            lines.send(message.raw().to_owned())?;
            Ok(CallbackAction::Continue)
        });

        for command in &args.commands {
            client.send(command, None)?;
        }
        for file in &args.files {
            client.send_file(file)?;
        }
        if args.quit {
            client.send(QUIT_COMMAND, None)?;
        }

        let wait = Duration::from_millis(args.wait_ms);
        let disconnected = relay_until_disconnect(&output, stdout, wait)?;
        if !disconnected && args.quit {
            warn!(
                target: SEND_TARGET,
                wait_ms = args.wait_ms,
                "server did not close the connection after quit"
            );
        }
        client.close();

        for line in output.try_iter() {
            writeln!(stdout, "{line}").map_err(AppError::WriteOutput)?;
        }
        stdout.flush().map_err(AppError::WriteOutput)?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Writes received lines to `stdout` until the sending side hangs up or
/// `wait` elapses. Returns whether it hung up.
///
/// The client drops its callbacks, and with them the sender, when the
/// receive loop stops, so a hang-up means the connection has ended.
fn relay_until_disconnect<W: Write>(
    output: &Receiver<String>,
    stdout: &mut W,
    wait: Duration,
) -> Result<bool, AppError> {
    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match output.recv_timeout(remaining) {
            Ok(line) => writeln!(stdout, "{line}").map_err(AppError::WriteOutput)?,
            Err(RecvTimeoutError::Timeout) => {
                debug!(target: SEND_TARGET, "relay window elapsed");
                return Ok(false);
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(true),
        }
    }
}
