//! `urbi-ping`: round-trip measurement of a tagged command.

use std::io::Write;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;
use urbi_client::{CallbackAction, CallbackResult, Client, ClientError, Message};
use urbi_config::Config;

use crate::cli::PingArgs;
use crate::{AppError, Program};

const PING_TARGET: &str = "urbi_cli::ping";

pub(crate) struct PingProgram;

impl Program for PingProgram {
    type Args = PingArgs;

    fn execute<W: Write>(
        args: PingArgs,
        config: &Config,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError> {
        let client = Client::connect(config.server())?;
        let (replies, arrivals) = mpsc::channel();
        client.set_callback(args.tag.as_str(), move |_: &Message| -> CallbackResult {
            replies.send(Instant::now())?;
            Ok(CallbackAction::Continue)
        });

        let host = config.server().host_label();
        let interval = Duration::from_millis(args.interval);
        let timeout = Duration::from_millis(args.timeout);
        let mut round_trips = RoundTrips::default();
        let mut sequence = 0u64;

        while args.count == 0 || sequence < args.count {
            if sequence > 0 {
                thread::sleep(interval);
            }
            sequence += 1;
            // Late replies to an earlier ping must not be credited to this one.
            arrivals.try_iter().for_each(drop);

            let started = Instant::now();
            match client.send(&args.command, Some(&args.tag)) {
                Ok(()) => {}
                Err(ClientError::Closed) => {
                    info!(target: PING_TARGET, sequence, "connection closed; stopping");
                    break;
                }
                // A write racing the server's hang-up fails before the
                // receive loop has seen the end of the stream.
                Err(error) if client.wait_for_disconnect(timeout) => {
                    info!(target: PING_TARGET, sequence, error = %error, "connection lost; stopping");
                    break;
                }
                Err(error) => return Err(error.into()),
            }

            let line = match arrivals.recv_timeout(timeout) {
                Ok(arrived) => {
                    let elapsed = arrived.saturating_duration_since(started);
                    round_trips.record(elapsed);
                    format!(
                        "ping reply from {host}: seq={sequence} time={} ms",
                        millis(elapsed)
                    )
                }
                Err(_) => format!("ping timeout: seq={sequence}"),
            };
            writeln!(stdout, "{line}").map_err(AppError::WriteOutput)?;
        }
        client.close();

        let Some(summary) = round_trips.summary() else {
            stdout.flush().map_err(AppError::WriteOutput)?;
            return Ok(ExitCode::FAILURE);
        };
        writeln!(
            stdout,
            "rtt min/avg/max {}/{}/{} ms",
            millis(summary.min),
            millis(summary.avg),
            millis(summary.max)
        )
        .map_err(AppError::WriteOutput)?;
        stdout.flush().map_err(AppError::WriteOutput)?;
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Default)]
struct RoundTrips {
    min: Option<Duration>,
    max: Duration,
    total: Duration,
    count: u32,
}

#[derive(Debug, PartialEq, Eq)]
struct Summary {
    min: Duration,
    avg: Duration,
    max: Duration,
}

impl RoundTrips {
    fn record(&mut self, elapsed: Duration) {
        self.min = Some(self.min.map_or(elapsed, |min| min.min(elapsed)));
        self.max = self.max.max(elapsed);
        self.total = self.total.saturating_add(elapsed);
        self.count = self.count.saturating_add(1);
    }

    fn summary(&self) -> Option<Summary> {
        let min = self.min?;
        Some(Summary {
            min,
            avg: self.total / self.count,
            max: self.max,
        })
    }
}

/// Renders a duration as milliseconds with microsecond precision.
fn millis(duration: Duration) -> String {
    let micros = duration.as_micros();
    format!("{}.{:03}", micros.div_euclid(1000), micros.rem_euclid(1000))
}
