//! Program-level tests driven against a scripted server.


use std::ffi::OsString;
use std::process::ExitCode;

use urbi_config::{Config, ServerEndpoint};

use crate::{AppError, ConfigLoader, Program, run_program};

/// Loader returning a fixed configuration aimed at a test server.
struct StubConfigLoader {
    config: Config,
}

impl StubConfigLoader {
    fn new(server: ServerEndpoint) -> Self {
        Self {
            config: Config {
                server,
                ..Config::default()
            },
        }
    }
}

impl ConfigLoader for StubConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Captured result of one program run.
struct RunOutput {
    exit_code: ExitCode,
    stdout: String,
    stderr: String,
}

fn run_against<P: Program>(server: ServerEndpoint, args: &[&str]) -> RunOutput {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = run_program::<P, _, _, _, _>(
        args.iter().map(OsString::from),
        &mut stdout,
        &mut stderr,
        &StubConfigLoader::new(server),
    );
    RunOutput {
        exit_code,
        stdout: String::from_utf8(stdout).expect("stdout is utf-8"),
        stderr: String::from_utf8(stderr).expect("stderr is utf-8"),
    }
}

/// An endpoint nothing listens on.
fn unreachable_endpoint() -> ServerEndpoint {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind throwaway listener");
    let port = listener.local_addr().expect("throwaway address").port();
    ServerEndpoint::tcp("127.0.0.1", port)
}
