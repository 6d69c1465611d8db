//! Integration tests for the `urbi-send` and `urbi-ping` entry points.
//!
//! Verifies help output, usage errors, and the failure reported when no
//! server is listening.

use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use rstest::rstest;

fn unreachable_server() -> String {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind throwaway listener");
    let port = listener.local_addr().expect("throwaway address").port();
    format!("tcp://127.0.0.1:{port}")
}

#[test]
fn send_help_lists_options() {
    let mut command = cargo_bin_cmd!("urbi-send");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("--execute"))
        .stdout(contains("--wait-ms"));
}

#[test]
fn ping_help_lists_options() {
    let mut command = cargo_bin_cmd!("urbi-ping");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("--interval"))
        .stdout(contains("--timeout"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("urbi-send");
    command.arg("--no-such-flag");
    command.assert().code(2).stderr(contains("--no-such-flag"));
}

#[rstest]
#[case("urbi-send", &["-e", "1;"])]
#[case("urbi-ping", &["--count", "1"])]
fn unreachable_server_exits_with_failure(#[case] program: &str, #[case] extra: &[&str]) {
    let mut command = match program {
        "urbi-send" => cargo_bin_cmd!("urbi-send"),
        _ => cargo_bin_cmd!("urbi-ping"),
    };
    command.arg("--server").arg(unreachable_server()).args(extra);
    command
        .assert()
        .code(1)
        .stderr(contains("failed to connect to server"));
}
