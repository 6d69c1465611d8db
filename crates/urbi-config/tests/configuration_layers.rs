//! Integration tests for layered configuration loading.

use std::ffi::OsString;

use rstest::rstest;
use urbi_config::{Config, LogFormat, ServerEndpoint, default_server_endpoint};

fn args(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("urbi-send")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

#[test]
fn defaults_apply_without_flags() {
    let config = Config::load_from_iter(args(&[])).expect("defaults should load");
    assert_eq!(config.server(), &default_server_endpoint());
}

#[rstest]
#[case(&["--server", "tcp://robot:54001"], ServerEndpoint::tcp("robot", 54001))]
#[case(&["--server", "unix:///tmp/urbi.sock"], ServerEndpoint::unix("/tmp/urbi.sock"))]
fn server_flag_overrides_default(#[case] flags: &[&str], #[case] expected: ServerEndpoint) {
    let config = Config::load_from_iter(args(flags)).expect("flags should load");
    assert_eq!(config.server(), &expected);
}

#[test]
fn logging_flags_override_defaults() {
    let config = Config::load_from_iter(args(&[
        "--log-filter",
        "urbi_client=debug",
        "--log-format",
        "json",
    ]))
    .expect("logging flags should load");
    assert_eq!(config.log_filter(), "urbi_client=debug");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[test]
fn invalid_server_flag_is_rejected() {
    let result = Config::load_from_iter(args(&["--server", "http://robot:80"]));
    assert!(result.is_err(), "unsupported schemes must fail to load");
}

fn write_config(dir: &tempfile::TempDir, contents: &str) -> OsString {
    let path = dir.path().join("urbi.toml");
    std::fs::write(&path, contents).expect("write configuration file");
    path.into_os_string()
}

#[test]
fn configuration_file_sets_server() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_config(
        &dir,
        "server = { transport = \"tcp\", host = \"robot\", port = 55000 }\n",
    );

    let mut command_line = args(&["--config-path"]);
    command_line.push(path);
    let config = Config::load_from_iter(command_line).expect("file should load");

    assert_eq!(config.server(), &ServerEndpoint::tcp("robot", 55000));
    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[test]
fn configuration_file_accepts_text_format_synonym() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_config(&dir, "log_format = \"text\"\n");

    let mut command_line = args(&["--config-path"]);
    command_line.push(path);
    let config = Config::load_from_iter(command_line).expect("file should load");

    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[test]
fn flags_override_configuration_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_config(
        &dir,
        "server = { transport = \"tcp\", host = \"robot\", port = 55000 }\nlog_format = \"json\"\n",
    );

    let mut command_line = args(&["--config-path"]);
    command_line.push(path);
    command_line.push(OsString::from("--server"));
    command_line.push(OsString::from("tcp://other:54002"));
    let config = Config::load_from_iter(command_line).expect("layers should load");

    assert_eq!(config.server(), &ServerEndpoint::tcp("other", 54002));
    assert_eq!(config.log_format(), LogFormat::Json);
}
