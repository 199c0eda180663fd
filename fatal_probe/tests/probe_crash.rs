//! End-to-end runs of the probe binary.

use fatal::consts::{CRASH_BANNER, CRASH_FOOTER};
use nix::sys::signal::Signal;
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn probe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fatal_probe"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to spawn fatal_probe")
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn assert_report(report: &str, cause: &str, requests: u64) {
    let banner = report.find(CRASH_BANNER).expect("banner missing");
    let footer = report.find(CRASH_FOOTER).expect("footer missing");
    assert!(banner < footer);

    let body = &report[banner..footer];
    assert!(body.contains(&format!("cause: {cause}")), "{body}");
    assert!(body.contains(&format!("requests served: {requests}")), "{body}");
    assert!(!body.contains("startup: in progress"), "{body}");

    let service = body.find("service: ").expect("identity missing");
    let served = body.find("requests served").unwrap();
    assert!(service < served, "handlers out of registration order");
}

#[test]
fn dry_run_prints_report_to_stdout() {
    let output = probe(&["--crash", "none", "--requests", "5"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_report(&stdout, "dry run", 5);
    assert!(stdout.contains("service: fatal-probe"));
}

#[test]
fn abort_dumps_handlers_to_stderr_and_dies_by_sigabrt() {
    let output = probe(&["--crash", "abort", "--requests", "2"]);
    assert_eq!(output.status.signal(), Some(Signal::SIGABRT as i32));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_report(&stderr, "SIGABRT", 2);
    assert!(output.stdout.is_empty());
}

#[test]
fn segv_dumps_handlers_to_stderr_and_dies_by_sigsegv() {
    let output = probe(&["--crash", "segv"]);
    assert_eq!(output.status.signal(), Some(Signal::SIGSEGV as i32));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_report(&stderr, "SIGSEGV", 3);
}

#[test]
fn service_name_comes_from_config_file() {
    let file = config_file("[shared]\nservice_name = \"edge-gateway\"\n");
    let path = file.path().to_str().unwrap();

    let output = probe(&["--config", path, "--crash", "abort"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("service: edge-gateway"), "{stderr}");
}

#[test]
fn trap_limited_to_configured_signals() {
    let file = config_file("[fatal_error]\nsignals = [\"SIGSEGV\"]\n");
    let path = file.path().to_str().unwrap();

    let output = probe(&["--config", path, "--crash", "abort"]);
    assert_eq!(output.status.signal(), Some(Signal::SIGABRT as i32));
    assert!(!String::from_utf8_lossy(&output.stderr).contains(CRASH_BANNER));
}

#[test]
fn disabled_registry_reports_no_handlers() {
    let file = config_file("[fatal_error]\nenabled = false\ninstall_signal_trap = false\n");
    let path = file.path().to_str().unwrap();

    let output = probe(&["--config", path]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(CRASH_BANNER));
    assert!(stdout.contains(CRASH_FOOTER));
    assert!(!stdout.contains("requests served"));
    assert!(!stdout.contains("service: "));
}

#[test]
fn invalid_config_exits_with_status_one() {
    let file = config_file("[fatal_error]\nsignals = [\"SIGSEGV\", \"SIGSEGV\"]\n");
    let path = file.path().to_str().unwrap();

    let output = probe(&["--config", path]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
