#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

fn znpcoord(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_znpcoord"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("znpcoord should run")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be json")
}

#[test]
fn decode_reports_route_and_event() {
    let output = znpcoord(&["--format", "json", "decode", "FE 01 66 05 00 62"]);
    assert!(output.status.success());

    let decoded = json_stdout(&output);
    assert_eq!(decoded["class"], "0x66");
    assert_eq!(decoded["command"], "0x05");
    assert_eq!(decoded["route"], "ZB_WRITE_CONFIGURATION");
    assert_eq!(decoded["payload_size"], 1);
    assert!(decoded["event"]
        .as_str()
        .expect("event should be present")
        .contains("ConfigurationWritten"));
}

#[test]
fn decode_unknown_command_is_not_an_error() {
    let output = znpcoord(&["--format", "json", "decode", "FE01610F0A65"]);
    assert!(output.status.success());

    let decoded = json_stdout(&output);
    assert!(decoded["route"].is_null());
    assert!(decoded["error"]
        .as_str()
        .expect("error should be present")
        .contains("unknown command"));
}

#[test]
fn decode_bad_checksum_exits_data_invalid() {
    let output = znpcoord(&["decode", "FE016605FF00"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("checksum"));
}

#[test]
fn decode_bad_marker_exits_data_invalid() {
    let output = znpcoord(&["decode", "0001660500"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn encode_start_request() {
    let output = znpcoord(&[
        "--format",
        "json",
        "encode",
        "--class",
        "0x26",
        "--command",
        "0x00",
    ]);
    assert!(output.status.success());

    let encoded = json_stdout(&output);
    assert_eq!(encoded["frame"], "FE00260026");
    assert_eq!(encoded["size"], 5);
}

#[test]
fn encode_raw_writes_frame_bytes() {
    let output = znpcoord(&[
        "--format",
        "raw",
        "encode",
        "--class",
        "0x26",
        "--command",
        "0x05",
        "87 01 00",
    ]);
    assert!(output.status.success());
    assert_eq!(output.stdout, vec![0xFE, 0x03, 0x26, 0x05, 0x87, 0x01, 0x00, 0xA6]);
}

#[test]
fn encode_oversized_payload_exits_data_invalid() {
    let payload = "00".repeat(251);
    let output = znpcoord(&["encode", "--class", "0x26", "--command", "0x05", &payload]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn version_prints_package_version() {
    let output = znpcoord(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("znpcoord {}", env!("CARGO_PKG_VERSION"))
    );

    let extended = znpcoord(&["version", "--extended"]);
    assert!(String::from_utf8_lossy(&extended.stdout).contains("target_os:"));
}
