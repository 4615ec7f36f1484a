//! ---
//! jsm_section: "05-external-interfaces"
//! jsm_subsection: "binary"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Command console for the JSON translator."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::fs;

use assert_cmd::Command;
use serde_json::Value;

fn jsmctl() -> Command {
    let mut cmd = Command::cargo_bin("jsmctl").unwrap();
    cmd.env_remove("JSM_CONFIG").env("JSM_LOG", "warn");
    cmd
}

fn lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn commands_lists_every_wire_name() {
    let output = jsmctl().arg("commands").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("getMeasurementData"));
    assert!(text.contains("setLimitsData"));
    assert!(text.contains("maxCurrentLimit, maxVoltageLimit, minVoltageLimit"));
    assert!(!text.contains("commandInvalid"));
}

#[test]
fn exec_prints_one_response() {
    let output = jsmctl()
        .args(["exec", "getLimitData"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let responses = lines(&output);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["response"], "getLimitData");
    assert_eq!(responses[0]["data"]["maxCurrentLimit"], 60);
}

#[test]
fn exec_passes_payload() {
    let output = jsmctl()
        .args(["exec", "setPowerCutData", "--data", r#"{"powerCut":true}"#])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let responses = lines(&output);
    assert_eq!(responses[0]["data"]["powerCut"], true);
    assert!(responses[0].get("error").is_none());
}

#[test]
fn exec_rejects_malformed_data_argument() {
    jsmctl()
        .args(["exec", "setPowerCutData", "--data", "{nope"])
        .assert()
        .failure();
}

#[test]
fn serve_answers_each_line_and_skips_echoes() {
    let input = concat!(
        "{\"cmd\":\"getPowerCompanyData\"}\n",
        "\n",
        "{\"response\":\"getPowerCompanyData\"}\n",
        "{\"cmd\":\"bogus\"}\n",
        "{}\n",
    );
    let output = jsmctl()
        .arg("serve")
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let responses = lines(&output);
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["data"]["priceKWh"], "0.15");
    assert_eq!(responses[1]["error"]["description"], "Command not valid");
    assert_eq!(responses[2]["error"]["description"], "Command is not present");
}

#[test]
fn config_file_enables_pretty_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jsm.toml");
    let logs = dir.path().join("logs");
    fs::write(
        &path,
        format!(
            "[translator]\npretty = true\n\n[logging]\ndirectory = {:?}\n",
            logs.display().to_string()
        ),
    )
    .unwrap();

    let output = jsmctl()
        .arg("--config")
        .arg(&path)
        .args(["exec", "getLimitData"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("{\n  \"response\": \"getLimitData\""));
}

#[test]
fn missing_config_file_is_an_error() {
    jsmctl()
        .args(["--config", "/nonexistent/jsm.toml", "commands"])
        .assert()
        .failure();
}
