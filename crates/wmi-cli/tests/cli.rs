//! Integration tests for the `wmiq` binary.
//!
//! Every test runs in an empty temporary directory so no stray `wmi.toml`
//! is picked up.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn wmiq(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wmiq"))
        .args(args)
        .current_dir(dir)
        .env_remove("WMI_NAMESPACE")
        .env_remove("WMI_LOG")
        .output()
        .expect("failed to run wmiq")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "wmiq failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn json(output: &Output) -> Value {
    serde_json::from_str(&stdout(output)).expect("stdout is not JSON")
}

// ────────────────────────────────────────────────────────────────────────────
// Sample repository
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_query_text() {
    let dir = tempfile::tempdir().unwrap();
    let out = wmiq(
        dir.path(),
        &["query", "SELECT Name FROM Win32_Process WHERE ProcessId = 4"],
    );
    let text = stdout(&out);
    assert!(text.starts_with("Win32_Process.Handle=\"4\""), "{}", text);
    assert!(text.contains("= System"));
}

#[test]
fn test_query_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = wmiq(dir.path(), &["--json", "query", "SELECT * FROM Win32_Process"]);
    let rows = json(&out);
    assert_eq!(rows.as_array().unwrap().len(), 3);
    assert!(rows
        .as_array()
        .unwrap()
        .iter()
        .all(|row| row["class"] == "Win32_Process"));
}

#[test]
fn test_namespaces_recursive() {
    let dir = tempfile::tempdir().unwrap();
    let out = wmiq(dir.path(), &["-n", "ROOT", "namespaces", "--recursive"]);
    let names: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert!(names.contains(&"ROOT\\CIMV2".to_string()));
    assert!(names.contains(&"ROOT\\CIMV2\\Security".to_string()));
    assert!(names.contains(&"ROOT\\default".to_string()));
}

#[test]
fn test_methods_listing() {
    let dir = tempfile::tempdir().unwrap();
    let out = wmiq(dir.path(), &["methods", "StdRegProv"]);
    let text = stdout(&out);
    assert!(
        text.lines().any(|l| l
            == "EnumKey(hDefKey: uint32, sSubKeyName: string) -> sNames: string[], ReturnValue: uint32"),
        "{}",
        text
    );
}

#[test]
fn test_call_registry() {
    let dir = tempfile::tempdir().unwrap();
    let out = wmiq(
        dir.path(),
        &[
            "--json",
            "call",
            "StdRegProv",
            "EnumKey",
            "hDefKey=0x80000002",
            "sSubKeyName=SOFTWARE",
        ],
    );
    let result = json(&out);
    let props = result[0]["properties"].as_array().unwrap();
    let names = props.iter().find(|p| p["name"] == "sNames").unwrap();
    assert!(names["value"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n == "Microsoft"));
    let code = props.iter().find(|p| p["name"] == "ReturnValue").unwrap();
    assert_eq!(code["value"], 0);
}

#[test]
fn test_call_rejects_bad_argument() {
    let dir = tempfile::tempdir().unwrap();
    let out = wmiq(dir.path(), &["call", "StdRegProv", "EnumKey", "hDefKey"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("NAME=VALUE"));
}

#[test]
fn test_missing_object_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = wmiq(dir.path(), &["get", "Win32_Process.Handle=\"99999\""]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Object not found"));
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures and configuration
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_fixture_instances() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = fixtures_dir().join("services.json");
    let out = wmiq(
        dir.path(),
        &[
            "--json",
            "--fixture",
            fixture.to_str().unwrap(),
            "instances",
            "Win32_BaseService",
        ],
    );
    let rows = json(&out);
    assert_eq!(rows.as_array().unwrap().len(), 2);
    let spooler = rows
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["path"] == "Win32_Service.Name=\"Spooler\"")
        .unwrap();
    let deps = spooler["properties"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "Dependencies")
        .unwrap();
    assert_eq!(deps["value"], serde_json::json!(["RPCSS", "http"]));
}

#[test]
fn test_fixture_canned_method() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = fixtures_dir().join("services.json");
    let fixture = fixture.to_str().unwrap();

    let out = wmiq(
        dir.path(),
        &["-f", fixture, "call", "Win32_Service.Name=\"Spooler\"", "StopService"],
    );
    assert!(stdout(&out).contains("ReturnValue = 0"));

    let out = wmiq(
        dir.path(),
        &[
            "-f",
            fixture,
            "call",
            "Win32_Service.Name=\"Spooler\"",
            "ChangeStartMode",
            "StartMode=Disabled",
        ],
    );
    assert!(!out.status.success());
}

#[test]
fn test_denied_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = fixtures_dir().join("services.json");
    let out = wmiq(
        dir.path(),
        &[
            "-f",
            fixture.to_str().unwrap(),
            "-n",
            "ROOT\\Restricted",
            "namespaces",
        ],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("ROOT\\Restricted"));
}

#[test]
fn test_config_file_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(
        fixtures_dir().join("services.json"),
        dir.path().join("services.json"),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("wmi.toml"),
        "namespace = \"ROOT\\\\CIMV2\"\nfixture = \"services.json\"\n",
    )
    .unwrap();

    let out = wmiq(dir.path(), &["namespaces"]);
    assert_eq!(stdout(&out).trim(), "ROOT\\CIMV2\\Applications");
}

#[test]
fn test_namespace_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_wmiq"))
        .args(["namespaces"])
        .current_dir(dir.path())
        .env("WMI_NAMESPACE", "ROOT")
        .env_remove("WMI_LOG")
        .output()
        .unwrap();
    let text = stdout(&out);
    assert!(text.lines().any(|l| l == "ROOT\\SecurityCenter2"));
}
