//! Runs the `stencil` binary against the library's diagram fixtures.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn stencil_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stencil"))
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("stencil_scout")
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run_cli(args: &[&str], home: &Path) -> Output {
    Command::new(stencil_bin())
        .args(args)
        .current_dir(home)
        .env("STENCIL_HOME", home)
        .env_remove("STENCIL_TEMPLATES")
        .env_remove("STENCIL_CONFIG")
        .output()
        .expect("failed to execute stencil CLI")
}

fn parse_json_output(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn test_scan_single_document_json() {
    let home = TempDir::new().unwrap();
    let templates = path_arg(&fixture("stencil_templates.yaml"));
    let doc = path_arg(&fixture("network.drawio"));

    let output = run_cli(&["scan", &doc, "--templates", &templates, "--json"], home.path());
    assert!(
        output.status.success(),
        "scan failed\nstderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = parse_json_output(&output);
    assert_eq!(json["total_matches"], 5);
    assert_eq!(json["failures"], 0);

    let results = &json["documents"][0]["results"];
    assert_eq!(results.as_object().unwrap().len(), 5);

    // Templates keep file order in the raw output
    let stdout = String::from_utf8_lossy(&output.stdout);
    let positions: Vec<usize> = ["Server", "Switch", "Network", "Firewall", "Unconfigured"]
        .iter()
        .map(|name| stdout.find(&format!("\"{}\": [", name)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "order: {:?}", positions);

    let servers = results["Server"].as_array().unwrap();
    assert_eq!(servers[0]["id"], "srv-a");
    assert_eq!(servers[0]["schema"], "inventory");
    assert_eq!(servers[0]["extracted_fields"]["hostname"][0], "app-01");
    assert_eq!(results["Network"][0]["extracted_fields"]["description"][0], "Office LAN");
}

#[test]
fn test_scan_directory_reports_failures_and_exits_non_zero() {
    let home = TempDir::new().unwrap();
    let docs = home.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::copy(fixture("network.drawio"), docs.join("a_network.drawio")).unwrap();
    fs::write(docs.join("b_broken.drawio"), "<mxfile><diagram>").unwrap();
    let templates = path_arg(&fixture("stencil_templates.yaml"));

    let output = run_cli(&["scan", &path_arg(&docs), "--templates", &templates, "--json"], home.path());
    assert!(!output.status.success());

    let json = parse_json_output(&output);
    let documents = json["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents[0]["results"].is_object());
    assert!(documents[1]["error"].is_string());
    assert_eq!(json["failures"], 1);
    assert_eq!(json["total_matches"], 5);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 of 2 document(s) could not be scanned"), "stderr:\n{}", stderr);
}

#[test]
fn test_scan_all_cells_flag() {
    let home = TempDir::new().unwrap();
    let templates = home.path().join("rooms.yaml");
    fs::write(&templates, "Room:\n  patterns: [\"server room\"]\n").unwrap();
    let doc = path_arg(&fixture("network.drawio"));

    let stencils_only = parse_json_output(&run_cli(
        &["scan", &doc, "--templates", &path_arg(&templates), "--json"],
        home.path(),
    ));
    assert_eq!(stencils_only["total_matches"], 0);

    let all_cells = parse_json_output(&run_cli(
        &["scan", &doc, "--templates", &path_arg(&templates), "--all-cells", "--json"],
        home.path(),
    ));
    assert_eq!(all_cells["documents"][0]["results"]["Room"][0]["id"], "label-1");
}

#[test]
fn test_scan_text_output_has_summary() {
    let home = TempDir::new().unwrap();
    let templates = path_arg(&fixture("stencil_templates.yaml"));
    let doc = path_arg(&fixture("network.drawio"));

    let output = run_cli(&["scan", &doc, "--templates", &templates], home.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("STENCIL SUMMARY REPORT"));
    assert!(stdout.contains("TOTAL: 5 objects found"));
}

#[test]
fn test_scan_missing_templates_is_helpful() {
    let home = TempDir::new().unwrap();
    let doc = path_arg(&fixture("network.drawio"));

    let output = run_cli(&["scan", &doc], home.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Template file not found"), "stderr:\n{}", stderr);
    assert!(stderr.contains("TRY:"));
}

#[test]
fn test_templates_json_reports_diagnostics() {
    let home = TempDir::new().unwrap();
    let templates = path_arg(&fixture("stencil_templates.yaml"));

    let output = run_cli(&["templates", "--templates", &templates, "--json"], home.path());
    assert!(output.status.success());

    let json = parse_json_output(&output);
    assert_eq!(json["templates"].as_array().unwrap().len(), 5);
    let diagnostics = json["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["template"], "Unconfigured");
}

#[test]
fn test_list_json() {
    let home = TempDir::new().unwrap();
    let docs = home.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::copy(fixture("network.drawio"), docs.join("Office.DRAWIO")).unwrap();
    fs::write(docs.join("readme.txt"), "not a diagram").unwrap();

    let output = run_cli(&["list", &path_arg(&docs), "--json"], home.path());
    assert!(output.status.success());

    let json = parse_json_output(&output);
    let documents = json["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert!(documents[0]["path"].as_str().unwrap().ends_with("Office.DRAWIO"));
}

#[test]
fn test_config_json_defaults_and_file() {
    let home = TempDir::new().unwrap();

    let defaults = parse_json_output(&run_cli(&["config", "--json"], home.path()));
    assert!(defaults["config_file"].is_null());
    assert_eq!(defaults["policy"]["stencil_filter"], true);
    assert_eq!(defaults["policy"]["search_text"], "style_value");
    assert_eq!(defaults["policy"]["and_delimiter"], ";");
    assert_eq!(defaults["policy"]["descriptive_templates"][0], "Network");

    fs::write(home.path().join("stencil.toml"), "and_delimiter = \":\"\n").unwrap();
    let from_file = parse_json_output(&run_cli(&["config", "--json"], home.path()));
    assert!(from_file["config_file"].is_string());
    assert_eq!(from_file["policy"]["and_delimiter"], ":");
}
