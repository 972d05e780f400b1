mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::str::contains;

fn csv_scrub() -> Command {
    Command::cargo_bin("csv-scrub").expect("binary exists")
}

#[test]
fn clean_writes_csv_and_diagnostics() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("clean.csv");
    let diagnostics = workspace.path().join("diagnostics.json");
    csv_scrub()
        .args([
            "clean",
            "-i",
            fixture_path("users.csv").to_str().unwrap(),
            "-p",
            fixture_path("users_pipeline.yml").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--diagnostics",
            diagnostics.to_str().unwrap(),
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&output).expect("read output");
    assert_eq!(
        contents,
        "id,name,email,age,signup_date,active,city\n\
         1,Alice,alice@example.com,28,2024-03-01,true,Berlin\n\
         2,Bob,bob@example.com,31,2024-04-01,false,Bremen\n\
         3,Carol,carol@example.com,24,2024-05-10,true,Unknown\n\
         5,Eve,eve@example.com,29,2024-07-15,false,Cologne\n"
    );

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&diagnostics).expect("read diagnostics"))
            .expect("parse diagnostics");
    assert_eq!(report["input_rows"], 6);
    assert_eq!(report["output_rows"], 4);
    let entries = report["diagnostics"].as_array().expect("diagnostics array");
    assert!(entries.iter().any(|entry| {
        entry["column"] == "height_cm"
            && entry["decision"] == "drop_column"
            && entry["measurement"]["statistic"] == "null_fraction"
    }));
}

#[test]
fn clean_json_pipeline_to_stdout() {
    csv_scrub()
        .args([
            "clean",
            "-i",
            fixture_path("users.csv").to_str().unwrap(),
            "-p",
            fixture_path("users_pipeline.json").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout("name,age,city\nAlice,28,Berlin\nBob,31,Bremen\n");
}

#[test]
fn clean_reads_stdin_and_renders_table() {
    let workspace = TestWorkspace::new();
    let pipeline = workspace.write(
        "pipeline.yaml",
        "stages:\n  - kind: default_fill\n    column: city\n    value: Unknown\n",
    );
    csv_scrub()
        .args([
            "clean",
            "-i",
            "-",
            "-p",
            pipeline.to_str().unwrap(),
            "--table",
        ])
        .write_stdin("id,city\n1,Berlin\n2,\n")
        .assert()
        .success()
        .stdout(contains("Unknown"))
        .stdout(contains("---"));
}

#[test]
fn clean_reports_unknown_column_with_stage_name() {
    let workspace = TestWorkspace::new();
    let pipeline = workspace.write(
        "pipeline.yaml",
        "stages:\n  - kind: range_filter\n    name: adults\n    column: years\n    min: 18\n    max: 99\n",
    );
    csv_scrub()
        .args([
            "clean",
            "-i",
            fixture_path("users.csv").to_str().unwrap(),
            "-p",
            pipeline.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("adults"))
        .stderr(contains("years"));
}

#[test]
fn clean_honours_custom_delimiters() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("input.csv", "id;age\n1;30\n2;n/a\n");
    let pipeline = workspace.write(
        "pipeline.yaml",
        "stages:\n  - kind: cast\n    columns:\n      - { column: age, type: integer }\n",
    );
    csv_scrub()
        .args([
            "clean",
            "-i",
            input.to_str().unwrap(),
            "-p",
            pipeline.to_str().unwrap(),
            "--delimiter",
            ";",
            "--output-delimiter",
            "tab",
        ])
        .assert()
        .success()
        .stdout("id\tage\n1\t30\n2\t\n");
}

#[test]
fn inspect_reports_nulls_and_numeric_summary() {
    let output = csv_scrub()
        .args([
            "inspect",
            "-i",
            fixture_path("users.csv").to_str().unwrap(),
            "--cast",
            "age:integer",
            "-C",
            "age,email",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let reports: serde_json::Value = serde_json::from_slice(&output).expect("inspect json");
    let reports = reports.as_array().expect("array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["column"], "age");
    assert_eq!(reports[0]["nulls"], 1);
    assert_eq!(reports[0]["numeric"]["count"], 5);
    assert_eq!(reports[0]["numeric"]["min"], 24.0);
    assert_eq!(reports[1]["column"], "email");
    assert_eq!(reports[1]["duplicates"], 2);
    assert!(reports[1].get("numeric").is_none());
}

#[test]
fn inspect_table_lists_every_column() {
    csv_scrub()
        .args(["inspect", "-i", fixture_path("users.csv").to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("null_fraction"))
        .stdout(contains("height_cm"))
        .stdout(contains("0.3333"));
}

#[test]
fn inspect_rejects_unknown_column() {
    csv_scrub()
        .args([
            "inspect",
            "-i",
            fixture_path("users.csv").to_str().unwrap(),
            "-C",
            "salary",
        ])
        .assert()
        .failure()
        .stderr(contains("salary"));
}

#[test]
fn inspect_rejects_unknown_cast_column() {
    csv_scrub()
        .args([
            "inspect",
            "-i",
            fixture_path("users.csv").to_str().unwrap(),
            "--cast",
            "agee:integer",
        ])
        .assert()
        .failure()
        .stderr(contains("Cast column 'agee' not found"));
}
