//! End-to-end CLI tests driving the built binary against SQLite files.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::process::{Command, Output};

fn dbscout(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_dbscout"));
    command.args(args).env_remove("DATABASE_URL");
    command
}

fn run(args: &[&str]) -> Output {
    dbscout(args).output().expect("dbscout binary runs")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Creates a database file with the Chinook-like fixture schema.
fn fixture_database(dir: &Path) -> String {
    let path = dir.join("chinook.db");
    let url = path.to_str().expect("utf-8 path").to_string();
    let ddl = [
        "CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name TEXT)",
        "CREATE TABLE Album (AlbumId INTEGER PRIMARY KEY, Title TEXT, \
         ArtistId INTEGER REFERENCES Artist(ArtistId))",
        "CREATE TABLE Track (TrackId INTEGER PRIMARY KEY, Name TEXT, \
         AlbumId INTEGER REFERENCES Album(AlbumId))",
        "INSERT INTO Artist VALUES (1, 'AC/DC'), (2, 'Accept')",
        "INSERT INTO Album VALUES (1, 'For Those About To Rock', 1)",
    ];
    for statement in ddl {
        let output = run(&["--url", &url, "query", statement]);
        assert!(
            output.status.success(),
            "fixture statement failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    url
}

#[test]
fn test_tables_lists_resolved_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = fixture_database(dir.path());

    let output = run(&["--url", &url, "tables"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Artist"));
    assert!(stdout.contains("Album"));
    assert!(stdout.contains("Track"));
}

#[test]
fn test_tables_json_output_is_parseable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = fixture_database(dir.path());

    let output = run(&["--url", &url, "tables", "--format", "json"]);
    assert!(output.status.success());
    let records: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("valid JSON");
    let names: Vec<&str> = records
        .as_array()
        .expect("array of tables")
        .iter()
        .map(|t| t["name"].as_str().expect("table name"))
        .collect();
    assert_eq!(names, ["Album", "Artist", "Track"]);
}

#[test]
fn test_show_prints_key_relationships() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = fixture_database(dir.path());

    let output = run(&["--url", &url, "show", "Album"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("ArtistId"));
    assert!(stdout.contains("Artist.ArtistId"));
}

#[test]
fn test_find_table_glob() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = fixture_database(dir.path());

    let output = run(&["--url", &url, "find-table", "A*"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Album"));
    assert!(stdout.contains("Artist"));
    assert!(!stdout.contains("Track"));
}

#[test]
fn test_count_prints_bare_number() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = fixture_database(dir.path());

    let output = run(&["--url", &url, "count", "Artist"]);
    assert!(output.status.success());
    assert_eq!(stdout_of(&output).trim(), "2");
}

#[test]
fn test_head_reports_row_count() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = fixture_database(dir.path());

    let output = run(&["--url", &url, "head", "Artist", "-n", "1"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("1 row(s)"));
}

#[test]
fn test_profile_lifecycle_under_isolated_home() {
    let dir = tempfile::tempdir().expect("tempdir");
    let home = tempfile::tempdir().expect("home dir");
    let url = fixture_database(dir.path());

    let output = dbscout(&["--url", &url, "save-profile", "chinook"])
        .env("HOME", home.path())
        .output()
        .expect("save-profile runs");
    assert!(
        output.status.success(),
        "save-profile failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(home.path().join(".dbscout_chinook").exists());

    let output = dbscout(&["profiles"])
        .env("HOME", home.path())
        .output()
        .expect("profiles runs");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output).trim(), "chinook");

    let output = dbscout(&["--profile", "chinook", "tables"])
        .env("HOME", home.path())
        .output()
        .expect("profile connect runs");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("Album"));

    let output = dbscout(&["remove-profile", "chinook"])
        .env("HOME", home.path())
        .output()
        .expect("remove-profile runs");
    assert!(output.status.success());
    assert!(!home.path().join(".dbscout_chinook").exists());
}

#[test]
fn test_missing_connection_is_an_error() {
    let output = run(&["tables"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--url") || stderr.contains("profile"));
}

#[test]
fn test_unknown_table_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = fixture_database(dir.path());

    let output = run(&["--url", &url, "show", "Nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Nope"));
}
