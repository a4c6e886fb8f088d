use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn history(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_history"))
        .arg("--db")
        .arg(db)
        .args(["--prefix", "t_"])
        .args(args)
        .output()
        .expect("failed to run history")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn assert_success(out: &Output) {
    assert!(
        out.status.success(),
        "command failed. stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

#[test]
fn migrate_up_creates_tables() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    assert_success(&history(&db, &["migrate", "up"]));

    let out = history(&db, &["migrate", "status"]);
    assert_success(&out);
    let text = stdout(&out);
    assert!(text.contains("Tables exist: yes"), "stdout: {text}");
    assert!(text.contains("Schema version: 2"), "stdout: {text}");
    assert!(text.contains("Site count: 0"), "stdout: {text}");
}

#[test]
fn migrate_down_drops_tables() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    assert_success(&history(&db, &["migrate", "up"]));
    assert_success(&history(&db, &["migrate", "down"]));

    let text = stdout(&history(&db, &["migrate", "status"]));
    assert!(text.contains("Tables exist: no"), "stdout: {text}");
}

#[test]
fn config_file_selects_database_and_prefix() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("from-config.db");
    let config = dir.path().join("history.yaml");
    fs::write(
        &config,
        format!("database: {}\ntable_prefix: cfg_\nschema_version: 1\n", db.display()),
    )
    .unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_history"))
        .arg("--config")
        .arg(&config)
        .args(["migrate", "up"])
        .output()
        .unwrap();
    assert_success(&out);
    assert!(stdout(&out).contains("schema version 1"));
    assert!(db.exists());
}

#[test]
fn invalid_prefix_is_rejected() {
    let dir = TempDir::new().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_history"))
        .arg("--db")
        .arg(dir.path().join("history.db"))
        .args(["--prefix", "bad-prefix", "migrate", "up"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid prefix"));
}

// ---------------------------------------------------------------------------
// recording and listing
// ---------------------------------------------------------------------------

#[test]
fn visits_to_one_url_list_as_one_site() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    assert_success(&history(
        &db,
        &["visit", "https://example.com/", "--title", "Old", "--at", "2024-01-01T00:00:00Z"],
    ));
    assert_success(&history(
        &db,
        &[
            "visit",
            "https://example.com/",
            "--title",
            "New",
            "--type",
            "typed",
            "--at",
            "2024-02-01T00:00:00Z",
        ],
    ));

    let out = history(&db, &["list", "--json"]);
    assert_success(&out);
    let entries: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["site"]["title"], "New");
    assert_eq!(entries[0]["visit"]["type"], "Typed");
    assert_eq!(entries[0]["visit"]["date"], "2024-02-01T00:00:00Z");
}

#[test]
fn list_filter_and_recent_order() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    for (url, at) in [
        ("https://example.com/page", "2024-01-01T00:00:00Z"),
        ("https://other.com/", "2024-01-02T00:00:00Z"),
        ("https://not-example-dot.org/", "2024-01-03T00:00:00Z"),
    ] {
        assert_success(&history(&db, &["visit", url, "--at", at]));
    }

    let out = history(&db, &["list", "--filter", "example", "--recent"]);
    assert_success(&out);
    let lines: Vec<String> = stdout(&out).lines().map(String::from).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("https://not-example-dot.org/"));
    assert!(lines[1].contains("https://example.com/page"));
}

#[test]
fn site_without_visit_is_not_listed() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    assert_success(&history(&db, &["site", "https://a.com/", "--title", "A"]));
    assert_success(&history(&db, &["site", "https://b.com/", "--title", "B", "--with-visit"]));

    let sites = stdout(&history(&db, &["sites"]));
    assert_eq!(sites.lines().count(), 2);

    let listed = stdout(&history(&db, &["list"]));
    assert_eq!(listed.lines().count(), 1);
    assert!(listed.contains("https://b.com/"));
}

// ---------------------------------------------------------------------------
// updating and deleting
// ---------------------------------------------------------------------------

#[test]
fn update_visit_changes_type() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    let out = history(&db, &["visit", "https://example.com/"]);
    assert_success(&out);
    let id = stdout(&out).trim().trim_start_matches("Recorded visit ").to_string();

    assert_success(&history(&db, &["update-visit", &id, "--type", "bookmark"]));

    let entries: serde_json::Value =
        serde_json::from_str(&stdout(&history(&db, &["list", "--json"]))).unwrap();
    assert_eq!(entries[0]["visit"]["type"], "Bookmark");

    let missing = history(&db, &["update-visit", "999", "--type", "link"]);
    assert!(!missing.status.success());
}

#[test]
fn delete_url_removes_site_and_visits() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    assert_success(&history(&db, &["visit", "https://example.com/"]));
    assert_success(&history(&db, &["visit", "https://example.com/"]));
    assert_success(&history(&db, &["visit", "https://other.com/"]));

    let out = history(&db, &["delete", "--url", "https://example.com/"]);
    assert_success(&out);
    assert!(stdout(&out).contains("Deleted 1 site(s)"));

    let text = stdout(&history(&db, &["migrate", "status"]));
    assert!(text.contains("Site count: 1"), "stdout: {text}");
    assert!(text.contains("Visit count: 1"), "stdout: {text}");
}

#[test]
fn delete_all_clears_history() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("history.db");

    assert_success(&history(&db, &["visit", "https://a.com/"]));
    assert_success(&history(&db, &["visit", "https://b.com/"]));

    let out = history(&db, &["delete", "--all"]);
    assert_success(&out);
    assert!(stdout(&out).contains("(2 visits)"));
    assert!(stdout(&history(&db, &["list"])).is_empty());
}
