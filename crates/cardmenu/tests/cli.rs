use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn cardmenu(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cardmenu"));
    command
        .env("CARDMENU_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn layout_json_lists_every_card() {
    let root = TempDir::new().unwrap();
    let output = cardmenu(root.path())
        .args(["layout", "--json"])
        .output()
        .expect("failed to run cardmenu layout");
    assert!(output.status.success());

    let cards: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cards.len(), 24);
    for (expected, card) in cards.iter().enumerate() {
        assert_eq!(card["index"].as_u64(), Some(expected as u64));
    }
    let first = &cards[0];
    assert!(first["x"].as_f64().unwrap() < 0.0);
    assert!(first["y"].as_f64().unwrap() > 0.0);
    assert_eq!(first["row"].as_u64(), Some(0));
    assert_eq!(cards[5]["row"].as_u64(), Some(1));
    assert_eq!(cards[5]["col"].as_u64(), Some(1));
}

#[test]
fn layout_follows_config_file() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("cardmenu.toml"),
        "version = 1\n\n[grid]\nrows = 2\ncols = 3\n",
    )
    .unwrap();
    let output = cardmenu(root.path())
        .args(["layout", "--json"])
        .output()
        .expect("failed to run cardmenu layout");
    assert!(output.status.success());
    let cards: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cards.len(), 6);
}

#[test]
fn invalid_config_fails() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("broken.toml");
    fs::write(&config, "version = 7\n").unwrap();
    let status = cardmenu(root.path())
        .args(["layout", "--config"])
        .arg(&config)
        .status()
        .expect("failed to run cardmenu layout");
    assert!(!status.success());
}

#[test]
fn where_reports_config_dir() {
    let root = TempDir::new().unwrap();
    let output = cardmenu(root.path())
        .arg("where")
        .output()
        .expect("failed to run cardmenu where");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&root.path().join("cardmenu.toml").display().to_string()));
    assert!(stdout.contains("missing"));
}

#[test]
fn config_prints_defaults_as_toml() {
    let root = TempDir::new().unwrap();
    let output = cardmenu(root.path())
        .arg("config")
        .output()
        .expect("failed to run cardmenu config");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 1"));
    assert!(stdout.contains("cubic-bezier(0, 1, 0, 1)"));
    assert!(stdout.contains("card-preview.exokit.org"));
}

#[test]
fn offline_animation_runs_headless() {
    let root = TempDir::new().unwrap();
    let status = cardmenu(root.path())
        .args(["--offline", "--frames", "10", "--fps", "0"])
        .status()
        .expect("failed to run cardmenu");
    assert!(status.success());
}
