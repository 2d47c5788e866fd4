#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &std::path::Path, rows: &[&str]) -> String {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "action, product, kind, quantity, detail").unwrap();
    for row in rows {
        writeln!(csv, "{row}").unwrap();
    }

    let mut cmd = Command::new(cargo_bin!("agricart"));
    cmd.arg(csv.path())
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json")
        .arg("--db-path")
        .arg(db_path);

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_anonymous_cart_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let first = run(&db_path, &["add, rice, standard, 2,"]);
    assert!(first.contains("rice,standard,2,80,160"));

    // Second run starts from the cart the first one left behind.
    let second = run(&db_path, &["add, rice, standard, 1,"]);
    assert!(second.contains("rice,standard,3,80,240"));
}

#[test]
fn test_rocksdb_identity_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    run(&db_path, &["add, wheat, standard, 1,", "login, , , , asha@example.com"]);

    // The restored identity keeps writing to the account cart; the merged
    // wheat row is gone from the local store.
    let second = run(&db_path, &["add, husk, waste, 2,"]);
    assert!(second.contains("husk,waste,2,12.5,25"));
    assert!(!second.contains("wheat"));
}
