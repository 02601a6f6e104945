//! End-to-end incremental scanning across simulated build invocations.
//!
//! Each block below stands for one build process: it scans the source tree,
//! loads whatever the previous process committed, and commits its own scan.

use std::fs;
use std::path::Path;

use incre_config::load_config_from_str;
use incre_snapshot::{
    AcceptAll, DirectorySnapshot, FileItem, IncrementalScanner, ScanOptions, SnapshotStore,
    Status,
};

fn scanner(state_dir: &Path) -> IncrementalScanner<AcceptAll> {
    IncrementalScanner::new(
        SnapshotStore::new(state_dir),
        "sources",
        AcceptAll,
        ScanOptions::default(),
    )
}

#[test]
fn three_builds_track_add_change_remove() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let state = dir.path().join(".incre");
    fs::create_dir_all(src.join("app")).unwrap();
    fs::write(src.join("app/Main.java"), "class Main {}").unwrap();
    fs::write(src.join("app/Util.java"), "class Util {}").unwrap();

    // First build: no previous state.
    {
        let scanner = scanner(&state);
        let outcome = scanner.scan::<FileItem>(&src).unwrap();
        assert!(outcome.is_full_pass());
        assert_eq!(outcome.diff.count(Status::Added), 2);
        scanner.commit(&outcome).unwrap();
    }

    // Second build: nothing touched.
    {
        let scanner = scanner(&state);
        let outcome = scanner.scan::<FileItem>(&src).unwrap();
        assert!(!outcome.is_full_pass());
        assert!(outcome.diff.is_empty());
        scanner.commit(&outcome).unwrap();
    }

    // Third build: edit one file, delete one, add one.
    fs::write(src.join("app/Main.java"), "class Main { void run() {} }").unwrap();
    fs::remove_file(src.join("app/Util.java")).unwrap();
    fs::write(src.join("app/Extra.java"), "class Extra {}").unwrap();
    {
        let scanner = scanner(&state);
        let outcome = scanner.scan::<FileItem>(&src).unwrap();
        assert_eq!(
            outcome.diff.keys_with_status(Status::Changed),
            vec!["app/Main.java"]
        );
        assert_eq!(
            outcome.diff.keys_with_status(Status::Removed),
            vec!["app/Util.java"]
        );
        assert_eq!(
            outcome.diff.keys_with_status(Status::Added),
            vec!["app/Extra.java"]
        );
        let removed = outcome.diff.get("app/Util.java").unwrap();
        assert!(removed.current().is_none());
        assert!(removed.previous().is_some());
        scanner.commit(&outcome).unwrap();
    }
}

#[test]
fn corrupt_state_degrades_to_full_pass() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let state = dir.path().join(".incre");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.txt"), "aaaaa").unwrap();

    let scanner = scanner(&state);
    let outcome = scanner.scan::<FileItem>(&src).unwrap();
    scanner.commit(&outcome).unwrap();

    let path = scanner.store().state_path("sources");
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x55;
    fs::write(&path, bytes).unwrap();

    let outcome = scanner.scan::<FileItem>(&src).unwrap();
    assert!(outcome.is_full_pass());
    assert_eq!(outcome.diff.keys_with_status(Status::Added), vec!["a.txt"]);
}

#[test]
fn scan_failure_is_reported_and_state_kept() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let state = dir.path().join(".incre");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.txt"), "aaaaa").unwrap();

    let scanner = scanner(&state);
    let outcome = scanner.scan::<FileItem>(&src).unwrap();
    scanner.commit(&outcome).unwrap();

    fs::remove_dir_all(&src).unwrap();
    assert!(scanner.scan::<FileItem>(&src).is_err());

    let kept: Option<DirectorySnapshot> = scanner.store().load("sources").unwrap();
    assert_eq!(kept.map(|s| s.len()), Some(1));
}

#[test]
fn configured_scanner_filters_and_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join(".cache")).unwrap();
    fs::write(src.join("Main.java"), "class Main {}").unwrap();
    fs::write(src.join("notes.txt"), "notes").unwrap();
    fs::write(src.join(".cache/Gen.java"), "class Gen {}").unwrap();

    let config = load_config_from_str(
        r#"
[snapshot]
state_dir = "build/state"
fingerprint = "content"
extensions = "java"
parallel = true
"#,
    )
    .unwrap();

    let scanner = IncrementalScanner::from_settings(dir.path(), "java", &config.snapshot);
    let outcome = scanner.scan::<FileItem>(&src).unwrap();
    assert_eq!(outcome.diff.keys_with_status(Status::Added), vec!["Main.java"]);
    scanner.commit(&outcome).unwrap();
    assert!(dir.path().join("build/state/java.snapshot").exists());

    // Rewriting identical bytes does not count as a change under content hashing.
    fs::write(src.join("Main.java"), "class Main {}").unwrap();
    let outcome = scanner.scan::<FileItem>(&src).unwrap();
    assert!(outcome.diff.is_empty());
}
