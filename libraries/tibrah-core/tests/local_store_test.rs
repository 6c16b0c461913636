//! Local store tests against a real directory

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tibrah_core::{ErrorMonitor, LocalStore, TibrahError, ERROR_LOG_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LikedComments {
    ids: Vec<String>,
}

#[test]
fn documents_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = LocalStore::open(dir.path()).unwrap();
        store
            .set(
                "liked_comments",
                &LikedComments {
                    ids: vec!["c1".to_string(), "c7".to_string()],
                },
            )
            .unwrap();
    }

    let store = LocalStore::open(dir.path()).unwrap();
    let liked: LikedComments = store.get("liked_comments").unwrap().unwrap();
    assert_eq!(liked.ids, vec!["c1", "c7"]);
}

#[test]
fn set_replaces_whole_document() {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();

    store.set("numbers", &vec![1, 2, 3]).unwrap();
    store.set("numbers", &vec![9]).unwrap();

    let numbers: Vec<i32> = store.get("numbers").unwrap().unwrap();
    assert_eq!(numbers, vec![9]);
}

#[test]
fn keys_ignore_foreign_files() {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();

    store.set("b_key", &true).unwrap();
    store.set("a_key", &false).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a document").unwrap();

    assert_eq!(store.keys().unwrap(), vec!["a_key", "b_key"]);
}

#[test]
fn corrupt_document_reports_serialization_error() {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();
    std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

    let result = store.get::<Vec<u32>>("broken");
    assert!(matches!(result, Err(TibrahError::Serialization(_))));
}

#[test]
fn error_log_spills_to_disk() {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();

    let mut monitor = ErrorMonitor::new();
    for _ in 0..3 {
        monitor.record("audio context closed", Some("frequencies"));
    }
    monitor.record("notification denied", Some("reminders"));
    monitor.flush(&store).unwrap();

    assert!(dir.path().join(format!("{ERROR_LOG_KEY}.json")).exists());

    let restored = ErrorMonitor::load(&store, 50).unwrap();
    let counts: Vec<u32> = restored.reports().map(|r| r.count).collect();
    assert_eq!(counts, vec![3, 1]);
}
