use tempfile::TempDir;

use super::*;
use crate::digest::{Digest, HashAlgorithm};

const ALGO: HashAlgorithm = HashAlgorithm::Blake3;

fn record(seed: &str) -> FingerprintRecord {
    let digest = |tag: &str| Digest::of_bytes(ALGO, format!("{seed}/{tag}").as_bytes());
    FingerprintRecord {
        sources: digest("sources"),
        tests: digest("tests"),
        resources: digest("resources"),
        deps: digest("deps"),
        upstream: digest("upstream"),
        final_digest: digest("final"),
        timestamp_millis: 1_700_000_000_000,
    }
}

#[test]
fn test_read_missing_file_is_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = FingerprintStore::new(temp_dir.path().join("fingerprints.json"));

    let state = store.read().unwrap();
    assert!(state.is_empty());
    assert_eq!(state.version, STORE_VERSION);
}

#[test]
fn test_round_trip_preserves_state() {
    let temp_dir = TempDir::new().unwrap();
    let store = FingerprintStore::new(temp_dir.path().join("fingerprints.json"));

    let mut state = StoreState::new();
    state.insert_record("build", "core/util", record("core/util"));
    state.insert_record("build", "core/base", record("core/base"));
    state.insert_record("deploy", "core/util", record("core/util@deploy"));

    store.write(&state).unwrap();
    let loaded = store.read().unwrap();
    assert_eq!(loaded, state);
}

#[test]
fn test_store_file_is_textual_and_self_describing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fingerprints.json");
    let store = FingerprintStore::new(&path);

    let mut state = StoreState::new();
    state.insert_record("build", "core/util", record("core/util"));
    store.write(&state).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"build\""));
    assert!(text.contains("\"core/util\""));
    assert!(text.contains("blake3:"));
    assert!(text.contains("\"final\""));
}

#[test]
fn test_malformed_store_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fingerprints.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = FingerprintStore::new(&path);
    assert!(matches!(
        store.read(),
        Err(DriftError::StoreDecodeError { .. })
    ));
}

#[test]
fn test_corrupt_digest_fails_whole_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fingerprints.json");
    let store = FingerprintStore::new(&path);

    let mut state = StoreState::new();
    state.insert_record("build", "core/util", record("core/util"));
    store.write(&state).unwrap();

    // Corrupt one digest field in place; the whole store must refuse to load.
    let text = std::fs::read_to_string(&path).unwrap();
    let corrupted = text.replacen("blake3:", "bogus:", 1);
    std::fs::write(&path, corrupted).unwrap();

    assert!(matches!(
        store.read(),
        Err(DriftError::StoreDecodeError { .. })
    ));
}

#[test]
fn test_future_version_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fingerprints.json");
    let store = FingerprintStore::new(&path);

    let mut state = StoreState::new();
    state.version = STORE_VERSION + 1;
    store.write(&state).unwrap();

    match store.read() {
        Err(DriftError::ConfigError { message }) => {
            assert!(message.contains("newer than supported"));
        }
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn test_write_leaves_no_temp_file_behind() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fingerprints.json");
    let store = FingerprintStore::new(&path);

    store.write(&StoreState::new()).unwrap();

    assert!(path.exists());
    let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_update_merges_rather_than_replaces() {
    let temp_dir = TempDir::new().unwrap();
    let store = FingerprintStore::new(temp_dir.path().join("fingerprints.json"));

    store
        .update(|mut state| {
            state.insert_record("build", "a", record("a"));
            state
        })
        .unwrap();

    let updated = store
        .update(|mut state| {
            state.insert_record("build", "b", record("b"));
            state
        })
        .unwrap();

    assert!(updated.record("build", "a").is_some());
    assert!(updated.record("build", "b").is_some());
}

#[test]
fn test_concurrent_updates_through_separate_handles() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fingerprints.json");

    // Each thread opens its own handle to the same file and performs a
    // series of merges. Handles to one path share the mutation lock, so no
    // merge may be lost and no write may fail.
    std::thread::scope(|scope| {
        for thread in 0..2 {
            let path = path.clone();
            scope.spawn(move || {
                let store = FingerprintStore::new(path);
                for step in 0..8 {
                    let module = format!("t{thread}/m{step}");
                    store
                        .update(|mut state| {
                            state.insert_record("build", &module, record(&module));
                            state
                        })
                        .unwrap();
                }
            });
        }
    });

    let state = FingerprintStore::new(&path).read().unwrap();
    for thread in 0..2 {
        for step in 0..8 {
            let module = format!("t{thread}/m{step}");
            assert!(state.record("build", &module).is_some(), "{module}");
        }
    }
}

#[test]
fn test_handles_to_same_path_share_one_lock() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fingerprints.json");

    // Different spellings of one location resolve to the same lock key.
    std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
    let spelled = temp_dir.path().join("sub/../fingerprints.json");
    assert_eq!(super::lock_key(&path), super::lock_key(&spelled));

    // A different file in the same directory gets its own key.
    let other = temp_dir.path().join("other.json");
    assert_ne!(super::lock_key(&path), super::lock_key(&other));
}

#[test]
fn test_emptied_marker_counts_as_empty_store() {
    let mut state = StoreState::new();
    state.insert_record("build", "a", record("a"));
    assert!(!state.is_empty());

    assert!(state.remove_record("build", "a"));
    assert!(!state.remove_record("build", "a"));
    // The marker key may remain, but the store is semantically empty.
    assert!(state.is_empty());
    assert!(state.record("build", "a").is_none());
}
