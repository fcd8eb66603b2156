//! Concurrent readers
//!
//! A loaded image is immutable, so queries need no coordination. The shared
//! façade also lets readers keep querying while a reload is published.

use reflect_db::{Database, DatabaseConfig, ReloadPolicy, SharedDatabase};
use reflect_model::hash_name;
use reflect_test_utils::*;
use std::io::Cursor;
use std::thread;

const READERS: usize = 8;
const ROUNDS: usize = 200;

#[test]
fn test_many_threads_query_one_database() {
    let mut db = Database::new();
    assert!(db.load(&mut Cursor::new(encode(&sample_image())), None));
    let db = &db;

    thread::scope(|scope| {
        for _ in 0..READERS {
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    assert_eq!(db.get_name(hash_name("Vector3")).as_str(), "Vector3");
                    assert!(db.get_type(hash_name("Player")).is_some());
                    assert!(db.get_function(hash_name("update")).is_some());
                    assert!(db.get_namespace(hash_name("math")).is_some());
                    assert!(db.get_type(hash_name("NotThere")).is_none());
                }
            });
        }
    });
}

#[test]
fn test_readers_see_whole_images_during_reload() {
    let shared = SharedDatabase::with_config(DatabaseConfig::new().with_reload(ReloadPolicy::Replace));
    shared.install(scenario_a()).unwrap();
    let a = encode(&scenario_a());
    let b = encode(&scenario_b());

    thread::scope(|scope| {
        for _ in 0..READERS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    let snapshot = shared.snapshot();
                    // A snapshot holds exactly one of the two images.
                    let is_a = snapshot.get_namespace(NAMESPACE_N).is_some();
                    let is_b = snapshot.get_function(FUNCTION_HASHES[0]).is_some();
                    assert!(is_a != is_b);
                }
            });
        }

        scope.spawn(|| {
            for round in 0..ROUNDS / 10 {
                let bytes = if round % 2 == 0 { &b } else { &a };
                assert!(shared.load(&mut Cursor::new(bytes.clone()), None));
            }
        });
    });

    assert!(shared.is_loaded());
}

#[test]
fn test_snapshot_outlives_database() {
    let shared = SharedDatabase::new();
    shared.install(scenario_b()).unwrap();
    let snapshot = shared.snapshot();
    drop(shared);

    for hash in FUNCTION_HASHES {
        assert!(snapshot.get_function(hash).is_some());
    }
}
