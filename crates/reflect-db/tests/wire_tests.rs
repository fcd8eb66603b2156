//! File round trips, configuration and allocator accounting

use pretty_assertions::assert_eq;
use reflect_db::{
    write_image_file, BinaryLoader, Database, DatabaseConfig, ImageLoader, LoadError, MemoryImage, ReloadPolicy,
    SharedDatabase, WireHeader, HEADER_LEN,
};
use reflect_model::{hash_name, Profile};
use reflect_test_utils::*;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.rfdb");
    let image = sample_image();

    let written = write_image_file(&image, &path).unwrap();
    assert_eq!(written, std::fs::metadata(&path).unwrap().len());

    let mut db = Database::new();
    db.load_file(&path, None).unwrap();
    assert_eq!(db.image(), &image);
    assert!(db.get_class(hash_name("Player")).is_some());
}

#[test]
fn test_header_describes_payload() {
    let image = sample_image();
    let bytes = encode(&image);

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&bytes[..HEADER_LEN]);
    let header = WireHeader::decode(&header).unwrap();

    assert_eq!(header.profile, Profile::Full);
    assert_eq!(header.payload_len as usize, bytes.len() - HEADER_LEN);
    assert_eq!(header.checksum_prefix().len(), 16);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut db = Database::new();

    let err = db.load_file(dir.path().join("absent.rfdb"), None).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
    assert!(!db.is_loaded());
}

#[test]
fn test_corrupt_file_leaves_database_unloaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.rfdb");
    let mut bytes = encode(&scenario_b());
    let mid = HEADER_LEN + (bytes.len() - HEADER_LEN) / 2;
    bytes[mid] ^= 0x5a;
    std::fs::write(&path, &bytes).unwrap();

    let mut db = Database::new();
    let err = db.load_file(&path, None).unwrap_err();
    assert!(err.is_corrupt());
    assert!(!db.is_loaded());
}

#[test]
fn test_config_from_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reflect.toml");
    std::fs::write(
        &path,
        "reload = \"replace\"\nprofile = \"reduced\"\nverify_on_load = false\nmax_image_bytes = 4096\n",
    )
    .unwrap();

    let config = DatabaseConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.reload, ReloadPolicy::Replace);
    assert_eq!(config.profile, Profile::Reduced);
    assert!(!config.verify_on_load);
    assert_eq!(config.max_image_bytes, Some(4096));
}

#[test]
fn test_configured_profile_applies_to_load() {
    let config = DatabaseConfig::new().with_profile(Profile::Reduced);

    let mut db = Database::with_config(config.clone());
    let err = db.try_load(&mut Cursor::new(encode(&sample_image())), None).unwrap_err();
    assert!(matches!(err, LoadError::ProfileMismatch { .. }));

    let mut db = Database::with_config(config);
    assert!(db.load(&mut Cursor::new(encode(&sample_reduced_image())), None));
}

#[test]
fn test_configured_size_limit_applies_to_load() {
    let mut db = Database::with_config(DatabaseConfig::new().with_max_image_bytes(64));
    let err = db.try_load(&mut Cursor::new(encode(&sample_image())), None).unwrap_err();
    assert!(matches!(err, LoadError::TooLarge { max: 64, .. }));
}

#[test]
fn test_allocator_balanced_after_drop() {
    let (tracking, allocator) = tracking_allocator();
    {
        let mut db = Database::new();
        assert!(db.load(&mut Cursor::new(encode(&sample_image())), Some(&allocator)));
        assert!(tracking.stats().live_bytes > 0);
        assert_eq!(db.image().charged_bytes(), tracking.stats().live_bytes);
    }
    assert!(tracking.is_balanced());
}

#[test]
fn test_replace_frees_old_image_after_swap() {
    let (tracking, allocator) = tracking_allocator();
    let mut db = Database::with_config(DatabaseConfig::new().with_reload(ReloadPolicy::Replace));

    assert!(db.load(&mut Cursor::new(encode(&scenario_a())), Some(&allocator)));
    assert!(db.load(&mut Cursor::new(encode(&scenario_b())), Some(&allocator)));

    assert_eq!(tracking.stats().live_bytes, db.image().charged_bytes());
    assert!(db.get_function(FUNCTION_HASHES[0]).is_some());

    drop(db);
    assert!(tracking.is_balanced());
}

#[test]
fn test_reject_policy_does_not_read_input() {
    let mut db = Database::new();
    assert!(db.load(&mut Cursor::new(encode(&scenario_a())), None));

    let mut second = Cursor::new(encode(&scenario_b()));
    assert!(!db.load(&mut second, None));
    assert_eq!(second.position(), 0);
    assert!(db.get_namespace(NAMESPACE_N).is_some());
}

#[test]
fn test_custom_loader_seam() {
    struct Fixed;

    impl ImageLoader for Fixed {
        fn load(
            &self,
            input: &mut dyn Read,
            _allocator: Option<&Arc<dyn reflect_array::Allocator>>,
        ) -> Result<MemoryImage, LoadError> {
            let mut ignored = Vec::new();
            input.read_to_end(&mut ignored)?;
            Ok(scenario_a())
        }
    }

    let mut db = Database::new();
    db.load_with(&Fixed, &mut Cursor::new(Vec::new()), None).unwrap();
    assert!(db.get_type(CLASS_C).is_some());

    let shared = SharedDatabase::new();
    shared.load_with(&Fixed, &mut Cursor::new(Vec::new()), None).unwrap();
    assert!(shared.snapshot().get_type(CLASS_C).is_some());
}

#[test]
fn test_unverified_load_skips_validation() {
    let bytes = encode(&scenario_b());
    let image = BinaryLoader::new()
        .with_verify(false)
        .load(&mut Cursor::new(bytes), None)
        .unwrap();
    assert_eq!(image.stats().functions, 5);
}
