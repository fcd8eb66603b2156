//! Database façade
//!
//! [`Database`] owns at most one [`MemoryImage`] and answers name, type,
//! namespace and function queries against it. Loading goes through an
//! [`ImageLoader`]; a failed load leaves the façade as it was.
//!
//! Queries on a façade that never loaded successfully are a caller bug and
//! panic. Check [`Database::is_loaded`] first.
//!
//! Lookups are binary searches by name hash. When two records share a hash,
//! a lookup returns one of them and which one is unspecified.

use crate::config::{DatabaseConfig, ReloadPolicy};
use crate::error::LoadError;
use crate::image::{ImageStats, MemoryImage};
use crate::loader::{BinaryLoader, ImageLoader};
use crate::view::{Ref, TypeRef};
use reflect_array::Allocator;
use reflect_model::{Class, Enum, Function, Name, Namespace, Template};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// Single-owner reflection database
///
/// Not `Clone`: the image has one owner. Move the façade to transfer it.
#[derive(Debug, Default)]
pub struct Database {
    image: Option<MemoryImage>,
    config: DatabaseConfig,
}

impl Database {
    /// Create an unloaded database with default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unloaded database
    #[inline]
    #[must_use]
    pub fn with_config(config: DatabaseConfig) -> Self {
        Self { image: None, config }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Load from `input`, returning whether an image is now installed
    ///
    /// Use [`Database::try_load`] to see why a load failed.
    pub fn load(&mut self, input: &mut dyn Read, allocator: Option<&Arc<dyn Allocator>>) -> bool {
        self.try_load(input, allocator).is_ok()
    }

    /// Load from `input` with the binary loader
    ///
    /// # Errors
    /// Returns [`LoadError::AlreadyLoaded`] under [`ReloadPolicy::Reject`] when
    /// an image is installed, or the loader's error
    pub fn try_load(
        &mut self,
        input: &mut dyn Read,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<(), LoadError> {
        let loader = BinaryLoader::from_config(&self.config);
        self.load_with(&loader, input, allocator)
    }

    /// Load from a file with the binary loader
    ///
    /// # Errors
    /// Returns error if the file cannot be opened, or as [`Database::try_load`]
    pub fn load_file(
        &mut self,
        path: impl AsRef<Path>,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<(), LoadError> {
        self.check_reload()?;
        let mut reader = BufReader::new(File::open(path)?);
        self.try_load(&mut reader, allocator)
    }

    /// Load from `input` with a custom loader
    ///
    /// Under [`ReloadPolicy::Replace`] the new image is fully loaded before
    /// the current one is dropped; on failure the current image stays.
    ///
    /// # Errors
    /// Returns [`LoadError::AlreadyLoaded`] under [`ReloadPolicy::Reject`] when
    /// an image is installed, or the loader's error
    pub fn load_with(
        &mut self,
        loader: &dyn ImageLoader,
        input: &mut dyn Read,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<(), LoadError> {
        self.check_reload()?;
        let image = loader.load(input, allocator)?;
        self.install(image)
    }

    /// Install an already built or loaded image
    ///
    /// # Errors
    /// Returns [`LoadError::AlreadyLoaded`] under [`ReloadPolicy::Reject`] when
    /// an image is installed
    pub fn install(&mut self, image: MemoryImage) -> Result<(), LoadError> {
        self.check_reload()?;
        if let Some(old) = self.image.replace(image) {
            tracing::info!(old_records = old.stats().records(), "replaced reflection database");
        }
        Ok(())
    }

    fn check_reload(&self) -> Result<(), LoadError> {
        if self.image.is_some() && self.config.reload == ReloadPolicy::Reject {
            tracing::warn!("rejected reload of an already loaded reflection database");
            return Err(LoadError::AlreadyLoaded);
        }
        Ok(())
    }

    /// True once an image is installed
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Take the image out, leaving the database unloaded
    pub fn unload(&mut self) -> Option<MemoryImage> {
        self.image.take()
    }

    /// Consume the façade and return its image
    #[must_use]
    pub fn into_image(self) -> Option<MemoryImage> {
        self.image
    }

    /// The loaded image
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn image(&self) -> &MemoryImage {
        match &self.image {
            Some(image) => image,
            None => panic!("database queried before a successful load"),
        }
    }

    /// Name with `hash`, or the empty name
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_name(&self, hash: u32) -> Name<'_> {
        self.image().get_name(hash)
    }

    /// Name with the hash of `text`, or the empty name
    ///
    /// With colliding names the returned text may differ from `text`.
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_name_by_text(&self, text: &str) -> Name<'_> {
        self.image().get_name_by_text(text)
    }

    /// Type, enum, class or template instance with `hash`
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_type(&self, hash: u32) -> Option<TypeRef<'_>> {
        self.image().get_type(hash)
    }

    /// Namespace with `hash`
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_namespace(&self, hash: u32) -> Option<Ref<'_, Namespace>> {
        self.image().get_namespace(hash)
    }

    /// Function or method with `hash`
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_function(&self, hash: u32) -> Option<Ref<'_, Function>> {
        self.image().get_function(hash)
    }

    /// Class with `hash`
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_class(&self, hash: u32) -> Option<Ref<'_, Class>> {
        self.image().get_class(hash)
    }

    /// Enum with `hash`
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_enum(&self, hash: u32) -> Option<Ref<'_, Enum>> {
        self.image().get_enum(hash)
    }

    /// Template with `hash`
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn get_template(&self, hash: u32) -> Option<Ref<'_, Template>> {
        self.image().get_template(hash)
    }

    /// Root namespace
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn root(&self) -> Ref<'_, Namespace> {
        self.image().root()
    }

    /// Record counts and sizes
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn stats(&self) -> ImageStats {
        self.image().stats()
    }
}

impl From<MemoryImage> for Database {
    fn from(image: MemoryImage) -> Self {
        Self {
            image: Some(image),
            config: DatabaseConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use crate::loader::encode_image;
    use reflect_model::{hash_name, PrimitiveId};
    use std::io::Cursor;

    fn image_with(function: &str) -> MemoryImage {
        let mut builder = ImageBuilder::new();
        builder.add_function(function, PrimitiveId::ROOT, 0, 1).unwrap();
        builder.build().unwrap()
    }

    fn bytes_with(function: &str) -> Vec<u8> {
        encode_image(&image_with(function)).unwrap()
    }

    #[test]
    fn new_database_not_loaded() {
        let db = Database::new();
        assert!(!db.is_loaded());
        assert_eq!(db.config().reload, ReloadPolicy::Reject);
    }

    #[test]
    fn load_then_query() {
        let mut db = Database::new();
        assert!(db.load(&mut Cursor::new(bytes_with("main")), None));
        assert!(db.is_loaded());

        let f = db.get_function(hash_name("main")).unwrap();
        assert_eq!(f.name().as_str(), "main");
        assert_eq!(db.get_name_by_text("main").as_str(), "main");
        assert!(db.get_name(hash_name("absent")).is_empty());
        assert!(db.get_type(hash_name("main")).is_none());
    }

    #[test]
    fn failed_load_stays_unloaded() {
        let mut db = Database::new();
        assert!(!db.load(&mut Cursor::new(b"garbage".to_vec()), None));
        assert!(!db.is_loaded());
    }

    #[test]
    fn reject_policy_keeps_first_image() {
        let mut db = Database::new();
        assert!(db.load(&mut Cursor::new(bytes_with("first")), None));

        let err = db.try_load(&mut Cursor::new(bytes_with("second")), None).unwrap_err();
        assert!(matches!(err, LoadError::AlreadyLoaded));
        assert!(db.get_function(hash_name("first")).is_some());
        assert!(db.get_function(hash_name("second")).is_none());
    }

    #[test]
    fn replace_policy_swaps_image() {
        let mut db = Database::with_config(DatabaseConfig::new().with_reload(ReloadPolicy::Replace));
        assert!(db.load(&mut Cursor::new(bytes_with("first")), None));
        assert!(db.load(&mut Cursor::new(bytes_with("second")), None));

        assert!(db.get_function(hash_name("first")).is_none());
        assert!(db.get_function(hash_name("second")).is_some());
    }

    #[test]
    fn failed_replace_keeps_old_image() {
        let mut db = Database::with_config(DatabaseConfig::new().with_reload(ReloadPolicy::Replace));
        assert!(db.load(&mut Cursor::new(bytes_with("first")), None));
        assert!(!db.load(&mut Cursor::new(b"RFDB".to_vec()), None));

        assert!(db.get_function(hash_name("first")).is_some());
    }

    #[test]
    fn install_and_unload() {
        let mut db = Database::new();
        db.install(image_with("main")).unwrap();
        assert!(db.is_loaded());

        let image = db.unload().unwrap();
        assert!(!db.is_loaded());
        assert!(image.get_function(hash_name("main")).is_some());
    }

    #[test]
    #[should_panic(expected = "database queried before a successful load")]
    fn query_before_load_panics() {
        let db = Database::new();
        let _ = db.get_name(1);
    }

    #[test]
    #[should_panic(expected = "database queried before a successful load")]
    fn query_after_failed_load_panics() {
        let mut db = Database::new();
        let _ = db.load(&mut Cursor::new(Vec::new()), None);
        let _ = db.get_type(hash_name("int"));
    }
}
