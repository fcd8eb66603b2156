//! Shared database for concurrent readers
//!
//! [`SharedDatabase`] publishes images behind a `parking_lot::RwLock` holding
//! an `Arc`. Readers take a [`Snapshot`], which keeps its image alive after a
//! reload swaps in a new one. Loading happens outside the lock; only the swap
//! is done under the write guard.

use crate::config::{DatabaseConfig, ReloadPolicy};
use crate::error::LoadError;
use crate::image::MemoryImage;
use crate::loader::{BinaryLoader, ImageLoader};
use parking_lot::RwLock;
use reflect_array::Allocator;
use std::io::Read;
use std::ops::Deref;
use std::sync::Arc;

/// Reflection database shared between threads
#[derive(Debug, Default)]
pub struct SharedDatabase {
    image: RwLock<Option<Arc<MemoryImage>>>,
    config: DatabaseConfig,
}

impl SharedDatabase {
    /// Create an unloaded database with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unloaded database
    #[must_use]
    pub fn with_config(config: DatabaseConfig) -> Self {
        Self {
            image: RwLock::new(None),
            config,
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Load from `input`, returning whether an image is now installed
    pub fn load(&self, input: &mut dyn Read, allocator: Option<&Arc<dyn Allocator>>) -> bool {
        self.try_load(input, allocator).is_ok()
    }

    /// Load from `input` with the binary loader
    ///
    /// # Errors
    /// Returns [`LoadError::AlreadyLoaded`] under [`ReloadPolicy::Reject`] when
    /// an image is installed, or the loader's error
    pub fn try_load(
        &self,
        input: &mut dyn Read,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<(), LoadError> {
        let loader = BinaryLoader::from_config(&self.config);
        self.load_with(&loader, input, allocator)
    }

    /// Load from `input` with a custom loader
    ///
    /// # Errors
    /// Returns [`LoadError::AlreadyLoaded`] under [`ReloadPolicy::Reject`] when
    /// an image is installed, or the loader's error
    pub fn load_with(
        &self,
        loader: &dyn ImageLoader,
        input: &mut dyn Read,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<(), LoadError> {
        if self.is_loaded() {
            self.check_reload()?;
        }
        let image = loader.load(input, allocator)?;
        self.install(image)
    }

    /// Publish an already built or loaded image
    ///
    /// # Errors
    /// Returns [`LoadError::AlreadyLoaded`] under [`ReloadPolicy::Reject`] when
    /// an image is installed
    pub fn install(&self, image: MemoryImage) -> Result<(), LoadError> {
        let image = Arc::new(image);
        let old = {
            let mut slot = self.image.write();
            if slot.is_some() {
                self.check_reload()?;
            }
            slot.replace(image)
        };
        if let Some(old) = old {
            tracing::info!(
                readers = Arc::strong_count(&old) - 1,
                "replaced shared reflection database"
            );
        }
        Ok(())
    }

    fn check_reload(&self) -> Result<(), LoadError> {
        if self.config.reload == ReloadPolicy::Reject {
            tracing::warn!("rejected reload of an already loaded reflection database");
            return Err(LoadError::AlreadyLoaded);
        }
        Ok(())
    }

    /// True once an image is published
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.image.read().is_some()
    }

    /// Current image, if any
    #[must_use]
    pub fn try_snapshot(&self) -> Option<Snapshot> {
        self.image.read().as_ref().map(|image| Snapshot(Arc::clone(image)))
    }

    /// Current image
    ///
    /// # Panics
    /// Panics if no image is loaded
    #[must_use]
    #[track_caller]
    pub fn snapshot(&self) -> Snapshot {
        match self.try_snapshot() {
            Some(snapshot) => snapshot,
            None => panic!("database queried before a successful load"),
        }
    }
}

/// Reader's handle on one published image
///
/// Derefs to [`MemoryImage`], so every query of the image is available.
#[derive(Debug, Clone)]
pub struct Snapshot(Arc<MemoryImage>);

impl Snapshot {
    /// The image
    #[inline]
    #[must_use]
    pub fn image(&self) -> &MemoryImage {
        &self.0
    }

    /// True when both snapshots hold the same published image
    #[inline]
    #[must_use]
    pub fn same_image(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Snapshot {
    type Target = MemoryImage;

    fn deref(&self) -> &MemoryImage {
        &self.0
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

    #[test]
    fn load_and_snapshot() {
        let db = SharedDatabase::new();
        assert!(db.try_snapshot().is_none());

        let bytes = encode_image(&image_with("main")).unwrap();
        assert!(db.load(&mut Cursor::new(bytes), None));

        let snapshot = db.snapshot();
        assert!(snapshot.get_function(hash_name("main")).is_some());
    }

    #[test]
    fn snapshot_survives_replace() {
        let db = SharedDatabase::with_config(DatabaseConfig::new().with_reload(ReloadPolicy::Replace));
        db.install(image_with("first")).unwrap();
        let before = db.snapshot();

        db.install(image_with("second")).unwrap();
        let after = db.snapshot();

        assert!(!before.same_image(&after));
        assert!(before.get_function(hash_name("first")).is_some());
        assert!(after.get_function(hash_name("second")).is_some());
        assert!(after.get_function(hash_name("first")).is_none());
    }

    #[test]
    fn reject_policy() {
        let db = SharedDatabase::new();
        db.install(image_with("first")).unwrap();

        assert!(matches!(db.install(image_with("second")), Err(LoadError::AlreadyLoaded)));
        assert!(db.snapshot().get_function(hash_name("first")).is_some());
    }

    #[test]
    #[should_panic(expected = "database queried before a successful load")]
    fn snapshot_before_load_panics() {
        let _ = SharedDatabase::new().snapshot();
    }
}
