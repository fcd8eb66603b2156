//! Reflect DB
//!
//! Read-only reflection database: an immutable memory image of hash-sorted
//! record arenas, the builder and loader that produce it, and the façade
//! that answers queries against it.
//!
//! # Overview
//!
//! - **Image**: [`MemoryImage`] arenas, pools and name blobs, plus validation
//! - **Builder**: [`ImageBuilder`] sorts, remaps and links generator records
//! - **Views**: [`Ref`], [`TypeRef`] and [`PrimitiveRef`] walk the record graph
//! - **Loader**: versioned wire format behind the [`ImageLoader`] seam
//! - **Façade**: single-owner [`Database`] and shared [`SharedDatabase`]
//!
//! # Example
//!
//! ```rust
//! use reflect_db::{encode_image, Database, ImageBuilder};
//! use reflect_model::{hash_name, PrimitiveId, Qualifier};
//! use std::io::Cursor;
//!
//! let mut builder = ImageBuilder::new();
//! let int = builder.add_type("int", PrimitiveId::ROOT, 4).unwrap();
//! let class = builder.add_class("Vector3", PrimitiveId::ROOT, 12).unwrap();
//! builder.add_field("x", class, Some(int.into()), Qualifier::VALUE, 0).unwrap();
//! let bytes = encode_image(&builder.build().unwrap()).unwrap();
//!
//! let mut db = Database::new();
//! assert!(db.load(&mut Cursor::new(bytes), None));
//!
//! let class = db.get_type(hash_name("Vector3")).unwrap().as_class();
//! assert_eq!(class.fields().len(), 1);
//! assert_eq!(db.get_name(hash_name("x")).as_str(), "x");
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod database;
pub mod error;
pub mod image;
pub mod loader;
pub mod shared;
pub mod validate;
pub mod view;

// Re-exports
pub use builder::{ImageBuilder, NameInput};
pub use config::{DatabaseConfig, ReloadPolicy};
pub use database::Database;
pub use error::{BuildError, ConfigError, ImageError, LoadError, WriteError};
pub use image::{ImageStats, MemoryImage, Store};
pub use loader::{
    encode_image, write_image, write_image_file, BinaryLoader, ImageLoader, WireHeader, FORMAT_VERSION, HEADER_LEN,
    MAGIC,
};
pub use shared::{SharedDatabase, Snapshot};
pub use view::{PrimitiveRef, Ref, Refs, TypeRef};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building, loading and querying databases
    pub use crate::{
        BuildError, Database, DatabaseConfig, ImageBuilder, ImageLoader, LoadError, MemoryImage, PrimitiveRef, Ref,
        Refs, ReloadPolicy, SharedDatabase, Snapshot, TypeRef,
    };
    pub use reflect_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
