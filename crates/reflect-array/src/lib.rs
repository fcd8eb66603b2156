//! Reflect Arrays
//!
//! Contiguous element storage with ownership visible in the type.
//!
//! # Overview
//!
//! - **OwnedArray**: owns its elements, optionally charged to an [`Allocator`]
//! - **ArrayView**: borrows elements owned elsewhere, never frees
//! - **Allocator**: accounting seam for owned storage
//!
//! # Example
//!
//! ```rust
//! use reflect_array::{OwnedArray, TrackingAllocator};
//! use std::sync::Arc;
//!
//! let tracking = Arc::new(TrackingAllocator::new());
//! let mut array = OwnedArray::from_vec_in(vec![1u32, 2, 3], tracking.clone()).unwrap();
//!
//! array.unstable_remove(0);
//! assert_eq!(array.as_slice(), &[3, 2]);
//!
//! drop(array);
//! assert!(tracking.is_balanced());
//! ```

#![warn(missing_docs)]

pub mod allocator;
pub mod array;
pub mod view;

// Re-exports
pub use allocator::{array_bytes, AllocError, AllocStats, Allocator, Block, SystemAllocator, TrackingAllocator};
pub use array::OwnedArray;
pub use view::ArrayView;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
