//! Owned array - contiguous storage that frees itself
//!
//! Provides [`OwnedArray`], the container every per-kind record store of a
//! database image is built on. Ownership is visible in the type: an
//! `OwnedArray` always owns its elements, while borrowing is done through
//! [`ArrayView`](crate::ArrayView).

use crate::allocator::{array_bytes, AllocError, Allocator, Block};
use crate::view::ArrayView;
use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, Index, IndexMut};
use std::sync::Arc;

/// Allocator binding of an owned array
struct Charge {
    allocator: Arc<dyn Allocator>,
    block: Option<Block>,
}

/// Contiguous run of `T` that owns its storage
///
/// Three ways to build one:
/// - [`OwnedArray::new`]: empty, no allocator
/// - [`OwnedArray::with_len`]: `len` default-constructed elements charged to an allocator
/// - [`OwnedArray::from_vec`] / [`OwnedArray::from_vec_in`]: adopt existing elements
///
/// When an allocator is attached, the bytes charged at construction are
/// returned to it exactly once on drop.
///
/// # Invariants
/// - Indexing out of range is a contract violation and panics
/// - Order is preserved by every operation except [`OwnedArray::unstable_remove`]
pub struct OwnedArray<T> {
    data: Vec<T>,
    charge: Option<Charge>,
}

impl<T> OwnedArray<T> {
    /// Create empty array without allocator
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            charge: None,
        }
    }

    /// Adopt a vector; nothing is charged to any allocator
    #[inline]
    #[must_use]
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data, charge: None }
    }

    /// Adopt a vector and charge its size to `allocator`
    ///
    /// # Errors
    /// Returns error if the allocator refuses the block
    pub fn from_vec_in(data: Vec<T>, allocator: Arc<dyn Allocator>) -> Result<Self, AllocError> {
        let block = allocator.alloc(array_bytes::<T>(data.len())?)?;
        Ok(Self {
            data,
            charge: Some(Charge {
                allocator,
                block: Some(block),
            }),
        })
    }

    /// Adopt a vector, charging `allocator` when one is given
    ///
    /// # Errors
    /// Returns error if the allocator refuses the block
    pub fn from_vec_with(
        data: Vec<T>,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<Self, AllocError> {
        match allocator {
            Some(allocator) => Self::from_vec_in(data, Arc::clone(allocator)),
            None => Ok(Self::from_vec(data)),
        }
    }

    /// Number of live elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when there are no live elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements as a slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Checked element access
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Checked mutable element access
    #[inline]
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    /// Attached allocator, if any
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> Option<&Arc<dyn Allocator>> {
        self.charge.as_ref().map(|c| &c.allocator)
    }

    /// Bytes charged to the attached allocator
    #[inline]
    #[must_use]
    pub fn charged_bytes(&self) -> usize {
        self.charge
            .as_ref()
            .and_then(|c| c.block.as_ref())
            .map_or(0, Block::size)
    }

    /// Remove element `index` in O(1) by moving the last element into its slot
    ///
    /// Only for arrays whose order is not an invariant; a sorted array is no
    /// longer sorted afterwards. Storage is not released until drop.
    ///
    /// # Panics
    /// Panics if `index` is out of range
    pub fn unstable_remove(&mut self, index: usize) -> T {
        assert!(
            index < self.data.len(),
            "unstable_remove index {index} out of range for array of length {}",
            self.data.len()
        );
        self.data.swap_remove(index)
    }

    /// Alias this array's storage without taking ownership
    ///
    /// The borrow checker guarantees the view cannot outlive the array and
    /// that only the array frees the storage.
    #[inline]
    #[must_use]
    pub fn view(&self) -> ArrayView<'_, T> {
        ArrayView::new(&self.data)
    }

    /// Consume the array, returning its elements
    ///
    /// Any allocator charge is released first.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<T> {
        self.release();
        std::mem::take(&mut self.data)
    }

    fn release(&mut self) {
        if let Some(charge) = self.charge.as_mut() {
            if let Some(block) = charge.block.take() {
                charge.allocator.free(block);
            }
        }
    }
}

impl<T: Default> OwnedArray<T> {
    /// Allocate `len` default-constructed elements charged to `allocator`
    ///
    /// # Errors
    /// Returns error if the allocator refuses the block
    pub fn with_len(len: usize, allocator: Arc<dyn Allocator>) -> Result<Self, AllocError> {
        let block = allocator.alloc(array_bytes::<T>(len)?)?;
        let mut data = Vec::with_capacity(len);
        data.resize_with(len, T::default);
        Ok(Self {
            data,
            charge: Some(Charge {
                allocator,
                block: Some(block),
            }),
        })
    }
}

impl<T: Clone> OwnedArray<T> {
    /// Copy every element into fresh storage charged to `allocator`
    ///
    /// # Errors
    /// Returns error if the allocator refuses the block
    pub fn deep_copy(&self, allocator: Arc<dyn Allocator>) -> Result<Self, AllocError> {
        self.view().deep_copy(allocator)
    }
}

impl<T> Drop for OwnedArray<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Default for OwnedArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for OwnedArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> Index<usize> for OwnedArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.data.get(index) {
            Some(item) => item,
            None => panic!(
                "index {index} out of bounds for array of length {}",
                self.data.len()
            ),
        }
    }
}

impl<T> IndexMut<usize> for OwnedArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.data.len();
        match self.data.get_mut(index) {
            Some(item) => item,
            None => panic!("index {index} out of bounds for array of length {len}"),
        }
    }
}

impl<T: PartialEq> PartialEq for OwnedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T: Debug> Debug for OwnedArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedArray")
            .field("len", &self.data.len())
            .field("charged_bytes", &self.charged_bytes())
            .field("data", &self.data)
            .finish()
    }
}

impl<T> From<Vec<T>> for OwnedArray<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<'a, T> IntoIterator for &'a OwnedArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: serde::Serialize> serde::Serialize for OwnedArray<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.data.serialize(serializer)
    }
}

impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for OwnedArray<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<T>::deserialize(deserializer).map(Self::from_vec)
    }
}
