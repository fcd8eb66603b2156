//! Borrowed array views
//!
//! [`ArrayView`] wraps storage owned by someone else: an [`OwnedArray`], a
//! slice of a loaded image, or caller-supplied data. A view never frees.

use crate::allocator::{AllocError, Allocator};
use crate::array::OwnedArray;
use std::ops::{Deref, Index};
use std::sync::Arc;

/// Read-only view over externally owned elements
///
/// Copying a view is a shallow alias of the same storage; see
/// [`ArrayView::deep_copy`] for an independent copy.
#[derive(Debug, PartialEq, Eq)]
pub struct ArrayView<'a, T> {
    data: &'a [T],
}

impl<T> Clone for ArrayView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayView<'_, T> {}

impl<'a, T> ArrayView<'a, T> {
    /// Wrap existing storage
    #[inline]
    #[must_use]
    pub const fn new(data: &'a [T]) -> Self {
        Self { data }
    }

    /// View of nothing
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self { data: &[] }
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the view has no elements
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Underlying slice with the view's lifetime
    #[inline]
    #[must_use]
    pub const fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Checked element access
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.data.get(index)
    }

    /// Another alias of the same storage
    #[inline]
    #[must_use]
    pub const fn shallow_copy(&self) -> Self {
        Self { data: self.data }
    }
}

impl<T: Clone> ArrayView<'_, T> {
    /// Copy every element into fresh storage charged to `allocator`
    ///
    /// # Errors
    /// Returns error if the allocator refuses the block
    pub fn deep_copy(&self, allocator: Arc<dyn Allocator>) -> Result<OwnedArray<T>, AllocError> {
        OwnedArray::from_vec_in(self.data.to_vec(), allocator)
    }
}

impl<T> Default for ArrayView<'_, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Deref for ArrayView<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.data
    }
}

impl<T> Index<usize> for ArrayView<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.data.get(index) {
            Some(item) => item,
            None => panic!(
                "index {index} out of bounds for view of length {}",
                self.data.len()
            ),
        }
    }
}

impl<'a, T> From<&'a [T]> for ArrayView<'a, T> {
    fn from(data: &'a [T]) -> Self {
        Self::new(data)
    }
}

impl<'a, T> IntoIterator for ArrayView<'a, T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: serde::Serialize> serde::Serialize for ArrayView<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.data.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::TrackingAllocator;

    #[test]
    fn view_over_caller_storage() {
        let storage = [1, 2, 3];
        let view = ArrayView::new(&storage);

        assert_eq!(view.len(), 3);
        assert_eq!(view[2], 3);
        assert_eq!(view.get(3), None);
    }

    #[test]
    fn shallow_copy_aliases() {
        let storage = vec![4, 5];
        let view = ArrayView::new(&storage);
        let alias = view.shallow_copy();

        assert_eq!(alias.as_slice().as_ptr(), storage.as_ptr());
    }

    #[test]
    fn deep_copy_from_view_charges_allocator() {
        let tracking = Arc::new(TrackingAllocator::new());
        let storage = vec![1u32, 2, 3, 4];
        let copy = ArrayView::new(&storage).deep_copy(tracking.clone()).unwrap();

        assert_eq!(copy.as_slice(), storage.as_slice());
        assert_eq!(tracking.stats().live_bytes, 16);
        drop(copy);
        assert!(tracking.is_balanced());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn view_index_out_of_bounds_panics() {
        let view: ArrayView<'_, u8> = ArrayView::empty();
        let _value = view[0];
    }
}
