//! Binary search by name hash
//!
//! Every array in an image is sorted ascending by name hash, so one
//! comparator-driven search serves record arrays, name tables and id lists.
//!
//! When several elements share a hash, exactly one of them is returned and
//! which one is unspecified. [`equal_range`] exposes all of them.

use crate::attribute::Attribute;
use crate::name::{Name, NameSpan};
use crate::primitive::{Class, Enum, EnumConstant, Field, Function, Namespace, Primitive, Template, TemplateType, Type};
use std::cmp::Ordering;
use std::ops::Range;

/// Anything with a name hash
pub trait Hashed {
    /// Lookup key
    fn name_hash(&self) -> u32;
}

impl Hashed for NameSpan {
    #[inline]
    fn name_hash(&self) -> u32 {
        self.hash
    }
}

impl Hashed for Name<'_> {
    #[inline]
    fn name_hash(&self) -> u32 {
        self.hash
    }
}

impl<T: Hashed + ?Sized> Hashed for &T {
    #[inline]
    fn name_hash(&self) -> u32 {
        (**self).name_hash()
    }
}

macro_rules! impl_hashed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Hashed for $ty {
                #[inline]
                fn name_hash(&self) -> u32 {
                    self.header().name.hash
                }
            }
        )*
    };
}

impl_hashed!(Type, EnumConstant, Enum, Field, Function, TemplateType, Template, Class, Namespace, Attribute);

/// Index of an element comparing equal to `hash`, or `None`
///
/// `cmp(element, hash)` orders the element relative to the target. Runs in
/// O(log n) comparisons.
pub fn search_by<T, F>(items: &[T], hash: u32, mut cmp: F) -> Option<usize>
where
    F: FnMut(&T, u32) -> Ordering,
{
    items.binary_search_by(|item| cmp(item, hash)).ok()
}

/// Index of an element whose key is `hash`
pub fn search_by_key<T, F>(items: &[T], hash: u32, mut key: F) -> Option<usize>
where
    F: FnMut(&T) -> u32,
{
    search_by(items, hash, |item, target| key(item).cmp(&target))
}

/// Index of an element whose name hash is `hash`
#[inline]
pub fn search<T: Hashed>(items: &[T], hash: u32) -> Option<usize> {
    search_by_key(items, hash, Hashed::name_hash)
}

/// Element whose name hash is `hash`
#[inline]
pub fn find<T: Hashed>(items: &[T], hash: u32) -> Option<&T> {
    search(items, hash).map(|i| &items[i])
}

/// Index range of every element whose key is `hash`
pub fn equal_range<T, F>(items: &[T], hash: u32, mut key: F) -> Range<usize>
where
    F: FnMut(&T) -> u32,
{
    let start = items.partition_point(|item| key(item) < hash);
    let len = items[start..].partition_point(|item| key(item) == hash);
    start..start + len
}

/// Index of the first element whose key is smaller than its predecessor's
pub fn first_unsorted_by<T, F>(items: &[T], mut key: F) -> Option<usize>
where
    F: FnMut(&T) -> u32,
{
    items
        .windows(2)
        .position(|pair| key(&pair[0]) > key(&pair[1]))
        .map(|i| i + 1)
}

/// True when `items` are ascending by name hash
#[inline]
pub fn is_sorted_by_hash<T: Hashed>(items: &[T]) -> bool {
    first_unsorted_by(items, Hashed::name_hash).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::TextSpan;

    fn names(hashes: &[u32]) -> Vec<NameSpan> {
        hashes.iter().map(|&h| NameSpan::new(h, TextSpan::EMPTY)).collect()
    }

    #[test]
    fn search_hits_and_misses() {
        let items = names(&[5, 17, 42, 99, 256]);

        for (i, hash) in [5, 17, 42, 99, 256].into_iter().enumerate() {
            assert_eq!(search(&items, hash), Some(i));
        }
        assert_eq!(search(&items, 7), None);
        assert_eq!(search(&items, 0), None);
        assert_eq!(search(&items, 1000), None);
    }

    #[test]
    fn search_empty() {
        let items: Vec<NameSpan> = Vec::new();
        assert_eq!(search(&items, 1), None);
        assert_eq!(equal_range(&items, 1, |n| n.hash), 0..0);
    }

    #[test]
    fn search_with_custom_comparator() {
        let items = [1u32, 3, 9];
        assert_eq!(search_by(&items, 9, |item, target| item.cmp(&target)), Some(2));
        assert_eq!(search_by_key(&items, 4, |item| *item), None);
    }

    #[test]
    fn duplicates_return_one_match() {
        let items = names(&[1, 4, 4, 4, 9]);
        let found = search(&items, 4).unwrap();
        assert!((1..4).contains(&found));
        assert_eq!(equal_range(&items, 4, |n| n.hash), 1..4);
        assert_eq!(equal_range(&items, 5, |n| n.hash), 4..4);
    }

    #[test]
    fn sortedness() {
        assert!(is_sorted_by_hash(&names(&[1, 1, 2, 8])));
        assert_eq!(first_unsorted_by(&names(&[1, 3, 2]), |n| n.hash), Some(2));
    }

    #[test]
    fn find_through_references() {
        let items = names(&[2, 6]);
        let refs: Vec<&NameSpan> = items.iter().collect();
        assert_eq!(find(&refs, 6).map(|n| n.hash), Some(6));
    }
}
