use proptest::prelude::*;
use reflect_array::{Allocator, ArrayView, OwnedArray, TrackingAllocator};
use std::sync::Arc;

fn tracker() -> (Arc<TrackingAllocator>, Arc<dyn Allocator>) {
    let tracking = Arc::new(TrackingAllocator::new());
    let allocator: Arc<dyn Allocator> = tracking.clone();
    (tracking, allocator)
}

proptest! {
    #[test]
    fn prop_deep_copy_is_equal_and_independent(values in proptest::collection::vec(any::<i64>(), 1..64), slot in any::<prop::sample::Index>()) {
        let (tracking, allocator) = tracker();
        let source = OwnedArray::from_vec(values.clone());
        let mut copy = source.deep_copy(allocator).unwrap();

        prop_assert_eq!(copy.len(), source.len());
        prop_assert_eq!(copy.as_slice(), source.as_slice());
        prop_assert_ne!(copy.as_ptr(), source.as_ptr());
        prop_assert_eq!(tracking.stats().live_bytes, values.len() * 8);

        let i = slot.index(values.len());
        let bumped = copy[i].wrapping_add(1);
        *copy.get_mut(i).unwrap() = bumped;
        prop_assert_eq!(source.as_slice(), values.as_slice());

        drop(copy);
        prop_assert!(tracking.is_balanced());
    }

    #[test]
    fn prop_unstable_remove_moves_last(values in proptest::collection::vec(any::<u32>(), 1..64), slot in any::<prop::sample::Index>()) {
        let n = values.len();
        let i = slot.index(n);
        let mut array = OwnedArray::from_vec(values.clone());

        let removed = array.unstable_remove(i);

        prop_assert_eq!(removed, values[i]);
        prop_assert_eq!(array.len(), n - 1);
        for (j, value) in array.iter().enumerate() {
            if j == i {
                prop_assert_eq!(*value, values[n - 1]);
            } else {
                prop_assert_eq!(*value, values[j]);
            }
        }
    }

    #[test]
    fn prop_view_aliases_without_charging(values in proptest::collection::vec(any::<u16>(), 0..64)) {
        let (tracking, allocator) = tracker();
        let array = OwnedArray::from_vec_in(values.clone(), allocator).unwrap();
        let charged = tracking.stats().live_bytes;

        let view = array.view();
        let alias = view.shallow_copy();
        prop_assert_eq!(alias.as_slice(), values.as_slice());
        prop_assert_eq!(tracking.stats().live_bytes, charged);
    }
}

#[test]
fn test_borrowed_view_never_frees() {
    let (tracking, _) = tracker();
    let storage = vec![1u8, 2, 3];
    {
        let view = ArrayView::from(storage.as_slice());
        assert_eq!(view.len(), 3);
    }
    assert_eq!(storage, vec![1, 2, 3]);
    assert!(tracking.is_balanced());
}

#[test]
fn test_allocator_limit_refuses_copy() {
    let limited: Arc<dyn Allocator> = Arc::new(TrackingAllocator::with_limit(4));
    let source = OwnedArray::from_vec(vec![0u64; 4]);

    assert!(source.deep_copy(limited).is_err());
}
