//! Allocator abstraction
//!
//! Provides the [`Allocator`] trait that owned arrays charge their storage to,
//! plus two implementations: [`SystemAllocator`] (unbounded, stateless) and
//! [`TrackingAllocator`] (counts live bytes and enforces an optional limit).
//!
//! The allocator hands out [`Block`] receipts rather than raw memory. The
//! storage itself is always owned by the array, so a block can never outlive
//! or alias the data it accounts for.

use parking_lot::Mutex;
use std::fmt::Debug;

/// Receipt for a successful allocation
///
/// Returned by [`Allocator::alloc`] and handed back to [`Allocator::free`]
/// exactly once when the owning array is dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct Block {
    size: usize,
}

impl Block {
    /// Size in bytes
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Source of storage for owned arrays
///
/// # Contract
/// - Every block returned by `alloc` is passed to `free` exactly once
/// - The allocator must outlive every array charged to it (enforced by `Arc`)
/// - Thread-safety across concurrent users is the implementation's concern
pub trait Allocator: Send + Sync + Debug {
    /// Reserve `size` bytes
    ///
    /// # Errors
    /// Returns error if the allocator cannot satisfy the request
    fn alloc(&self, size: usize) -> Result<Block, AllocError>;

    /// Release a block previously returned by [`Allocator::alloc`]
    fn free(&self, block: Block);
}

/// Allocation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// Limit reached
    #[error("allocator exhausted: requested {requested} bytes with {live} live of {limit} allowed")]
    Exhausted {
        /// Bytes asked for
        requested: usize,
        /// Configured limit
        limit: usize,
        /// Bytes live at the time of the request
        live: usize,
    },

    /// Element count times element size does not fit in usize
    #[error("allocation size overflow: {count} elements of {element_size} bytes")]
    SizeOverflow {
        /// Element count
        count: usize,
        /// Bytes per element
        element_size: usize,
    },
}

/// Byte size of `count` elements of `T`
///
/// # Errors
/// Returns error on overflow
#[inline]
pub fn array_bytes<T>(count: usize) -> Result<usize, AllocError> {
    let element_size = std::mem::size_of::<T>();
    count
        .checked_mul(element_size)
        .ok_or(AllocError::SizeOverflow {
            count,
            element_size,
        })
}

/// Allocator that always succeeds and keeps no state
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn alloc(&self, size: usize) -> Result<Block, AllocError> {
        Ok(Block { size })
    }

    fn free(&self, _block: Block) {}
}

/// Snapshot of a [`TrackingAllocator`]'s counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Bytes currently allocated
    pub live_bytes: usize,
    /// Highest value `live_bytes` has reached
    pub peak_bytes: usize,
    /// Blocks currently allocated
    pub live_blocks: usize,
    /// Total successful allocations
    pub total_allocs: u64,
    /// Total frees
    pub total_frees: u64,
}

/// Allocator that tracks usage and optionally enforces a byte limit
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    limit: Option<usize>,
    stats: Mutex<AllocStats>,
}

impl TrackingAllocator {
    /// Create unbounded tracking allocator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tracking allocator that refuses to exceed `limit` live bytes
    #[inline]
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            stats: Mutex::new(AllocStats::default()),
        }
    }

    /// Byte limit, if any
    #[inline]
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> AllocStats {
        *self.stats.lock()
    }

    /// True when every allocated block has been freed
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        let stats = self.stats.lock();
        stats.live_blocks == 0 && stats.live_bytes == 0
    }
}

impl Allocator for TrackingAllocator {
    fn alloc(&self, size: usize) -> Result<Block, AllocError> {
        let mut stats = self.stats.lock();
        if let Some(limit) = self.limit {
            if stats.live_bytes.saturating_add(size) > limit {
                return Err(AllocError::Exhausted {
                    requested: size,
                    limit,
                    live: stats.live_bytes,
                });
            }
        }
        stats.live_bytes += size;
        stats.live_blocks += 1;
        stats.total_allocs += 1;
        stats.peak_bytes = stats.peak_bytes.max(stats.live_bytes);
        Ok(Block { size })
    }

    fn free(&self, block: Block) {
        let mut stats = self.stats.lock();
        // Underflow here means a block was freed twice or to the wrong allocator.
        assert!(
            stats.live_blocks > 0 && stats.live_bytes >= block.size,
            "free of {} bytes does not match a live block",
            block.size
        );
        stats.live_bytes -= block.size;
        stats.live_blocks -= 1;
        stats.total_frees += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_always_succeeds() {
        let alloc = SystemAllocator;
        let block = alloc.alloc(usize::MAX).unwrap();
        assert_eq!(block.size(), usize::MAX);
        alloc.free(block);
    }

    #[test]
    fn tracking_allocator_counts() {
        let alloc = TrackingAllocator::new();
        let a = alloc.alloc(16).unwrap();
        let b = alloc.alloc(32).unwrap();

        let stats = alloc.stats();
        assert_eq!(stats.live_bytes, 48);
        assert_eq!(stats.live_blocks, 2);
        assert_eq!(stats.total_allocs, 2);

        alloc.free(a);
        alloc.free(b);
        assert!(alloc.is_balanced());
        assert_eq!(alloc.stats().peak_bytes, 48);
        assert_eq!(alloc.stats().total_frees, 2);
    }

    #[test]
    fn tracking_allocator_enforces_limit() {
        let alloc = TrackingAllocator::with_limit(64);
        let block = alloc.alloc(60).unwrap();

        let result = alloc.alloc(8);
        assert!(matches!(
            result,
            Err(AllocError::Exhausted { requested: 8, limit: 64, live: 60 })
        ));

        alloc.free(block);
        assert!(alloc.alloc(64).is_ok());
    }

    #[test]
    #[should_panic(expected = "does not match a live block")]
    fn tracking_allocator_rejects_foreign_free() {
        let alloc = TrackingAllocator::new();
        alloc.free(SystemAllocator.alloc(8).unwrap());
    }

    #[test]
    fn array_bytes_overflow() {
        assert_eq!(array_bytes::<u32>(4).unwrap(), 16);
        assert!(matches!(
            array_bytes::<u64>(usize::MAX),
            Err(AllocError::SizeOverflow { element_size: 8, .. })
        ));
    }
}
