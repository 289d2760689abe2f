//! Byte accounting for decoded batch buffers.
//!
//! A `BufferAllocator` is an injected, cloneable handle: every decoder and chunk
//! source of one cursor shares the same handle, and unrelated cursors can be given
//! separate ones. Batches hold a `MemoryReservation` for their Arrow buffers, and
//! dropping the batch returns the bytes.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Result, RowsetError};

#[derive(Debug, Default)]
struct AllocatorState {
    reserved: AtomicUsize,
    peak: AtomicUsize,
    limit: Option<usize>,
}

/// Tracks the bytes held by live batches, the high-water mark, and an optional limit.
#[derive(Debug, Clone, Default)]
pub struct BufferAllocator {
    state: Arc<AllocatorState>,
}

impl BufferAllocator {
    /// An allocator without a limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator that refuses reservations once `limit` bytes are in use.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: Arc::new(AllocatorState {
                limit: Some(limit),
                ..AllocatorState::default()
            }),
        }
    }

    /// Builds the allocator described by an optional configured limit.
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(limit) => Self::with_limit(limit),
            None => Self::new(),
        }
    }

    /// Reserves `bytes`, failing with `MemoryLimitExceeded` if the limit would be crossed.
    pub fn reserve(&self, bytes: usize) -> Result<MemoryReservation> {
        let state = &self.state;
        let updated = state
            .reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.checked_add(bytes)?;
                match state.limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            });

        match updated {
            Ok(previous) => {
                state.peak.fetch_max(previous + bytes, Ordering::AcqRel);
                Ok(MemoryReservation {
                    state: Arc::clone(state),
                    bytes,
                })
            }
            Err(current) => Err(RowsetError::MemoryLimitExceeded {
                requested: bytes,
                reserved: current,
                limit: state.limit.unwrap_or(usize::MAX),
            }),
        }
    }

    /// Bytes currently held by live reservations.
    pub fn reserved(&self) -> usize {
        self.state.reserved.load(Ordering::Acquire)
    }

    /// The largest value `reserved()` has ever reached.
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> Option<usize> {
        self.state.limit
    }
}

/// RAII guard over reserved bytes; releases them on drop.
pub struct MemoryReservation {
    state: Arc<AllocatorState>,
    bytes: usize,
}

impl MemoryReservation {
    pub fn size(&self) -> usize {
        self.bytes
    }
}

impl fmt::Debug for MemoryReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReservation")
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl Drop for MemoryReservation {
    fn drop(&mut self) {
        self.state.reserved.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}
