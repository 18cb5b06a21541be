#[cfg(loom)]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(loom))]
use std::sync::atomic::{AtomicU32, Ordering};

/// Shared count of visible objects, which doubles as the slot allocator of the
/// command buffer.
///
/// The only way to move the counter is [`reserve`](Self::reserve), a single
/// indivisible fetch-and-increment. The counter never goes past its capacity.
#[derive(Debug)]
pub struct VisibleCounter {
    value: AtomicU32,
    capacity: u32,
}

impl VisibleCounter {
    pub fn new(capacity: u32) -> Self {
        Self {
            value: AtomicU32::new(0),
            capacity,
        }
    }

    /// Increments the counter and returns its previous value, which is the
    /// slot the caller now owns.
    ///
    /// Returns `None` without touching the counter once it has reached capacity.
    pub fn reserve(&self) -> Option<u32> {
        let capacity = self.capacity;
        self.value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < capacity).then_some(current + 1)
            })
            .ok()
    }

    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.get() >= self.capacity
    }

    /// Zeroes the counter before the next dispatch.
    pub fn reset(&mut self) {
        self.value.store(0, Ordering::Release);
    }
}
