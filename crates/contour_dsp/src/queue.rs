//! Bounded Sample Queue
//!
//! Fixed-capacity single-producer/single-consumer ring of preallocated slots,
//! used to move audio blocks, FFT frames and analyzer paths between contexts.
//!
//! # Overwrite Policy
//!
//! When the ring is full, `push()` overwrites the oldest unread item instead of
//! blocking. The display path tolerates dropped data; the audio path never
//! depends on this queue.
//!
//! # Memory Model
//!
//! Two monotonically increasing counters track the ring:
//! - `write`: total items published. Only the producer stores to it.
//! - `read`: total items consumed or overwritten. The consumer advances it on
//!   pop, the producer advances it when it drops the oldest item.
//!
//! Each slot carries a `busy` flag taken with a non-blocking compare-exchange
//! by whichever side copies in or out of it. Whoever holds the flag of slot
//! `read % capacity` is the only party allowed to move `read`. Neither side
//! ever waits on the flag: a producer that finds the oldest slot busy drops
//! the incoming item, a consumer that finds it busy reports "nothing ready".

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{DspError, DspResult};

struct Slot<T> {
    busy: AtomicBool,
    value: UnsafeCell<T>,
}

impl<T> Slot<T> {
    #[inline]
    fn try_lock(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    fn unlock(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

struct Shared<T> {
    slots: Box<[Slot<T>]>,
    write: AtomicUsize,
    read: AtomicUsize,
    dropped: AtomicU64,
}

// Slot contents are only touched while holding that slot's `busy` flag
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn len(&self) -> usize {
        // `read` first: `write` can only have moved further ahead since
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        write.wrapping_sub(read).min(self.capacity())
    }
}

/// Create a bounded queue with `capacity` slots, each preallocated as a clone
/// of `prototype`.
///
/// For growable item types (e.g. `Vec<f32>`), size the prototype like the
/// items that will be pushed so that slot copies never reallocate.
pub fn bounded_queue<T: Clone + Send>(
    capacity: usize,
    prototype: &T,
) -> DspResult<(QueueProducer<T>, QueueConsumer<T>)> {
    if capacity == 0 {
        return Err(DspError::InvalidCapacity(capacity));
    }

    let slots = (0..capacity)
        .map(|_| Slot {
            busy: AtomicBool::new(false),
            value: UnsafeCell::new(prototype.clone()),
        })
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        slots,
        write: AtomicUsize::new(0),
        read: AtomicUsize::new(0),
        dropped: AtomicU64::new(0),
    });

    Ok((
        QueueProducer {
            shared: Arc::clone(&shared),
        },
        QueueConsumer { shared },
    ))
}

/// Writing end of a [`bounded_queue`]. Exactly one exists per queue.
pub struct QueueProducer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> QueueProducer<T> {
    /// Copy `item` into the next slot, overwriting the oldest unread item if
    /// the queue is full.
    ///
    /// # Real-time Safety
    /// - No allocations (slots are reused via `clone_from`)
    /// - No locks, never waits
    /// - O(item size)
    #[inline]
    pub fn push(&mut self, item: &T) {
        let shared = &*self.shared;
        let capacity = shared.capacity();
        let write = shared.write.load(Ordering::Relaxed);
        let slot = &shared.slots[write % capacity];

        if !slot.try_lock() {
            // The consumer is copying out the oldest item, which lives in the
            // slot we would overwrite. Drop the incoming item instead.
            shared.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let read = shared.read.load(Ordering::Acquire);
        if write.wrapping_sub(read) >= capacity
            && shared
                .read
                .compare_exchange(
                    read,
                    read.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        {
            shared.dropped.fetch_add(1, Ordering::Relaxed);
        }

        // Safety: we hold the slot's busy flag
        unsafe {
            (*slot.value.get()).clone_from(item);
        }
        slot.unlock();

        shared.write.store(write.wrapping_add(1), Ordering::Release);
    }

    /// Number of unread items
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Items discarded by the overwrite policy since construction
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Reading end of a [`bounded_queue`]. Exactly one exists per queue.
pub struct QueueConsumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> QueueConsumer<T> {
    /// Copy the oldest unread item into `out`.
    ///
    /// Returns `false` immediately if nothing is available, including the rare
    /// case where the producer is overwriting the oldest slot at this instant.
    pub fn try_pop(&mut self, out: &mut T) -> bool {
        let shared = &*self.shared;
        let capacity = shared.capacity();

        loop {
            let read = shared.read.load(Ordering::Acquire);
            let write = shared.write.load(Ordering::Acquire);
            if read == write {
                return false;
            }

            let slot = &shared.slots[read % capacity];
            if !slot.try_lock() {
                return false;
            }

            // The producer may have dropped this item between our load and the lock
            if shared.read.load(Ordering::Acquire) != read {
                slot.unlock();
                continue;
            }

            // Safety: we hold the slot's busy flag
            unsafe {
                out.clone_from(&*slot.value.get());
            }
            shared.read.store(read.wrapping_add(1), Ordering::Release);
            slot.unlock();
            return true;
        }
    }

    /// Number of unread items
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Items discarded by the overwrite policy since construction
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
