//! SPSC Ring - a wait-free bounded queue for one producer and one consumer.
//!
//! Power-of-two capacity, monotonically increasing cursors, masked indexing.
//! Under wrap-around arithmetic `tail - head` is always in `[0, cap]`, so
//! `tail == head` means empty and `tail - head == cap` means full with no
//! reserved slot. Each handle keeps a shadow copy of the peer cursor and
//! refreshes it from the atomic only when the shadow would predict full
//! (producer) or empty (consumer), amortising the cross-core load.
//!
//! Memory ordering: own-cursor loads are `Relaxed`, peer refreshes are
//! `Acquire`, publishes are `Release`. The slot handed off at cursor `c` is
//! visible to the other side the first time it observes the cursor past `c`.
//!
//! The [`Producer`]/[`Consumer`] halves take `&mut self`, so the
//! single-producer/single-consumer discipline is enforced at compile time.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Pads a value out to its own cache line to prevent false sharing
/// between the producer's and consumer's cursors.
#[repr(align(64))]
struct CachePadded<T>(T);

const _: () = assert!(std::mem::align_of::<CachePadded<AtomicUsize>>() == 64);

struct Shared<T> {
    /// Slot storage; a slot is initialised exactly while
    /// `head <= slot_cursor < tail`.
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Next cursor to pop (consumer-owned, producer reads on refresh)
    head: CachePadded<AtomicUsize>,
    /// Next cursor to push (producer-owned, consumer reads on refresh)
    tail: CachePadded<AtomicUsize>,
}

// One side writes a slot, publishes with Release; the other observes the
// cursor with Acquire before reading the slot. Values therefore move between
// threads, which is exactly `T: Send`.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn slot(&self, cursor: usize) -> *mut MaybeUninit<T> {
        self.buf[cursor & self.mask].get()
    }

    fn approx_size(&self) -> usize {
        // head first: it only grows, so a later tail read can only widen the
        // window. Clamp because the two loads still race.
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.capacity())
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // Sole owner at this point; drain whatever was never popped.
        let mut head = *self.head.0.get_mut();
        let tail = *self.tail.0.get_mut();
        while head != tail {
            unsafe { (*self.slot(head)).assume_init_drop() };
            head = head.wrapping_add(1);
        }
    }
}

/// Construction handle for the ring; [`SpscRing::split`] yields the two
/// usable endpoints.
pub struct SpscRing<T> {
    shared: Arc<Shared<T>>,
}

impl<T> SpscRing<T> {
    /// Create a ring with `capacity` usable slots.
    ///
    /// # Panics
    /// Panics unless `capacity` is a power of two and at least 2.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity >= 2 && capacity.is_power_of_two(),
            "ring capacity must be a power of two >= 2"
        );
        let buf = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shared: Arc::new(Shared {
                buf,
                mask: capacity - 1,
                head: CachePadded(AtomicUsize::new(0)),
                tail: CachePadded(AtomicUsize::new(0)),
            }),
        }
    }

    /// Split into the producer and consumer endpoints.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let producer = Producer {
            shared: Arc::clone(&self.shared),
            head_cache: 0,
        };
        let consumer = Consumer {
            shared: self.shared,
            tail_cache: 0,
        };
        (producer, consumer)
    }

    /// Number of usable slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// The push endpoint. Exactly one thread may own it at a time.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
    /// Last observed consumer cursor; refreshed only when it predicts full
    head_cache: usize,
}

impl<T> Producer<T> {
    /// Push a value, handing it back if the ring is full.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), T> {
        let tail = self.shared.tail.0.load(Ordering::Relaxed);

        if tail.wrapping_sub(self.head_cache) == self.shared.capacity() {
            // Shadow predicts full; see whether the consumer has moved on.
            self.head_cache = self.shared.head.0.load(Ordering::Acquire);
            if tail.wrapping_sub(self.head_cache) == self.shared.capacity() {
                return Err(value);
            }
        }

        unsafe { (*self.shared.slot(tail)).write(value) };
        self.shared.tail.0.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Cross-core estimate of the queue length, in `[0, capacity]`.
    #[inline]
    pub fn approx_size(&self) -> usize {
        self.shared.approx_size()
    }

    /// Number of usable slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// The pop endpoint. Exactly one thread may own it at a time.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
    /// Last observed producer cursor; refreshed only when it predicts empty
    tail_cache: usize,
}

impl<T> Consumer<T> {
    /// Pop the oldest value, if any.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let head = self.shared.head.0.load(Ordering::Relaxed);

        if head == self.tail_cache {
            // Shadow predicts empty; see whether the producer has published.
            self.tail_cache = self.shared.tail.0.load(Ordering::Acquire);
            if head == self.tail_cache {
                return None;
            }
        }

        let value = unsafe { (*self.shared.slot(head)).assume_init_read() };
        self.shared.head.0.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Pop up to `max_n` values into `out`, publishing `head` once.
    ///
    /// Returns the number of values moved.
    pub fn try_pop_n(&mut self, out: &mut Vec<T>, max_n: usize) -> usize {
        let mut head = self.shared.head.0.load(Ordering::Relaxed);

        if head == self.tail_cache {
            self.tail_cache = self.shared.tail.0.load(Ordering::Acquire);
        }

        let mut n = 0;
        while n < max_n && head != self.tail_cache {
            out.push(unsafe { (*self.shared.slot(head)).assume_init_read() });
            head = head.wrapping_add(1);
            n += 1;
        }
        if n > 0 {
            self.shared.head.0.store(head, Ordering::Release);
        }
        n
    }

    /// Cross-core estimate of the queue length, in `[0, capacity]`.
    #[inline]
    pub fn approx_size(&self) -> usize {
        self.shared.approx_size()
    }

    /// Number of usable slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}
