// Backing storage for the ring queues: a fixed array of slots whose length
// is a power of two, either inline (capacity chosen at compile time) or
// heap-backed (capacity chosen at construction).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicBool;

// Capacities above this would let the signed index arithmetic of the cached
// variants misbehave long before the counters themselves wrap.
pub const MAX_CAPACITY: usize = 1 << 31;

/// Slot carrying a value plus a readiness flag.
///
/// `false` means the slot is writable by a producer, `true` means it holds a
/// value that has been published and not yet consumed.
#[repr(C)]
pub struct FlaggedSlot<T> {
    pub(crate) flag: AtomicBool,
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for FlaggedSlot<T> {
    fn default() -> Self {
        Self {
            flag: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

// The flag serialises all access to `value`.
unsafe impl<T: Send> Send for FlaggedSlot<T> {}
unsafe impl<T: Send> Sync for FlaggedSlot<T> {}

/// Slot carrying only a value; readiness is inferred from index comparisons
/// by the queue that owns the storage.
#[repr(C)]
pub struct PlainSlot<T> {
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for PlainSlot<T> {
    fn default() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

// The owning queue's index protocol serialises all access to `value`.
unsafe impl<T: Send> Send for PlainSlot<T> {}
unsafe impl<T: Send> Sync for PlainSlot<T> {}

/// Fixed-capacity, power-of-two indexable slot array.
///
/// Implementations guarantee `capacity()` is a power of two in
/// `1..=MAX_CAPACITY` so that `index & mask()` is a valid position for any
/// unbounded counter value.
pub trait Storage {
    type Slot;

    fn capacity(&self) -> usize;

    #[inline]
    fn mask(&self) -> usize {
        self.capacity() - 1
    }

    // Slot at `index` modulo capacity. No bounds check beyond the mask.
    fn slot(&self, index: usize) -> &Self::Slot;
}

/// Inline storage with capacity fixed at compile time.
pub struct StaticStorage<S, const N: usize> {
    slots: [S; N],
}

impl<S: Default, const N: usize> StaticStorage<S, N> {
    // Evaluated when `new` is instantiated, so an invalid `N` fails the
    // build rather than the process.
    const CAPACITY_OK: () = assert!(
        N > 0 && N & (N - 1) == 0 && N <= MAX_CAPACITY,
        "capacity must be a power of two in 1..=2^31"
    );

    pub fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            slots: core::array::from_fn(|_| S::default()),
        }
    }
}

impl<S: Default, const N: usize> Default for StaticStorage<S, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, const N: usize> Storage for StaticStorage<S, N> {
    type Slot = S;

    #[inline]
    fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn mask(&self) -> usize {
        N - 1
    }

    #[inline]
    fn slot(&self, index: usize) -> &S {
        // masked index is always in range
        unsafe { self.slots.get_unchecked(index & (N - 1)) }
    }
}

/// Heap-backed storage with capacity chosen at construction.
pub struct DynamicStorage<S> {
    slots: Box<[S]>,
    mask: usize,
}

impl<S: Default> DynamicStorage<S> {
    // A zero or non-power-of-two capacity is a programmer error, not a
    // recoverable condition.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity.is_power_of_two(),
            "capacity must be a power of two, got {capacity}"
        );
        assert!(
            capacity <= MAX_CAPACITY,
            "capacity must not exceed 2^31, got {capacity}"
        );

        let slots: Box<[S]> = (0..capacity).map(|_| S::default()).collect();
        Self {
            slots,
            mask: capacity - 1,
        }
    }
}

impl<S> Storage for DynamicStorage<S> {
    type Slot = S;

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.mask
    }

    #[inline]
    fn slot(&self, index: usize) -> &S {
        // masked index is always in range
        unsafe { self.slots.get_unchecked(index & self.mask) }
    }
}
