// SPSC ring synchronised through shared head/tail indices with local
// snapshots, after "Correct and Efficient Bounded FIFO Queues"
// (https://www.irif.fr/~guatto/papers/sbac13.pdf). Each side re-reads the
// peer's index only when its cached copy says the fast path is blocked.
//
// Counters are signed and monotonic; they are masked on slot access and
// never wrap within the lifetime of a process.

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{AtomicIsize, Ordering};

use crate::storage::{DynamicStorage, PlainSlot, StaticStorage, Storage};
use crate::{PopError, PushError, SpscQueue};

// Shared tail plus the producer's snapshot of head.
#[repr(C, align(64))]
struct ProducerSide {
    tail: AtomicIsize,
    cached_head: UnsafeCell<isize>,
}

// Shared head plus the consumer's snapshot of tail.
#[repr(C, align(64))]
struct ConsumerSide {
    head: AtomicIsize,
    cached_tail: UnsafeCell<isize>,
}

#[repr(C)]
pub struct IndexQueue<T, S = DynamicStorage<PlainSlot<T>>>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    prod: ProducerSide,
    cons: ConsumerSide,
    storage: S,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, S> Send for IndexQueue<T, S> where S: Storage<Slot = PlainSlot<T>> + Send {}
unsafe impl<T: Send, S> Sync for IndexQueue<T, S> where S: Storage<Slot = PlainSlot<T>> + Sync {}

impl<T> IndexQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(DynamicStorage::new(capacity))
    }
}

impl<T, const N: usize> IndexQueue<T, StaticStorage<PlainSlot<T>, N>> {
    pub fn new_static() -> Self {
        Self::new(StaticStorage::new())
    }
}

impl<T, S> IndexQueue<T, S>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    pub fn new(storage: S) -> Self {
        debug_assert!(storage.capacity().is_power_of_two());
        Self {
            prod: ProducerSide {
                tail: AtomicIsize::new(0),
                cached_head: UnsafeCell::new(0),
            },
            cons: ConsumerSide {
                head: AtomicIsize::new(0),
                cached_tail: UnsafeCell::new(0),
            },
            storage,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    // Resets the queue to empty. `&mut self` rules out concurrent access.
    pub fn clear(&mut self) {
        let head = self.cons.head.load(Ordering::Relaxed);
        let tail = self.prod.tail.load(Ordering::Relaxed);
        if mem::needs_drop::<T>() {
            let mut i = head;
            while i != tail {
                let slot = self.storage.slot(i as usize);
                unsafe { (*slot.value.get()).assume_init_drop() };
                i += 1;
            }
        }
        self.prod.tail.store(0, Ordering::Relaxed);
        self.cons.head.store(0, Ordering::Relaxed);
        unsafe {
            *self.prod.cached_head.get() = 0;
            *self.cons.cached_tail.get() = 0;
        }
    }
}

impl<T, S> SpscQueue<T> for IndexQueue<T, S>
where
    T: Send + 'static,
    S: Storage<Slot = PlainSlot<T>> + Send + Sync + 'static,
{
    type PushError = PushError<T>;
    type PopError = PopError;

    #[inline]
    fn push(&self, item: T) -> Result<(), PushError<T>> {
        let capacity = self.storage.capacity() as isize;
        let tail = self.prod.tail.load(Ordering::Relaxed);

        let mut cached_head = unsafe { *self.prod.cached_head.get() };
        if cached_head + capacity - tail < 1 {
            // Snapshot is stale; refresh once and re-check.
            cached_head = self.cons.head.load(Ordering::Acquire);
            unsafe { *self.prod.cached_head.get() = cached_head };
            if cached_head + capacity - tail < 1 {
                return Err(PushError(item));
            }
        }

        let slot = self.storage.slot(tail as usize);
        unsafe { (*slot.value.get()).write(item) };

        self.prod.tail.store(tail + 1, Ordering::Release);
        Ok(())
    }

    #[inline]
    fn pop(&self) -> Result<T, PopError> {
        let head = self.cons.head.load(Ordering::Relaxed);

        let mut cached_tail = unsafe { *self.cons.cached_tail.get() };
        if cached_tail - head < 1 {
            cached_tail = self.prod.tail.load(Ordering::Acquire);
            unsafe { *self.cons.cached_tail.get() = cached_tail };
            if cached_tail - head < 1 {
                return Err(PopError);
            }
        }

        let slot = self.storage.slot(head as usize);
        let item = unsafe { (*slot.value.get()).assume_init_read() };

        self.cons.head.store(head + 1, Ordering::Release);
        Ok(item)
    }

    fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        if max == 0 {
            return 0;
        }

        let head = self.cons.head.load(Ordering::Relaxed);

        let mut cached_tail = unsafe { *self.cons.cached_tail.get() };
        if cached_tail - head < 1 {
            cached_tail = self.prod.tail.load(Ordering::Acquire);
            unsafe { *self.cons.cached_tail.get() = cached_tail };
            if cached_tail - head < 1 {
                return 0;
            }
        }

        let taken = max.min((cached_tail - head) as usize);
        for i in 0..taken {
            let slot = self.storage.slot((head + i as isize) as usize);
            out.push(unsafe { (*slot.value.get()).assume_init_read() });
        }

        // One release publishes the whole batch.
        self.cons.head.store(head + taken as isize, Ordering::Release);
        taken
    }

    // Advisory: relaxed loads, either counter may move underneath us.
    #[inline]
    fn available(&self) -> bool {
        let head = self.cons.head.load(Ordering::Relaxed);
        let tail = self.prod.tail.load(Ordering::Relaxed);
        tail - head < self.storage.capacity() as isize
    }

    // Advisory, same caveat.
    #[inline]
    fn empty(&self) -> bool {
        let head = self.cons.head.load(Ordering::Relaxed);
        let tail = self.prod.tail.load(Ordering::Relaxed);
        head == tail
    }
}

impl<T, S> Drop for IndexQueue<T, S>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    fn drop(&mut self) {
        if mem::needs_drop::<T>() {
            let head = self.cons.head.load(Ordering::Relaxed);
            let tail = self.prod.tail.load(Ordering::Relaxed);
            let mut i = head;
            while i != tail {
                let slot = self.storage.slot(i as usize);
                unsafe { (*slot.value.get()).assume_init_drop() };
                i += 1;
            }
        }
    }
}

impl<T, S> fmt::Debug for IndexQueue<T, S>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexQueue")
            .field("capacity", &self.storage.capacity())
            .field("head", &self.cons.head.load(Ordering::Relaxed))
            .field("tail", &self.prod.tail.load(Ordering::Relaxed))
            .finish()
    }
}
