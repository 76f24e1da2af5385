// SPSC ring synchronised through a per-slot readiness flag. Producer and
// consumer each keep a private cursor and never read the other side's
// cursor; the slot they are positioned on is the only shared state, so the
// counters generate no cross-core traffic at all.

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{fence, Ordering};

use crate::storage::{DynamicStorage, FlaggedSlot, StaticStorage, Storage};
use crate::{PopError, PushError, SpscQueue};

// Written by the producer only.
#[repr(C, align(64))]
struct ProducerPos {
    tail: UnsafeCell<usize>,
}

// Written by the consumer only.
#[repr(C, align(64))]
struct ConsumerPos {
    head: UnsafeCell<usize>,
}

#[repr(C)]
pub struct FlagQueue<T, S = DynamicStorage<FlaggedSlot<T>>>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    prod: ProducerPos,
    cons: ConsumerPos,
    storage: S,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, S> Send for FlagQueue<T, S> where S: Storage<Slot = FlaggedSlot<T>> + Send {}
unsafe impl<T: Send, S> Sync for FlagQueue<T, S> where S: Storage<Slot = FlaggedSlot<T>> + Sync {}

impl<T> FlagQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(DynamicStorage::new(capacity))
    }
}

impl<T, const N: usize> FlagQueue<T, StaticStorage<FlaggedSlot<T>, N>> {
    pub fn new_static() -> Self {
        Self::new(StaticStorage::new())
    }
}

impl<T, S> FlagQueue<T, S>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    pub fn new(storage: S) -> Self {
        debug_assert!(storage.capacity().is_power_of_two());
        Self {
            prod: ProducerPos {
                tail: UnsafeCell::new(0),
            },
            cons: ConsumerPos {
                head: UnsafeCell::new(0),
            },
            storage,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    // Resets the queue to empty. Taking `&mut self` rules out concurrent
    // pushes and pops while the flags are being rewound.
    pub fn clear(&mut self) {
        for i in 0..self.storage.capacity() {
            let slot = self.storage.slot(i);
            if slot.flag.load(Ordering::Relaxed) {
                unsafe { (*slot.value.get()).assume_init_drop() };
                slot.flag.store(false, Ordering::Relaxed);
            }
        }
        unsafe {
            *self.prod.tail.get() = 0;
            *self.cons.head.get() = 0;
        }
    }
}

impl<T, S> SpscQueue<T> for FlagQueue<T, S>
where
    T: Send + 'static,
    S: Storage<Slot = FlaggedSlot<T>> + Send + Sync + 'static,
{
    type PushError = PushError<T>;
    type PopError = PopError;

    #[inline]
    fn push(&self, item: T) -> Result<(), PushError<T>> {
        let tail = unsafe { *self.prod.tail.get() };
        let slot = self.storage.slot(tail);

        // Still holding last lap's value: the ring is full. The acquire
        // pairs with the consumer's release reset, so the slot's previous
        // occupant is fully read out before we overwrite it.
        if slot.flag.load(Ordering::Acquire) {
            return Err(PushError(item));
        }

        unsafe { (*slot.value.get()).write(item) };
        slot.flag.store(true, Ordering::Release);

        unsafe { *self.prod.tail.get() = tail.wrapping_add(1) };
        Ok(())
    }

    #[inline]
    fn pop(&self) -> Result<T, PopError> {
        let head = unsafe { *self.cons.head.get() };
        let slot = self.storage.slot(head);

        if !slot.flag.load(Ordering::Acquire) {
            return Err(PopError);
        }

        let item = unsafe { (*slot.value.get()).assume_init_read() };
        slot.flag.store(false, Ordering::Release);

        unsafe { *self.cons.head.get() = head.wrapping_add(1) };
        Ok(item)
    }

    fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        if max == 0 {
            return 0;
        }

        let head = unsafe { *self.cons.head.get() };

        // One acquire edge for the whole batch; the slots behind it were
        // published before the first one we observed.
        if !self.storage.slot(head).flag.load(Ordering::Acquire) {
            return 0;
        }

        let mut taken = 0;
        while taken < max {
            let slot = self.storage.slot(head.wrapping_add(taken));
            if taken > 0 && !slot.flag.load(Ordering::Relaxed) {
                break;
            }
            out.push(unsafe { (*slot.value.get()).assume_init_read() });
            slot.flag.store(false, Ordering::Relaxed);
            taken += 1;
        }

        unsafe { *self.cons.head.get() = head.wrapping_add(taken) };
        // Publish every flag reset of the batch together.
        fence(Ordering::Release);
        taken
    }

    #[inline]
    fn available(&self) -> bool {
        let tail = unsafe { *self.prod.tail.get() };
        !self.storage.slot(tail).flag.load(Ordering::Acquire)
    }

    // Exact: publication is observed on the slot flag itself.
    #[inline]
    fn empty(&self) -> bool {
        let head = unsafe { *self.cons.head.get() };
        !self.storage.slot(head).flag.load(Ordering::Acquire)
    }
}

impl<T, S> Drop for FlagQueue<T, S>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    fn drop(&mut self) {
        if mem::needs_drop::<T>() {
            for i in 0..self.storage.capacity() {
                let slot = self.storage.slot(i);
                if slot.flag.load(Ordering::Relaxed) {
                    unsafe { (*slot.value.get()).assume_init_drop() };
                }
            }
        }
    }
}

impl<T, S> fmt::Debug for FlagQueue<T, S>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagQueue")
            .field("capacity", &self.storage.capacity())
            .field("head", unsafe { &*self.cons.head.get() })
            .field("tail", unsafe { &*self.prod.tail.get() })
            .finish()
    }
}
