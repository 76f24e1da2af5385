// MPSC ring: producers reserve slots with a fetch-and-add on the shared
// tail, then publish through the slot's readiness flag. The reservation is
// the single linearisation point between producers; after it, each producer
// works on a slot no other producer can touch until the ring laps.
//
// Delivery order follows slot order, not reservation-arrival order: two
// producers holding adjacent tickets publish independently.

use std::cell::UnsafeCell;
use std::fmt;
use std::hint;
use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

use crate::storage::{DynamicStorage, FlaggedSlot, StaticStorage, Storage};
use crate::{MpscQueue, PopError};

// Fetched-and-added by every producer.
#[repr(C, align(64))]
struct SharedTail {
    tail: AtomicUsize,
}

// Written by the consumer only.
#[repr(C, align(64))]
struct ConsumerPos {
    head: UnsafeCell<usize>,
}

#[repr(C)]
pub struct TicketQueue<T, S = DynamicStorage<FlaggedSlot<T>>>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    prod: SharedTail,
    cons: ConsumerPos,
    storage: S,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, S> Send for TicketQueue<T, S> where S: Storage<Slot = FlaggedSlot<T>> + Send {}
unsafe impl<T: Send, S> Sync for TicketQueue<T, S> where S: Storage<Slot = FlaggedSlot<T>> + Sync {}

impl<T> TicketQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(DynamicStorage::new(capacity))
    }
}

impl<T, const N: usize> TicketQueue<T, StaticStorage<FlaggedSlot<T>, N>> {
    pub fn new_static() -> Self {
        Self::new(StaticStorage::new())
    }
}

impl<T, S> TicketQueue<T, S>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    pub fn new(storage: S) -> Self {
        debug_assert!(storage.capacity().is_power_of_two());
        Self {
            prod: SharedTail {
                tail: AtomicUsize::new(0),
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

    // No `clear`: a reservation cannot be observed, let alone rolled back,
    // so a quiescent reset is spelled "drop the queue".
}

impl<T, S> MpscQueue<T> for TicketQueue<T, S>
where
    T: Send + 'static,
    S: Storage<Slot = FlaggedSlot<T>> + Send + Sync + 'static,
{
    type PopError = PopError;

    fn push(&self, item: T) {
        let ticket = self.prod.tail.fetch_add(1, Ordering::Relaxed);
        let slot = self.storage.slot(ticket);

        // The ring has lapped onto a slot the consumer has not drained yet.
        // Waiting here is the backpressure: the ticket is already ours.
        while slot.flag.load(Ordering::Acquire) {
            hint::spin_loop();
        }

        unsafe { (*slot.value.get()).write(item) };
        slot.flag.store(true, Ordering::Release);
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

    // Consumer-side advisory check: a reserved but unpublished slot makes
    // the queue look non-empty while nothing is readable yet.
    #[inline]
    fn is_empty(&self) -> bool {
        let head = unsafe { *self.cons.head.get() };
        head == self.prod.tail.load(Ordering::Relaxed)
    }

    // Consumer-side advisory check.
    #[inline]
    fn is_full(&self) -> bool {
        let head = unsafe { *self.cons.head.get() };
        self.prod.tail.load(Ordering::Relaxed).wrapping_sub(head) >= self.storage.capacity()
    }
}

impl<T, S> Drop for TicketQueue<T, S>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    fn drop(&mut self) {
        if mem::needs_drop::<T>() {
            // Published values may sit anywhere in the ring at this point.
            for i in 0..self.storage.capacity() {
                let slot = self.storage.slot(i);
                if slot.flag.load(Ordering::Relaxed) {
                    unsafe { (*slot.value.get()).assume_init_drop() };
                }
            }
        }
    }
}

impl<T, S> fmt::Debug for TicketQueue<T, S>
where
    S: Storage<Slot = FlaggedSlot<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketQueue")
            .field("capacity", &self.storage.capacity())
            .field("head", unsafe { &*self.cons.head.get() })
            .field("tail", &self.prod.tail.load(Ordering::Relaxed))
            .finish()
    }
}
