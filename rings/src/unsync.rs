// Single-thread ring with the same surface as the concurrent variants and
// none of their ordering operations. Useful as a measurement baseline and
// wherever a queue is confined to one thread; `&mut self` makes the
// confinement a compile-time fact.

use std::fmt;
use std::marker::PhantomData;
use std::mem;

use crate::storage::{DynamicStorage, PlainSlot, StaticStorage, Storage};
use crate::PopError;

pub struct UnsyncQueue<T, S = DynamicStorage<PlainSlot<T>>>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    head: usize,
    tail: usize,
    storage: S,
    _marker: PhantomData<T>,
}

impl<T> UnsyncQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(DynamicStorage::new(capacity))
    }
}

impl<T, const N: usize> UnsyncQueue<T, StaticStorage<PlainSlot<T>, N>> {
    pub fn new_static() -> Self {
        Self::new(StaticStorage::new())
    }
}

impl<T, S> UnsyncQueue<T, S>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    pub fn new(storage: S) -> Self {
        debug_assert!(storage.capacity().is_power_of_two());
        Self {
            head: 0,
            tail: 0,
            storage,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tail.wrapping_sub(self.head)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    // Never fails. A push into a full ring overwrites the oldest element,
    // which is dropped; keeping liveness above that is the caller's job.
    pub fn push(&mut self, item: T) {
        if self.len() == self.storage.capacity() {
            let slot = self.storage.slot(self.head);
            unsafe { (*slot.value.get()).assume_init_drop() };
            self.head = self.head.wrapping_add(1);
        }

        let slot = self.storage.slot(self.tail);
        unsafe { (*slot.value.get()).write(item) };
        self.tail = self.tail.wrapping_add(1);
    }

    pub fn pop(&mut self) -> Result<T, PopError> {
        if self.head == self.tail {
            return Err(PopError);
        }

        let slot = self.storage.slot(self.head);
        let item = unsafe { (*slot.value.get()).assume_init_read() };
        self.head = self.head.wrapping_add(1);
        Ok(item)
    }

    pub fn pop_batch(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let taken = max.min(self.len());
        for i in 0..taken {
            let slot = self.storage.slot(self.head.wrapping_add(i));
            out.push(unsafe { (*slot.value.get()).assume_init_read() });
        }
        self.head = self.head.wrapping_add(taken);
        taken
    }

    pub fn clear(&mut self) {
        if mem::needs_drop::<T>() {
            let mut i = self.head;
            while i != self.tail {
                let slot = self.storage.slot(i);
                unsafe { (*slot.value.get()).assume_init_drop() };
                i = i.wrapping_add(1);
            }
        }
        self.head = 0;
        self.tail = 0;
    }
}

impl<T, S> Drop for UnsyncQueue<T, S>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    fn drop(&mut self) {
        if mem::needs_drop::<T>() {
            let mut i = self.head;
            while i != self.tail {
                let slot = self.storage.slot(i);
                unsafe { (*slot.value.get()).assume_init_drop() };
                i = i.wrapping_add(1);
            }
        }
    }
}

impl<T, S> fmt::Debug for UnsyncQueue<T, S>
where
    S: Storage<Slot = PlainSlot<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsyncQueue")
            .field("capacity", &self.storage.capacity())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}
