pub mod storage;

pub mod mpsc;
pub mod spsc;
pub mod unsync;

pub use storage::DynamicStorage;
pub use storage::FlaggedSlot;
pub use storage::PlainSlot;
pub use storage::StaticStorage;
pub use storage::Storage;

pub use spsc::FlagQueue;
pub use spsc::IndexQueue;

pub use mpsc::TicketQueue;

pub use unsync::UnsyncQueue;

use core::fmt;

// Push failure: the queue was full. Hands the rejected item back so the
// caller can decide whether to retry or drop it.
#[derive(Debug, PartialEq, Eq)]
pub struct PushError<T>(pub T);

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T: fmt::Debug> std::error::Error for PushError<T> {}

// Pop failure: the queue was empty.
#[derive(Debug, PartialEq, Eq)]
pub struct PopError;

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is empty")
    }
}

impl std::error::Error for PopError {}

// Common interface for the single-producer single-consumer queues.
//
// One thread may call `push`/`available` while one other thread calls
// `pop`/`pop_batch`/`empty`. Anything beyond that is outside the contract.
pub trait SpscQueue<T: Send>: Send + 'static {
    // Error on push when the queue is full.
    type PushError;
    // Error on pop when the queue is empty.
    type PopError;

    fn push(&self, item: T) -> Result<(), Self::PushError>;
    fn pop(&self) -> Result<T, Self::PopError>;

    // Moves up to `max` contiguous items into `out` without blocking and
    // returns how many were taken. Variants override this with a drain that
    // pays for one synchronising edge per batch instead of one per element.
    fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut taken = 0;
        while taken < max {
            match self.pop() {
                Ok(item) => {
                    out.push(item);
                    taken += 1;
                }
                Err(_) => break,
            }
        }
        taken
    }

    /// True when a subsequent `push` *may* succeed.
    fn available(&self) -> bool;
    /// True when a subsequent `pop` will fail.
    fn empty(&self) -> bool;
}

// Common interface for the multi-producer single-consumer queues.
//
// Any number of threads may push concurrently; exactly one thread pops.
pub trait MpscQueue<T: Send>: Send + Sync + 'static {
    // Error on pop when the queue is empty.
    type PopError;

    // Reserving a slot cannot be rolled back, so a push into a full queue
    // waits for the consumer instead of failing.
    fn push(&self, item: T);

    // Called by the single consumer.
    fn pop(&self) -> Result<T, Self::PopError>;

    // Non-blocking batch drain, consumer side. Same shape as
    // `SpscQueue::pop_batch`.
    fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut taken = 0;
        while taken < max {
            match self.pop() {
                Ok(item) => {
                    out.push(item);
                    taken += 1;
                }
                Err(_) => break,
            }
        }
        taken
    }

    // Advisory: a producer that has reserved a slot but not yet published it
    // leaves the queue looking non-empty while nothing is readable yet.
    fn is_empty(&self) -> bool;

    // Advisory, same caveat as `is_empty`.
    fn is_full(&self) -> bool;
}
