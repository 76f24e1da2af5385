// Thread ping-pong throughput for the SPSC variants, scalar and batch
// drain, with the non-synchronising ring as a single-thread baseline.
// Producer and consumer are pinned to far-apart cores so the numbers show
// coherence traffic, not scheduler luck.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Barrier;
use std::time::{Duration, Instant};

use rings::{FlagQueue, IndexQueue, SpscQueue, UnsyncQueue};

const RING_CAP: usize = 1024;
const BATCH: usize = 64;

// Adapter so the harness drives every queue through one surface.
trait BenchSpscQueue<T: Send>: Send + Sync + 'static {
    fn bench_push(&self, item: T) -> Result<(), ()>;
    fn bench_pop(&self) -> Result<T, ()>;
    fn bench_pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize;
}

impl<T: Send + 'static> BenchSpscQueue<T> for FlagQueue<T> {
    fn bench_push(&self, item: T) -> Result<(), ()> {
        SpscQueue::push(self, item).map_err(|_| ())
    }
    fn bench_pop(&self) -> Result<T, ()> {
        SpscQueue::pop(self).map_err(|_| ())
    }
    fn bench_pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        SpscQueue::pop_batch(self, out, max)
    }
}

impl<T: Send + 'static> BenchSpscQueue<T> for IndexQueue<T> {
    fn bench_push(&self, item: T) -> Result<(), ()> {
        SpscQueue::push(self, item).map_err(|_| ())
    }
    fn bench_pop(&self) -> Result<T, ()> {
        SpscQueue::pop(self).map_err(|_| ())
    }
    fn bench_pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        SpscQueue::pop_batch(self, out, max)
    }
}

fn pin_current(core: usize) {
    if let Some(ids) = core_affinity::get_core_ids() {
        if let Some(id) = ids.get(core) {
            core_affinity::set_for_current(*id);
        }
    }
}

// First and middle core, hoping to land on distinct physical cores.
fn core_pair() -> (usize, usize) {
    let cores = core_affinity::get_core_ids().map_or(1, |ids| ids.len());
    if cores < 2 {
        (0, 0)
    } else {
        (0, cores / 2)
    }
}

// Transfers `items` values; the consumer's wall-clock time is the sample.
fn run_pair<Q: BenchSpscQueue<u64>>(queue: &Q, items: u64, batch: usize) -> Duration {
    let (prod_core, cons_core) = core_pair();
    let barrier = Barrier::new(2);
    let mut elapsed = Duration::ZERO;

    std::thread::scope(|s| {
        s.spawn(|| {
            pin_current(prod_core);
            barrier.wait();
            for i in 0..items {
                while queue.bench_push(i).is_err() {
                    std::hint::spin_loop();
                }
            }
        });

        let consumer = s.spawn(|| {
            pin_current(cons_core);
            let mut out = Vec::with_capacity(batch);
            barrier.wait();
            let start = Instant::now();
            let mut received = 0u64;
            while received < items {
                if batch <= 1 {
                    if queue.bench_pop().is_ok() {
                        received += 1;
                    } else {
                        std::hint::spin_loop();
                    }
                } else {
                    out.clear();
                    let taken = queue.bench_pop_batch(&mut out, batch);
                    if taken == 0 {
                        std::hint::spin_loop();
                    }
                    received += taken as u64;
                }
            }
            start.elapsed()
        });

        elapsed = consumer.join().unwrap();
    });

    elapsed
}

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.sample_size(10);

    group.bench_function("flag/scalar", |b| {
        b.iter_custom(|iters| {
            let queue = FlagQueue::with_capacity(RING_CAP);
            run_pair(&queue, iters, 1)
        })
    });
    group.bench_function("flag/batch", |b| {
        b.iter_custom(|iters| {
            let queue = FlagQueue::with_capacity(RING_CAP);
            run_pair(&queue, iters, BATCH)
        })
    });

    group.bench_function("index/scalar", |b| {
        b.iter_custom(|iters| {
            let queue = IndexQueue::with_capacity(RING_CAP);
            run_pair(&queue, iters, 1)
        })
    });
    group.bench_function("index/batch", |b| {
        b.iter_custom(|iters| {
            let queue = IndexQueue::with_capacity(RING_CAP);
            run_pair(&queue, iters, BATCH)
        })
    });

    group.bench_function("unsync/scalar", |b| {
        let mut queue = UnsyncQueue::with_capacity(RING_CAP);
        b.iter(|| {
            queue.push(black_box(1u64));
            black_box(queue.pop().unwrap());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_spsc);
criterion_main!(benches);
