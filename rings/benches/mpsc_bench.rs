// Multi-producer throughput for the ticket queue: 1, 2 and 4 producers
// against the single consumer, scalar and batch drain.

use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Barrier;
use std::time::{Duration, Instant};

use rings::{MpscQueue, TicketQueue};

const RING_CAP: usize = 1024;
const BATCH: usize = 64;

fn run_producers(
    queue: &TicketQueue<u64>,
    producers: usize,
    items: u64,
    batch: usize,
) -> Duration {
    let per_producer = items / producers as u64 + 1;
    let total = per_producer * producers as u64;
    let barrier = Barrier::new(producers + 1);
    let mut elapsed = Duration::ZERO;

    std::thread::scope(|s| {
        for id in 0..producers {
            let queue = &queue;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                for seq in 0..per_producer {
                    queue.push(((id as u64) << 32) | seq);
                }
            });
        }

        let consumer = s.spawn(|| {
            let mut out = Vec::with_capacity(batch);
            barrier.wait();
            let start = Instant::now();
            let mut received = 0u64;
            while received < total {
                if batch <= 1 {
                    if queue.pop().is_ok() {
                        received += 1;
                    } else {
                        std::hint::spin_loop();
                    }
                } else {
                    out.clear();
                    let taken = queue.pop_batch(&mut out, batch);
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

fn bench_mpsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc");
    group.sample_size(10);

    for producers in [1usize, 2, 4] {
        group.bench_function(format!("ticket/p{producers}/scalar"), |b| {
            b.iter_custom(|iters| {
                let queue = TicketQueue::with_capacity(RING_CAP);
                run_producers(&queue, producers, iters, 1)
            })
        });
        group.bench_function(format!("ticket/p{producers}/batch"), |b| {
            b.iter_custom(|iters| {
                let queue = TicketQueue::with_capacity(RING_CAP);
                run_producers(&queue, producers, iters, BATCH)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mpsc);
criterion_main!(benches);
