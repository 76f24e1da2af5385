// Work dispatch over a single ticket queue: four producers push tagged
// jobs, the consumer drains them in batches and reports per-producer counts.

use rings::{MpscQueue, TicketQueue};

const PRODUCERS: u64 = 4;
const JOBS_PER_PRODUCER: u64 = 250_000;

fn main() {
    let queue = TicketQueue::with_capacity(512);

    std::thread::scope(|s| {
        for id in 0..PRODUCERS {
            let queue = &queue;
            s.spawn(move || {
                for seq in 0..JOBS_PER_PRODUCER {
                    queue.push((id << 32) | seq);
                }
            });
        }

        let total = PRODUCERS * JOBS_PER_PRODUCER;
        let mut per_producer = [0u64; PRODUCERS as usize];
        let mut received = 0u64;
        let mut out = Vec::with_capacity(128);
        while received < total {
            out.clear();
            let taken = queue.pop_batch(&mut out, 128);
            if taken == 0 {
                std::thread::yield_now();
                continue;
            }
            for job in &out {
                per_producer[(job >> 32) as usize] += 1;
            }
            received += taken as u64;
        }

        for (id, count) in per_producer.iter().enumerate() {
            println!("producer {id}: {count} jobs");
        }
    });
}
