// Two pipeline stages joined by SPSC rings: a generator feeds raw numbers
// through a FlagQueue to a transform stage, which feeds results through an
// IndexQueue back to the main thread.

use rings::{FlagQueue, IndexQueue, SpscQueue};

const ITEMS: u64 = 1_000_000;

fn main() {
    let raw = FlagQueue::with_capacity(1024);
    let transformed = IndexQueue::with_capacity(1024);

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..ITEMS {
                while raw.push(i).is_err() {
                    std::hint::spin_loop();
                }
            }
        });

        s.spawn(|| {
            let mut forwarded = 0u64;
            while forwarded < ITEMS {
                match raw.pop() {
                    Ok(v) => {
                        let mut item = v.wrapping_mul(v);
                        loop {
                            match transformed.push(item) {
                                Ok(()) => break,
                                Err(e) => {
                                    item = e.0;
                                    std::hint::spin_loop();
                                }
                            }
                        }
                        forwarded += 1;
                    }
                    Err(_) => std::hint::spin_loop(),
                }
            }
        });

        let mut sum = 0u64;
        let mut received = 0u64;
        let mut out = Vec::with_capacity(64);
        while received < ITEMS {
            out.clear();
            let taken = transformed.pop_batch(&mut out, 64);
            if taken == 0 {
                std::thread::yield_now();
                continue;
            }
            for v in &out {
                sum = sum.wrapping_add(*v);
            }
            received += taken as u64;
        }

        println!("transferred {ITEMS} items, checksum {sum:#x}");
    });
}
