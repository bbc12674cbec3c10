//! Basic work queue and dispatcher usage.
//!
//! Run with `cargo run --example basic`.

use offload::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn count() -> u32 {
    COUNTER.fetch_add(1, Ordering::SeqCst) + 1
}

fn text(seconds: u32) -> String {
    format!("Sleeping for {} sec", seconds)
}

struct Work;

impl Work {
    fn text(self, seconds: u32) -> String {
        text(seconds)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Work queue ===\n");
    {
        let queue = WorkQueue::new()?;

        let seconds = queue.assign(count, ()).get()?;
        println!("{}", queue.assign(text, (seconds,)).get()?);

        let seconds = queue.assign(|| count(), ()).get()?;
        println!("{}", queue.assign(Work::text, (Work, seconds)).get()?);

        let failed = queue.assign(|| -> u32 { panic!("out of luck") }, ()).get();
        println!("panicking task -> {:?}", failed);

        println!("stats: {:?}", queue.stats());
    }

    println!("\n=== Dispatcher ===\n");
    {
        let start = Instant::now();
        let dispatcher = Dispatcher::new();
        for _ in 0..4 {
            dispatcher.dispatch(thread::sleep, (Duration::from_millis(50),))?;
        }
        println!("in flight after dispatch: {}", dispatcher.in_flight());
        drop(dispatcher);
        println!("4 x 50ms finished in {:?}", start.elapsed());
    }

    println!("\nis_any_equal!(7; 8, 9, 7) -> {}", is_any_equal!(7; 8, 9, 7));

    Ok(())
}
