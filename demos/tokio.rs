//! Several async workers feeding one shared tracker. The tracker is the
//! synchronization point (workers just set the combined fraction) and
//! the bar follows from its own thread, untouched by the runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pacebar::{Bar, BarOptions, Tracker, format_duration};

const WORKERS: u64 = 4;
const CHUNKS_PER_WORKER: u64 = 25;

#[tokio::main]
async fn main() {
    let tracker = Arc::new(Tracker::new().measurement_interval(Duration::from_millis(100)));
    let bar = Bar::new(
        tracker.clone(),
        std::io::stderr(),
        BarOptions::default()
            .refresh_rate(Duration::from_millis(50))
            .show_time_left(true),
    );
    bar.set_prefix("syncing");

    let done = Arc::new(AtomicU64::new(0));
    let total = WORKERS * CHUNKS_PER_WORKER;

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let tracker = tracker.clone();
        let bar = bar.clone();
        let done = done.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..CHUNKS_PER_WORKER {
                // Each worker runs at its own pace.
                tokio::time::sleep(Duration::from_millis(20 + worker * 7)).await;
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                tracker.set_progress(finished as f64 / total as f64);
            }
            bar.println(format!("worker {worker} drained"));
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let stats = tracker.finish();
    eprintln!("synced {total} chunks in {}", format_duration(stats.duration()));
}
