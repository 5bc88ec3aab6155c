//! The consumer boundary: a producer that only knows `&dyn Consumer`,
//! wired first to the tracing ecosystem, then to a tracker + bar pair.

use std::sync::Arc;
use std::time::Duration;

use pacebar::{Bar, BarOptions, Consumer, Level, Tracker, TracingConsumer};

/// Drives a fake archive extraction, reporting only through the consumer.
fn extract(consumer: &dyn Consumer) {
    consumer.progress_label("fixtures.tar");
    for entry in 1..=20u32 {
        std::thread::sleep(Duration::from_millis(60));
        consumer.progress(f64::from(entry) / 20.0);
        if entry == 10 {
            consumer.info("10 entries extracted");
        }
    }
    consumer.message(Level::Info, "extraction complete");
}

/// Routes consumer notifications into a tracker + bar pair: fractions to
/// the tracker, labels to the prefix, messages above the bar.
struct BarConsumer {
    tracker: Arc<Tracker>,
    bar: Bar,
}

impl Consumer for BarConsumer {
    fn progress(&self, alpha: f64) {
        self.tracker.set_progress(alpha);
    }

    fn pause_progress(&self) {
        self.tracker.pause();
    }

    fn resume_progress(&self) {
        self.tracker.resume();
    }

    fn progress_label(&self, label: &str) {
        self.bar.set_prefix(label);
    }

    fn message(&self, level: Level, message: &str) {
        self.bar.println(format!("[{level}] {message}"));
    }
}

fn main() {
    tracing_subscriber::fmt().init();

    eprintln!("-- through TracingConsumer (set RUST_LOG=trace for fractions)");
    extract(&TracingConsumer);

    eprintln!("-- through a tracker + bar");
    let tracker = Arc::new(Tracker::new().measurement_interval(Duration::from_millis(100)));
    let bar = Bar::new(
        tracker.clone(),
        std::io::stderr(),
        BarOptions::default().refresh_rate(Duration::from_millis(50)),
    );
    extract(&BarConsumer {
        tracker: tracker.clone(),
        bar,
    });
    let stats = tracker.finish();
    eprintln!("{stats}");
}
