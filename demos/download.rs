//! A fake byte-denominated download: oscillating transfer speed, lines
//! printed above the bar mid-flight, completion summary at the end.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use pacebar::{Bar, BarOptions, Tracker, format_bytes, format_duration};

fn main() {
    let tracker = Arc::new(Tracker::new().byte_amount(542 * 1024 * 1024));
    let bar = Bar::new(
        tracker.clone(),
        std::io::stderr(),
        BarOptions::default().show_speed(true).show_time_left(true),
    );
    bar.set_postfix("fake download");

    let mut rounds = 0;
    let mut ramping_up = true;
    let mut speed = 0.002;
    let mut progress = 0.0;
    let mut announced_ten = false;
    let mut announced_ninety = false;

    loop {
        rounds += 1;
        if rounds > 40 {
            ramping_up = !ramping_up;
            rounds = 0;
        }
        if ramping_up {
            speed *= 1.07;
        } else {
            speed /= 1.07;
        }

        progress += speed;
        if progress > 1.0 {
            tracker.set_progress(1.0);
            break;
        }
        tracker.set_progress(progress);

        if !announced_ten && progress >= 0.1 {
            bar.println(format!("{}", "already 10% done!".green()));
            announced_ten = true;
        }
        if !announced_ninety && progress >= 0.9 {
            bar.println(format!("{}", "almost there!".yellow()));
            announced_ninety = true;
        }

        std::thread::sleep(Duration::from_millis(50));
    }

    let stats = tracker.finish();
    eprintln!(
        "fake-downloaded {} in {}, {}",
        format_bytes(stats.byte_amount().unwrap_or(0)),
        format_duration(stats.duration()),
        stats,
    );
}
