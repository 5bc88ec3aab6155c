use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::average::Average;
use crate::format::{format_bps, format_bytes, format_duration};

const DEFAULT_MEASUREMENT_INTERVAL: Duration = Duration::from_secs(1);

type FinishObserver = Box<dyn FnOnce() + Send>;

/// Tracks the progress of a task and estimates its speed and time left.
///
/// Feed it values in `0.0..=1.0` with [`set_progress`](Tracker::set_progress)
/// from any thread; read [`stats`](Tracker::stats) from any other. Samples
/// arriving closer together than the measurement interval update the value
/// but are ignored for rate purposes, so a chatty producer doesn't drown
/// the estimate in noise. A value lower than the previous one re-anchors
/// the measurement instead of producing a negative rate.
///
/// ```rust,ignore
/// let tracker = Arc::new(Tracker::new().byte_amount(1 << 30));
/// tracker.set_progress(0.25);
/// if let Some(stats) = tracker.stats() {
///     eprintln!("{stats}");
/// }
/// let totals = tracker.finish();
/// ```
pub struct Tracker {
    byte_amount: Option<u64>,
    measurement_interval: Duration,
    state: Mutex<State>,
}

struct State {
    value: f64,
    paused: bool,
    finished: bool,
    duration: Duration,
    speed: f64,
    min_speed: f64,
    max_speed: f64,
    speed_average: Average,
    seconds_left_average: Average,
    last_measurement: Option<Measurement>,
    observers: Vec<FinishObserver>,
}

/// The last accepted progress sample, anchor for the next rate computation.
#[derive(Debug, Clone, Copy)]
struct Measurement {
    at: Instant,
    value: f64,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    /// Creates a tracker at progress `0.0` with a 1 second measurement
    /// interval.
    pub fn new() -> Self {
        Self {
            byte_amount: None,
            measurement_interval: DEFAULT_MEASUREMENT_INTERVAL,
            state: Mutex::new(State {
                value: 0.0,
                paused: false,
                finished: false,
                duration: Duration::ZERO,
                speed: 0.0,
                min_speed: f64::MAX,
                max_speed: 0.0,
                speed_average: Average::new(),
                seconds_left_average: Average::new(),
                last_measurement: None,
                observers: Vec::new(),
            }),
        }
    }

    /// Declares the total size in bytes of the tracked task. Purely
    /// descriptive: it selects byte units downstream, it does not enter
    /// the estimation math.
    pub fn byte_amount(mut self, bytes: u64) -> Self {
        self.byte_amount = Some(bytes);
        self
    }

    /// Sets the initial progress value, clamped to `0.0..=1.0`.
    pub fn starting_value(mut self, value: f64) -> Self {
        self.state.get_mut().unwrap().value = clamp(value);
        self
    }

    /// Sets the minimum spacing between two samples counted toward rate
    /// computation. Defaults to 1 second.
    pub fn measurement_interval(mut self, interval: Duration) -> Self {
        self.measurement_interval = interval;
        self
    }

    /// Records a progress sample, clamped to `0.0..=1.0`.
    ///
    /// Setting a value lower than the current one resets speed and time
    /// left. Ignored once [`finish`](Tracker::finish) has run.
    pub fn set_progress(&self, value: f64) {
        self.set_progress_at(value, Instant::now());
    }

    pub(crate) fn set_progress_at(&self, value: f64, now: Instant) {
        let value = clamp(value);

        let mut state = self.state.lock().unwrap();
        if state.finished {
            return;
        }
        self.update_measurement(&mut state, value, now);
        state.value = value;
    }

    fn update_measurement(&self, state: &mut State, value: f64, now: Instant) {
        if state.paused {
            state.reset_measurement();
        }

        let Some(last) = state.last_measurement else {
            state.last_measurement = Some(Measurement { at: now, value });
            return;
        };

        let since_last = now.duration_since(last.at);
        if since_last < self.measurement_interval {
            // Too soon to count toward the rate; the value still updates.
            return;
        }

        let delta = value - last.value;
        if delta < 0.0 {
            // The task went backwards. Discard the estimate and take this
            // sample as a fresh anchor, no rate emitted.
            state.reset_measurement();
            state.last_measurement = Some(Measurement { at: now, value });
            return;
        }

        state.duration += since_last;

        state.speed = delta / since_last.as_secs_f64();
        state.speed_average.add(state.speed);
        if state.speed > state.max_speed {
            state.max_speed = state.speed;
        }
        if state.speed < state.min_speed {
            state.min_speed = state.speed;
        }

        let seconds_left = (1.0 - value) / state.speed_average.value();
        state.seconds_left_average.add(seconds_left);

        state.last_measurement = Some(Measurement { at: now, value });
    }

    /// Temporarily stops progress tracking, discarding the current speed
    /// and time-left estimates.
    ///
    /// A rate computed across a pause would be meaningless, so the whole
    /// measurement is dropped rather than adjusted, including the
    /// partially elapsed interval.
    pub fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if state.finished {
            return;
        }
        state.paused = true;
        state.reset_measurement();
    }

    /// Restarts progress tracking after [`pause`](Tracker::pause). The
    /// next sample re-anchors cleanly; no rate spans the pause boundary.
    pub fn resume(&self) {
        let mut state = self.state.lock().unwrap();
        if state.finished {
            return;
        }
        state.paused = false;
        state.reset_measurement();
    }

    /// Returns `true` while the tracker is paused.
    pub fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    /// Current progress value in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        self.state.lock().unwrap().value
    }

    /// Time spent tracking progress, excluding pauses. Advances only in
    /// whole accepted-interval increments.
    pub fn duration(&self) -> Duration {
        self.state.lock().unwrap().duration
    }

    /// The total size in bytes of the tracked task, if one was declared.
    pub fn total_bytes(&self) -> Option<u64> {
        self.byte_amount
    }

    /// Speed and time left, if enough data has been fed since the last
    /// reset.
    ///
    /// `None` means "not enough data yet" (one accepted interval is the
    /// minimum), never an error.
    pub fn stats(&self) -> Option<Stats> {
        let state = self.state.lock().unwrap();

        if state.speed == 0.0 || state.last_measurement.is_none() {
            return None;
        }

        let seconds_left = (1.0 - state.value) / state.speed_average.value();
        let time_left = (seconds_left >= 0.0).then(|| Duration::from_secs_f64(seconds_left));

        Some(Stats {
            value: state.value,
            speed: state.speed_average.value(),
            time_left,
            byte_amount: self.byte_amount,
        })
    }

    /// Registers a callback invoked by [`finish`](Tracker::finish), in
    /// registration order. Callbacks registered after the tracker has
    /// finished never fire.
    pub fn on_finish(&self, callback: impl FnOnce() + Send + 'static) {
        let mut state = self.state.lock().unwrap();
        if state.finished {
            return;
        }
        state.observers.push(Box::new(callback));
    }

    /// Ends tracking and reports completion statistics.
    ///
    /// Finish observers run first, outside the lock, so they may call
    /// back into the tracker. The open anchor interval is then flushed
    /// into the total duration and the tracker becomes read-only.
    ///
    /// Idempotent: a second call invokes no observers and accumulates no
    /// further duration, it only reports the same totals again.
    pub fn finish(&self) -> CompletionStats {
        let observers = {
            let mut state = self.state.lock().unwrap();
            std::mem::take(&mut state.observers)
        };
        for observer in observers {
            observer();
        }

        let mut state = self.state.lock().unwrap();
        if !state.finished {
            state.finished = true;
            if let Some(last) = state.last_measurement.take() {
                state.duration += last.at.elapsed();
            }
        }

        CompletionStats {
            duration: state.duration,
            average_speed: 1.0 / state.duration.as_secs_f64(),
            min_speed: state.min_speed,
            max_speed: state.max_speed,
            byte_amount: self.byte_amount,
        }
    }
}

impl State {
    fn reset_measurement(&mut self) {
        self.last_measurement = None;
        self.speed = 0.0;
        self.min_speed = f64::MAX;
        self.max_speed = 0.0;
        self.speed_average.reset();
        self.seconds_left_average.reset();
    }
}

fn clamp(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// A point-in-time snapshot of a tracker's estimates.
///
/// Obtained from [`Tracker::stats`]; immutable.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    value: f64,
    speed: f64,
    time_left: Option<Duration>,
    byte_amount: Option<u64>,
}

impl Stats {
    /// Progress value at snapshot time, in `0.0..=1.0`.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Smoothed speed in progress-units per second. This is the moving
    /// average, not the raw last-interval rate.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Estimated time to completion at the current smoothed speed.
    pub fn time_left(&self) -> Option<Duration> {
        self.time_left
    }

    /// Bandwidth in bytes per second, if the task is byte-denominated.
    pub fn bps(&self) -> Option<f64> {
        self.byte_amount.map(|bytes| self.speed * bytes as f64)
    }

    /// The task's total size in bytes, if one was declared.
    pub fn byte_amount(&self) -> Option<u64> {
        self.byte_amount
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}% done @ {:.2}/sec, ", self.value * 100.0, self.speed)?;
        match self.time_left {
            Some(left) => write!(f, "{} left)", format_duration(left)),
            None => write!(f, "unknown time left)"),
        }
    }
}

/// Statistics on the duration and speed of a finished task.
#[derive(Debug, Clone, Copy)]
pub struct CompletionStats {
    duration: Duration,
    average_speed: f64,
    min_speed: f64,
    max_speed: f64,
    byte_amount: Option<u64>,
}

impl CompletionStats {
    /// How long the task was tracked for, excluding pauses.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whole-job throughput: one full unit of progress divided by the
    /// tracked duration.
    ///
    /// Deliberately not the smoothed average [`Stats::speed`] reports:
    /// this is overall throughput, that is a recency-weighted estimate.
    /// Undefined (infinite) when the tracked duration is zero; don't
    /// finish a tracker before any time has passed.
    pub fn average_speed(&self) -> f64 {
        self.average_speed
    }

    /// The lowest instantaneous speed recorded since the last reset.
    pub fn min_speed(&self) -> f64 {
        self.min_speed
    }

    /// The highest instantaneous speed recorded since the last reset.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// The task's total size in bytes, if one was declared.
    pub fn byte_amount(&self) -> Option<u64> {
        self.byte_amount
    }

    /// Average bandwidth in bytes per second, if the task is
    /// byte-denominated.
    pub fn average_bps(&self) -> Option<f64> {
        self.byte_amount.map(|bytes| self.average_speed * bytes as f64)
    }
}

impl std::fmt::Display for CompletionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} total, avg {:.2}/sec, min {:.2}/sec, max {:.2}/sec",
            format_duration(self.duration),
            self.average_speed,
            self.min_speed,
            self.max_speed,
        )?;
        match self.average_bps() {
            Some(bps) => write!(f, ", {} of {})", format_bps(bps), format_bytes(self.byte_amount.unwrap_or(0))),
            None => write!(f, ")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Relative-error assertion, |expected - actual| / expected <= epsilon.
    fn assert_in_epsilon(expected: f64, actual: f64, epsilon: f64) {
        let relative = ((expected - actual) / expected).abs();
        assert!(
            relative <= epsilon,
            "expected {actual} within {epsilon} of {expected} (off by {relative:.3})"
        );
    }

    fn millisecond_tracker() -> Tracker {
        Tracker::new().measurement_interval(Duration::from_millis(1))
    }

    #[test]
    fn clamps_out_of_range_values() {
        let tracker = Tracker::new();
        tracker.set_progress(-0.5);
        assert_eq!(tracker.progress(), 0.0);
        tracker.set_progress(1.7);
        assert_eq!(tracker.progress(), 1.0);
    }

    #[test]
    fn starting_value_is_clamped_and_reported() {
        let tracker = Tracker::new().starting_value(0.25);
        assert_eq!(tracker.progress(), 0.25);
        assert_eq!(Tracker::new().starting_value(3.0).progress(), 1.0);
    }

    #[test]
    fn byte_denominated_trackers_report_bandwidth() {
        let tracker = Tracker::new()
            .byte_amount(1 << 20)
            .measurement_interval(Duration::from_millis(1));
        let start = Instant::now();

        tracker.set_progress_at(0.2, start + Duration::from_millis(10));
        tracker.set_progress_at(0.4, start + Duration::from_millis(20));

        let stats = tracker.stats().unwrap();
        assert_eq!(stats.byte_amount(), Some(1 << 20));
        // 0.2 progress per 10 ms of a 1 MiB task.
        assert_in_epsilon(20.0 * (1 << 20) as f64, stats.bps().unwrap(), 0.01);

        let done = tracker.finish();
        assert_eq!(done.byte_amount(), Some(1 << 20));
        assert!(done.average_bps().is_some());
    }

    #[test]
    fn display_strings() {
        let tracker = millisecond_tracker();
        let start = Instant::now();
        tracker.set_progress_at(0.2, start + Duration::from_millis(10));
        tracker.set_progress_at(0.4, start + Duration::from_millis(20));

        let stats = tracker.stats().unwrap();
        assert!(stats.to_string().contains("% done @"), "{stats}");

        let done = tracker.finish();
        assert!(done.to_string().contains("total, avg"), "{done}");
    }

    #[test]
    fn stats_unavailable_before_first_interval() {
        let tracker = millisecond_tracker();
        assert!(tracker.stats().is_none());
        tracker.set_progress(0.1);
        // One sample anchors the measurement but yields no rate yet.
        assert!(tracker.stats().is_none());
    }

    #[test]
    fn constant_rate_eta_strictly_decreases() {
        let tracker = millisecond_tracker();
        let start = Instant::now();

        let mut last: Option<Stats> = None;
        for k in 1..=10u64 {
            tracker.set_progress_at(k as f64 * 0.1, start + Duration::from_millis(10 * k));
            let stats = tracker.stats();
            if let (Some(prev), Some(cur)) = (&last, &stats) {
                assert!(cur.time_left().unwrap() < prev.time_left().unwrap());
                assert_in_epsilon(prev.speed(), cur.speed(), 0.2);
            }
            last = stats;
        }

        let final_stats = last.unwrap();
        assert_in_epsilon(10.0, final_stats.speed(), 0.05);
        assert_eq!(final_stats.time_left(), Some(Duration::ZERO));
    }

    #[test]
    fn ramp_up_speed_never_decreases() {
        let tracker = millisecond_tracker();
        let start = Instant::now();

        let mut speed = 0.01;
        let mut progress = 0.0;
        let mut elapsed = Duration::ZERO;
        let mut last: Option<Stats> = None;

        loop {
            elapsed += Duration::from_millis(10);
            speed *= 1.05;
            progress += speed;
            if progress > 1.0 {
                break;
            }
            tracker.set_progress_at(progress, start + elapsed);

            let stats = tracker.stats();
            if let (Some(prev), Some(cur)) = (&last, &stats) {
                assert!(cur.speed() >= prev.speed());
                assert!(cur.time_left().unwrap() < prev.time_left().unwrap());
            }
            last = stats;
        }
    }

    #[test]
    fn ramp_down_speed_never_increases() {
        let tracker = millisecond_tracker();
        let start = Instant::now();

        let mut speed = 0.1;
        let mut progress = 0.0;
        let mut elapsed = Duration::ZERO;
        let mut last: Option<Stats> = None;

        loop {
            elapsed += Duration::from_millis(10);
            speed *= 0.93;
            progress += speed;
            if progress > 1.0 {
                break;
            }
            tracker.set_progress_at(progress, start + elapsed);

            let stats = tracker.stats();
            if let (Some(prev), Some(cur)) = (&last, &stats) {
                assert!(cur.speed() <= prev.speed());
                assert!(cur.time_left().unwrap() < prev.time_left().unwrap());
            }
            last = stats;
        }
    }

    #[test]
    fn alternating_speeds_pin_the_extrema() {
        let tracker = millisecond_tracker();
        let start = Instant::now();

        let mut fast = true;
        let mut iters = 0;
        let mut progress = 0.0;
        let mut elapsed = Duration::ZERO;

        loop {
            elapsed += Duration::from_millis(10);
            iters += 1;
            if iters > 10 {
                fast = !fast;
            }
            progress += if fast { 0.01 } else { 0.001 };
            if progress > 1.0 {
                tracker.set_progress_at(1.0, start + elapsed);
                break;
            }
            tracker.set_progress_at(progress, start + elapsed);
        }

        let stats = tracker.finish();
        assert_in_epsilon(1.0, stats.max_speed(), 0.2);
        assert_in_epsilon(0.1, stats.min_speed(), 0.2);
        assert_in_epsilon(0.5, stats.average_speed(), 0.3);
    }

    #[test]
    fn regression_resets_the_estimate() {
        let tracker = millisecond_tracker();
        let start = Instant::now();

        tracker.set_progress_at(0.2, start + Duration::from_millis(10));
        tracker.set_progress_at(0.6, start + Duration::from_millis(20));
        assert!(tracker.stats().is_some());

        tracker.set_progress_at(0.3, start + Duration::from_millis(30));
        assert!(tracker.stats().is_none());
        assert_eq!(tracker.progress(), 0.3);

        // The regressed sample anchors the next rate computation.
        tracker.set_progress_at(0.4, start + Duration::from_millis(40));
        let stats = tracker.stats().unwrap();
        assert_in_epsilon(10.0, stats.speed(), 0.05);
    }

    #[test]
    fn regression_does_not_advance_duration() {
        let tracker = millisecond_tracker();
        let start = Instant::now();

        tracker.set_progress_at(0.2, start + Duration::from_millis(10));
        tracker.set_progress_at(0.6, start + Duration::from_millis(20));
        assert_eq!(tracker.duration(), Duration::from_millis(10));

        tracker.set_progress_at(0.3, start + Duration::from_millis(30));
        assert_eq!(tracker.duration(), Duration::from_millis(10));
    }

    #[test]
    fn throttles_samples_within_the_interval() {
        let tracker = Tracker::new(); // 1 second interval
        let start = Instant::now();

        tracker.set_progress_at(0.1, start);
        tracker.set_progress_at(0.5, start + Duration::from_millis(100));

        // The value is accepted, the measurement is not.
        assert_eq!(tracker.progress(), 0.5);
        assert!(tracker.stats().is_none());
        assert_eq!(tracker.duration(), Duration::ZERO);
    }

    #[test]
    fn pause_and_resume_discard_the_estimate() {
        let tracker = millisecond_tracker();
        let start = Instant::now();

        tracker.set_progress_at(0.2, start + Duration::from_millis(10));
        tracker.set_progress_at(0.4, start + Duration::from_millis(20));
        assert!(tracker.stats().is_some());
        let frozen = tracker.duration();

        tracker.pause();
        assert!(tracker.paused());
        assert!(tracker.stats().is_none());
        assert_eq!(tracker.duration(), frozen);

        // Samples while paused never produce a rate.
        tracker.set_progress_at(0.5, start + Duration::from_millis(40));
        tracker.set_progress_at(0.6, start + Duration::from_millis(60));
        assert!(tracker.stats().is_none());
        assert_eq!(tracker.duration(), frozen);

        tracker.resume();
        assert!(!tracker.paused());

        // One interval after resume and the estimate is back.
        tracker.set_progress_at(0.6, start + Duration::from_millis(70));
        assert!(tracker.stats().is_none());
        tracker.set_progress_at(0.7, start + Duration::from_millis(80));
        assert!(tracker.stats().is_some());
    }

    #[test]
    fn finish_is_idempotent_and_ordered() {
        let tracker = millisecond_tracker();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for id in [1, 2] {
            let calls = calls.clone();
            tracker.on_finish(move || calls.lock().unwrap().push(id));
        }

        let start = Instant::now();
        tracker.set_progress_at(0.5, start + Duration::from_millis(10));
        tracker.set_progress_at(1.0, start + Duration::from_millis(20));

        let first = tracker.finish();
        let second = tracker.finish();

        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
        assert_eq!(first.duration(), second.duration());

        // Late registrations never fire.
        let calls_after = calls.clone();
        tracker.on_finish(move || calls_after.lock().unwrap().push(3));
        tracker.finish();
        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn finish_observers_may_reenter_the_tracker() {
        let tracker = Arc::new(millisecond_tracker());
        let seen = Arc::new(Mutex::new(None));

        let inner = tracker.clone();
        let seen_inner = seen.clone();
        tracker.on_finish(move || {
            *seen_inner.lock().unwrap() = Some(inner.progress());
        });

        tracker.set_progress(0.75);
        tracker.finish();
        assert_eq!(*seen.lock().unwrap(), Some(0.75));
    }

    #[test]
    fn read_only_after_finish() {
        let tracker = millisecond_tracker();
        let start = Instant::now();
        tracker.set_progress_at(0.5, start + Duration::from_millis(10));
        tracker.set_progress_at(1.0, start + Duration::from_millis(20));
        tracker.finish();

        let duration = tracker.duration();
        tracker.set_progress(0.1);
        tracker.pause();
        assert_eq!(tracker.progress(), 1.0);
        assert!(!tracker.paused());
        assert_eq!(tracker.duration(), duration);
    }

    #[test]
    fn constant_rate_end_to_end() {
        let tracker = millisecond_tracker();

        for k in 0..=10 {
            std::thread::sleep(Duration::from_millis(10));
            tracker.set_progress(k as f64 * 0.1);
        }

        let stats = tracker.finish();
        assert_in_epsilon(0.1, stats.duration().as_secs_f64(), 0.15);
        assert_in_epsilon(stats.average_speed(), stats.min_speed(), 0.15);
        assert_in_epsilon(stats.average_speed(), stats.max_speed(), 0.15);
        assert_in_epsilon(10.0, stats.average_speed(), 0.15);
    }
}
