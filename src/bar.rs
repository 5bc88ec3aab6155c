use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::format::{Units, format_bps, format_duration};
use crate::theme::Theme;
use crate::tracker::Tracker;

/// Display configuration for a [`Bar`], with builder-style setters.
///
/// ```rust,ignore
/// let opts = BarOptions::default()
///     .refresh_rate(Duration::from_millis(100))
///     .show_speed(true)
///     .show_time_left(true)
///     .theme(Theme::ASCII);
/// ```
#[derive(Debug, Clone)]
pub struct BarOptions {
    refresh_rate: Duration,
    bar_width: usize,
    speed_box_width: usize,
    time_box_width: usize,
    width: usize,
    show_speed: bool,
    show_time_left: bool,
    theme: Theme,
}

impl Default for BarOptions {
    /// 200 ms refresh, a 20-column bar in an 80-column line, 13-column
    /// speed and time boxes (both hidden), environment-detected theme.
    fn default() -> Self {
        Self {
            refresh_rate: Duration::from_millis(200),
            bar_width: 20,
            speed_box_width: 13,
            time_box_width: 13,
            width: 80,
            show_speed: false,
            show_time_left: false,
            theme: Theme::detect(),
        }
    }
}

impl BarOptions {
    /// How often the bar repaints.
    pub fn refresh_rate(mut self, rate: Duration) -> Self {
        self.refresh_rate = rate;
        self
    }

    /// Maximum width of the bar glyph itself.
    pub fn bar_width(mut self, columns: usize) -> Self {
        self.bar_width = columns;
        self
    }

    /// Width reserved for the bandwidth field.
    pub fn speed_box_width(mut self, columns: usize) -> Self {
        self.speed_box_width = columns;
        self
    }

    /// Width reserved for the time-left field.
    pub fn time_box_width(mut self, columns: usize) -> Self {
        self.time_box_width = columns;
        self
    }

    /// Total width of the redrawn line.
    pub fn width(mut self, columns: usize) -> Self {
        self.width = columns;
        self
    }

    /// Shows a bandwidth field. Only rendered for byte-denominated
    /// trackers.
    pub fn show_speed(mut self, show: bool) -> Self {
        self.show_speed = show;
        self
    }

    /// Shows a time-left field when the tracker has an estimate.
    pub fn show_time_left(mut self, show: bool) -> Self {
        self.show_time_left = show;
        self
    }

    /// Glyph palette to draw with. Defaults to [`Theme::detect`].
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

/// A live terminal progress bar following a [`Tracker`].
///
/// Construction registers the bar as a finish observer on the tracker and
/// starts a background thread that repaints one fixed-width line on every
/// refresh tick. Lines queued with [`println`](Bar::println) are flushed
/// above the bar on the next tick, so callers can log without corrupting
/// the in-place line. When the tracker finishes, the bar clears its line
/// exactly once and the thread stops; nothing is written afterwards.
///
/// The bar shares the tracker, it does not own it; the tracker may
/// outlive the bar handle.
///
/// ```rust,ignore
/// let tracker = Arc::new(Tracker::new());
/// let bar = Bar::new(tracker.clone(), std::io::stderr(), BarOptions::default());
/// bar.set_prefix("fetching");
/// tracker.set_progress(0.4);
/// bar.println("a log line that lands above the bar");
/// tracker.finish();
/// ```
///
/// `Bar` is a cheap handle; clones share the same display state.
#[derive(Clone)]
pub struct Bar {
    inner: Arc<BarInner>,
}

struct BarInner {
    tracker: Arc<Tracker>,
    opts: BarOptions,
    units: Units,
    display: Mutex<Display>,
}

/// Mutable display state behind its own lock, distinct from the
/// tracker's, which the renderer only reads snapshots from.
struct Display {
    prefix: String,
    postfix: String,
    scale: f64,
    lines: Vec<String>,
    finished: bool,
    target: Box<dyn Write + Send>,
}

impl Bar {
    /// Creates a bar over `tracker` writing to `target`, and starts its
    /// redraw loop. The first frame is painted immediately.
    pub fn new(
        tracker: Arc<Tracker>, target: impl Write + Send + 'static, opts: BarOptions,
    ) -> Bar {
        let bar = Self::build(tracker, target, opts);

        let (finish_tx, finish_rx) = mpsc::channel::<()>();
        bar.inner.tracker.on_finish(move || {
            let _ = finish_tx.send(());
        });

        let inner = bar.inner.clone();
        std::thread::spawn(move || {
            let _ = inner.redraw();
            loop {
                match finish_rx.recv_timeout(inner.opts.refresh_rate) {
                    Err(RecvTimeoutError::Timeout) => {
                        // A dropped frame beats a dead render thread.
                        let _ = inner.redraw();
                    }
                    // Finish signal, or the tracker is gone along with
                    // the sender it held.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        bar
    }

    /// Everything except the redraw thread: shared state plus the
    /// clear-on-finish observer.
    fn build(tracker: Arc<Tracker>, target: impl Write + Send + 'static, opts: BarOptions) -> Bar {
        let units = match tracker.total_bytes() {
            Some(_) => Units::Bytes,
            None => Units::None,
        };

        let inner = Arc::new(BarInner {
            tracker: tracker.clone(),
            opts,
            units,
            display: Mutex::new(Display {
                prefix: String::new(),
                postfix: String::new(),
                scale: 1.0,
                lines: Vec::new(),
                finished: false,
                target: Box::new(target),
            }),
        });

        let observer = inner.clone();
        tracker.on_finish(move || observer.finish());

        Bar { inner }
    }

    /// Creates a bar with no background thread; frames are painted only
    /// through [`redraw_now`](Bar::redraw_now). Keeps frame tests
    /// deterministic.
    #[cfg(test)]
    pub(crate) fn headless(
        tracker: Arc<Tracker>, target: impl Write + Send + 'static, opts: BarOptions,
    ) -> Bar {
        Self::build(tracker, target, opts)
    }

    #[cfg(test)]
    pub(crate) fn redraw_now(&self) {
        let _ = self.inner.redraw();
    }

    /// Sets the text shown before the bar, applied on the next redraw.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.display.lock().unwrap().prefix = prefix.into();
    }

    /// Sets the text shown after the bar, applied on the next redraw.
    pub fn set_postfix(&self, postfix: impl Into<String>) {
        self.inner.display.lock().unwrap().postfix = postfix.into();
    }

    /// Scales the visual fill of the bar, clamped to `0.0..=1.0`.
    ///
    /// Independent of the tracked value; use it to display a weighted
    /// sub-task of a larger operation.
    pub fn set_scale(&self, scale: f64) {
        self.inner.display.lock().unwrap().scale = scale.clamp(0.0, 1.0);
    }

    /// Queues a line to be printed above the bar on the next redraw,
    /// in order, without interfering with the bar line.
    pub fn println(&self, line: impl Into<String>) {
        self.inner.display.lock().unwrap().lines.push(line.into());
    }
}

impl BarInner {
    /// Paints one frame: pending lines first, then the bar line itself,
    /// right-padded so it fully overwrites the previous frame.
    fn redraw(&self) -> std::io::Result<()> {
        // Tracker snapshots are taken before the display lock; neither
        // lock is ever held while waiting on the other.
        let stats = self.tracker.stats();
        let current = self.tracker.progress();

        let opts = &self.opts;
        let theme = &opts.theme;

        let mut display = self.display.lock().unwrap();
        if display.finished {
            return Ok(());
        }

        if !display.lines.is_empty() {
            display.clear_line(opts.width)?;
            let lines = std::mem::take(&mut display.lines);
            for line in lines {
                writeln!(display.target, "{line}")?;
            }
        }

        let percent_box = format!(" {:6.2}% ", current * 100.0);

        let mut time_box = String::new();
        if opts.show_time_left {
            if let Some(left) = stats.as_ref().and_then(|s| s.time_left()) {
                time_box = format!("{} ", format_duration(left));
            }
            time_box = pad_left(time_box, opts.time_box_width);
        }

        let mut speed_box = String::new();
        if opts.show_speed && self.units == Units::Bytes {
            if let Some(bps) = stats.as_ref().and_then(|s| s.bps()) {
                speed_box = format!("{} ", format_bps(bps));
            }
            speed_box = pad_left(speed_box, opts.speed_box_width);
        }

        let prefix = match display.prefix.is_empty() {
            true => String::new(),
            false => format!("{} ", display.prefix),
        };
        let postfix = match display.postfix.is_empty() {
            true => String::new(),
            false => format!(" {}", display.postfix),
        };

        // Column arithmetic counts codepoints, not bytes; the Unicode
        // palettes are multi-byte.
        let used = [
            prefix.as_str(),
            theme.bar_start,
            theme.bar_end,
            percent_box.as_str(),
            time_box.as_str(),
            speed_box.as_str(),
            postfix.as_str(),
        ]
        .iter()
        .map(|s| columns(s))
        .sum::<usize>();

        let full_size = opts.bar_width.min(opts.width.saturating_sub(used));
        let size = (full_size as f64 * display.scale).ceil() as usize;
        let pad = full_size.saturating_sub(size);

        let mut bar_box = String::new();
        if size > 0 {
            let filled = ((current * size as f64).ceil() as usize).min(size);
            bar_box.push_str(theme.bar_start);
            bar_box.push_str(&theme.filled.repeat(filled));
            bar_box.push_str(&theme.empty.repeat(size - filled));
            if pad > 0 {
                bar_box.push_str(&" ".repeat(pad - 1));
            }
            bar_box.push_str(theme.bar_end);
        } else if pad > 0 {
            bar_box.push_str(theme.bar_start);
            bar_box.push_str(&" ".repeat(pad - 1));
            bar_box.push_str(theme.bar_end);
        }

        let mut out = format!("{prefix}{bar_box}{percent_box}{speed_box}{time_box}{postfix}");
        let printed = columns(&out);
        if printed < opts.width {
            out.push_str(&" ".repeat(opts.width - printed));
        }

        write!(display.target, "\r{out}")?;
        display.target.flush()
    }

    /// Clears the bar line and stops all further output. Runs exactly
    /// once, from the tracker's finish notification.
    fn finish(&self) {
        let mut display = self.display.lock().unwrap();
        if display.finished {
            return;
        }
        display.finished = true;
        let _ = display.clear_line(self.opts.width);
    }
}

impl Display {
    fn clear_line(&mut self, width: usize) -> std::io::Result<()> {
        write!(self.target, "\r{}\r", " ".repeat(width))?;
        self.target.flush()
    }
}

fn columns(s: &str) -> usize {
    s.chars().count()
}

fn pad_left(s: String, width: usize) -> String {
    let len = columns(&s);
    match len < width {
        true => format!("{}{}", " ".repeat(width - len), s),
        false => s,
    }
}
