use std::time::Duration;

/// What a task's progress fraction is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    /// Unit-less values.
    #[default]
    None,
    /// Formatted as B, KiB, MiB, etc.
    Bytes,
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// Converts a byte count to a human readable string, like `2.00 MiB`,
/// `64.20 KiB`, or `52 B`.
///
/// Unit thresholds are strict: exactly 1024 of a unit still reads in that
/// unit (`1024 B`, not `1.00 KiB`).
pub fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b > TIB => format!("{:.2} TiB", b as f64 / TIB as f64),
        b if b > GIB => format!("{:.2} GiB", b as f64 / GIB as f64),
        b if b > MIB => format!("{:.2} MiB", b as f64 / MIB as f64),
        b if b > KIB => format!("{:.2} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}

/// Formats a bandwidth value, i.e. a number of bytes per second.
pub fn format_bps(bps: f64) -> String {
    format!("{}/s", format_bytes(bps as u64))
}

/// Formats a duration compactly: `480ms`, `12s`, `3m42s`, `1h05m`, with a
/// leading day count once it reaches 24 hours (`2d7h`).
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        return format!("{}ms", d.as_millis());
    }

    let total = d.as_secs();
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m{seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
