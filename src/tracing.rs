use crate::consumer::{Consumer, Level};

/// Forwards everything a [`Consumer`] receives to the `tracing`
/// ecosystem.
///
/// Messages map to events at their own level, progress fractions go out
/// at trace level (they can fire many times a second), pause and resume
/// at debug, labels at info. Install whatever subscriber the host
/// prefers; without one, everything is dropped for free.
///
/// ```rust,ignore
/// tracing_subscriber::fmt().init();
/// run_transfer(&TracingConsumer);
/// ```
pub struct TracingConsumer;

impl Consumer for TracingConsumer {
    fn progress(&self, alpha: f64) {
        tracing::trace!(progress = alpha);
    }

    fn pause_progress(&self) {
        tracing::debug!("progress paused");
    }

    fn resume_progress(&self) {
        tracing::debug!("progress resumed");
    }

    fn progress_label(&self, label: &str) {
        tracing::info!(label);
    }

    fn message(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!("{message}"),
            Level::Info => tracing::info!("{message}"),
            Level::Warning => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }
    }
}
