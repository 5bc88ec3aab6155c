/// Severity of a [`Consumer`] message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        })
    }
}

/// Receives the state changes of a task one might want to surface: show
/// progress to the user, store messages in a file, forward them to a
/// logging framework.
///
/// Every method has a no-op default body, so implementors override only
/// what they consume:
///
/// ```rust,ignore
/// struct StderrConsumer;
///
/// impl Consumer for StderrConsumer {
///     fn message(&self, level: Level, message: &str) {
///         eprintln!("[{level}] {message}");
///     }
/// }
/// ```
///
/// Producers hold a `&dyn Consumer` (or generic `C: Consumer`) and report
/// through it; they never format or filter on the caller's behalf.
pub trait Consumer: Send + Sync {
    /// Announces the degree of completion of the task, in `0.0..=1.0`.
    fn progress(&self, alpha: f64) {
        let _ = alpha;
    }

    /// Progress reporting is temporarily stopped (e.g. the task is
    /// waiting on user input).
    fn pause_progress(&self) {}

    /// Progress reporting resumes.
    fn resume_progress(&self) {}

    /// Names the piece of work currently being executed.
    fn progress_label(&self, label: &str) {
        let _ = label;
    }

    /// A leveled log message.
    fn message(&self, level: Level, message: &str) {
        let _ = (level, message);
    }

    /// Shorthand for a [`Level::Debug`] message.
    fn debug(&self, message: &str) {
        self.message(Level::Debug, message);
    }

    /// Shorthand for a [`Level::Info`] message.
    fn info(&self, message: &str) {
        self.message(Level::Info, message);
    }

    /// Shorthand for a [`Level::Warning`] message.
    fn warn(&self, message: &str) {
        self.message(Level::Warning, message);
    }

    /// Shorthand for a [`Level::Error`] message.
    fn error(&self, message: &str) {
        self.message(Level::Error, message);
    }
}

/// Discards everything. Useful as a default for hosts that don't care.
impl Consumer for () {}
