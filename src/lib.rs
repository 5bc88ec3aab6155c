#![doc = include_str!("../README.md")]

pub(crate) mod average;
pub(crate) mod bar;
pub(crate) mod consumer;
pub(crate) mod format;
pub(crate) mod theme;
pub(crate) mod tracker;

#[cfg(feature = "tracing")]
pub(crate) mod tracing;


/// Re-exports of all public types and functions.
pub mod prelude {
    pub use crate::average::Average;
    pub use crate::bar::{Bar, BarOptions};
    pub use crate::consumer::{Consumer, Level};
    pub use crate::format::{Units, format_bps, format_bytes, format_duration};
    pub use crate::theme::Theme;
    pub use crate::tracker::{CompletionStats, Stats, Tracker};

    #[cfg(feature = "tracing")]
    pub use crate::tracing::TracingConsumer;
}

pub use crate::prelude::*;
