/// Average over a 10-sample period, which puts the average age of the
/// samples around 5.
const AVERAGE_SAMPLE_AGE: f64 = 5.0;

/// Decay factor derived from the target sample age.
const DECAY: f64 = 2.0 / (AVERAGE_SAMPLE_AGE + 1.0);

/// Exponentially weighted moving average of a series of numbers.
///
/// The first [`add`](Average::add) seeds the average with the sample
/// exactly, with no smoothing transient. Every later sample is folded
/// in as `sample * decay + value * (1 - decay)`.
///
/// Whether any data has been seen is tracked explicitly, so an average
/// that legitimately converges to zero is not mistaken for an empty one.
/// [`reset`](Average::reset) returns to the unseeded state; the next `add`
/// is a cold start again, which pause/resume in the tracker relies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Average {
    value: f64,
    seeded: bool,
}

impl Average {
    /// Creates an empty average. [`value`](Average::value) reports `0.0`
    /// until the first sample arrives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a sample into the series.
    pub fn add(&mut self, sample: f64) {
        if !self.seeded {
            self.value = sample;
            self.seeded = true;
            return;
        }
        self.value = sample * DECAY + self.value * (1.0 - DECAY);
    }

    /// Current value of the moving average.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Discards all accumulated data.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
