use serde::Serialize;

use crate::metrics::Metrics;

/// Live metrics captured once per elapsed second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WpmSample {
    pub elapsed_secs: u32,
    pub wpm: u32,
    pub accuracy: u32,
}

impl WpmSample {
    pub fn from_metrics(m: &Metrics) -> Self {
        Self {
            elapsed_secs: m.elapsed_secs,
            wpm: m.wpm,
            accuracy: m.accuracy,
        }
    }

    /// `(seconds, wpm)` as plotted by the results chart.
    pub fn as_point(&self) -> (f64, f64) {
        (f64::from(self.elapsed_secs), f64::from(self.wpm))
    }
}
