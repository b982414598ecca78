//! Incremental mean used for the per-contributor time metrics.

/// Stateless running-mean helper.
pub struct RunningAverage;

impl RunningAverage {
    /// Fold `new_value` into a mean computed over `previous_count` samples.
    ///
    /// A missing previous mean counts as zero, so samples that never carried
    /// the metric still weigh on the denominator:
    /// `mean' = (mean * (n - 1) + new_value) / n` with `n = previous_count + 1`.
    pub fn update(previous_mean: Option<f64>, previous_count: u32, new_value: f64) -> f64 {
        let n = f64::from(previous_count) + 1.0;
        (previous_mean.unwrap_or(0.0) * f64::from(previous_count) + new_value) / n
    }
}
