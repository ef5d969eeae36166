//! Evenly spaced timestamp sampling.

/// Pick `count` evenly spaced timestamps in `[0, duration)`.
///
/// The first sample is always `0.0`; the last is `(count - 1) * duration / count`,
/// so `duration` itself is never reached. A non-positive (or non-finite)
/// duration or a zero count yields an empty set.
pub fn sample_timestamps(duration: f64, count: u32) -> Vec<f64> {
    if !duration.is_finite() || duration <= 0.0 || count == 0 {
        return Vec::new();
    }

    let step = duration / f64::from(count);
    (0..count).map(|i| f64::from(i) * step).collect()
}
