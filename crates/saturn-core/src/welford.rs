//! Streaming duration statistics (Welford's online algorithm).
//!
//! Only `count`, `mean`, `m2`, `min` and `max` are persisted; variance and
//! standard deviation are derived on demand.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelfordStats {
    pub count: u64,
    pub mean: Option<f64>,
    pub m2: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl WelfordStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the aggregate and return the result.
    pub fn update(&self, value: f64) -> WelfordStats {
        let count = self.count + 1;
        let old_mean = self.mean.unwrap_or(0.0);
        let delta = value - old_mean;
        let mean = old_mean + delta / count as f64;
        let delta2 = value - mean;
        let m2 = self.m2.unwrap_or(0.0) + delta * delta2;

        WelfordStats {
            count,
            mean: Some(mean),
            m2: Some(m2),
            min: Some(self.min.map_or(value, |m| m.min(value))),
            max: Some(self.max.map_or(value, |m| m.max(value))),
        }
    }

    /// Population variance, `M2 / count`. `None` until two values are seen.
    pub fn variance(&self) -> Option<f64> {
        match self.m2 {
            Some(m2) if self.count > 1 => Some(m2 / self.count as f64),
            _ => None,
        }
    }

    /// Sample variance, `M2 / (count - 1)`.
    pub fn sample_variance(&self) -> Option<f64> {
        match self.m2 {
            Some(m2) if self.count > 1 => Some(m2 / (self.count - 1) as f64),
            _ => None,
        }
    }

    /// Population standard deviation.
    pub fn stddev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

/// How many standard deviations `value` sits from `mean`.
pub fn z_score(value: f64, mean: f64, stddev: f64) -> Option<f64> {
    if stddev == 0.0 || stddev.is_nan() {
        return None;
    }
    Some((value - mean) / stddev)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(values: &[f64]) -> WelfordStats {
        values.iter().fold(WelfordStats::new(), |s, v| s.update(*v))
    }

    #[test]
    fn first_value_initialises_aggregate() {
        let stats = WelfordStats::new().update(100.0);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, Some(100.0));
        assert_eq!(stats.m2, Some(0.0));
        assert_eq!(stats.min, Some(100.0));
        assert_eq!(stats.max, Some(100.0));
        assert_eq!(stats.variance(), None);
        assert_eq!(stats.stddev(), None);
    }

    #[test]
    fn matches_direct_computation() {
        let stats = fold(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(stats.count, 5);
        assert!((stats.mean.unwrap() - 30.0).abs() < 1e-9);
        // population variance of 10..50 step 10 is 200
        assert!((stats.variance().unwrap() - 200.0).abs() < 1e-9);
        assert!((stats.sample_variance().unwrap() - 250.0).abs() < 1e-9);
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(50.0));
    }

    #[test]
    fn stable_with_large_offset() {
        // Naive sum-of-squares loses all precision here.
        let base = 1e9;
        let stats = fold(&[base + 4.0, base + 7.0, base + 13.0, base + 16.0]);
        assert!((stats.mean.unwrap() - (base + 10.0)).abs() < 1e-5);
        assert!((stats.sample_variance().unwrap() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn count_increments_by_one() {
        let mut stats = WelfordStats::new();
        for i in 0..1000u64 {
            let next = stats.update(i as f64);
            assert_eq!(next.count, stats.count + 1);
            stats = next;
        }
    }

    #[test]
    fn z_score_handles_zero_stddev() {
        assert_eq!(z_score(5.0, 5.0, 0.0), None);
        assert_eq!(z_score(8.0, 5.0, 1.5), Some(2.0));
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }
}
