//! Run anomaly detection on top of the persisted duration statistics.

use serde::{Deserialize, Serialize};

use crate::welford::{z_score, WelfordStats};

/// Minimum completed runs before durations are judged.
pub const MIN_DURATION_SAMPLES: u64 = 10;
pub const Z_THRESHOLD: f64 = 3.0;
/// A critical duration anomaly must also exceed the median by this factor.
pub const MEDIAN_FACTOR: f64 = 1.5;
/// Number of previous output sizes used as the baseline.
pub const SIZE_WINDOW: usize = 7;
pub const MIN_SIZE_SAMPLES: usize = 3;
pub const SIZE_DROP_PERCENT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Duration,
    OutputSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyType,
    pub severity: AnomalySeverity,
    pub expected: f64,
    pub actual: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub message: String,
}

/// Judge a run duration against the monitor's history.
///
/// `stats` and `median` describe the runs *before* this one.
pub fn detect_duration_anomaly(
    stats: &WelfordStats,
    median: Option<f64>,
    duration_ms: f64,
) -> Option<Anomaly> {
    if stats.count < MIN_DURATION_SAMPLES {
        return None;
    }
    let mean = stats.mean.filter(|m| *m != 0.0)?;
    let stddev = stats.stddev().filter(|s| *s != 0.0)?;
    let z = z_score(duration_ms, mean, stddev)?;
    if z.abs() <= Z_THRESHOLD {
        return None;
    }

    let expected = mean.round();
    let above_median = median.is_some_and(|m| duration_ms > m * MEDIAN_FACTOR);
    let (severity, message) = if above_median {
        (
            AnomalySeverity::Critical,
            format!(
                "Job took {duration_ms}ms ({:.1}σ from mean). Expected ~{expected}ms.",
                z.abs()
            ),
        )
    } else {
        (
            AnomalySeverity::Warning,
            format!(
                "Job took {duration_ms}ms, which is {:.1} standard deviations from mean ({expected}ms).",
                z.abs()
            ),
        )
    };

    Some(Anomaly {
        kind: AnomalyType::Duration,
        severity,
        expected,
        actual: duration_ms,
        z_score: Some(z),
        threshold: Some(Z_THRESHOLD),
        message,
    })
}

/// Flag a sharp drop in captured output size versus recent runs.
///
/// `previous` holds the sizes of the most recent earlier runs, newest first;
/// only the first [`SIZE_WINDOW`] positive values are considered.
pub fn detect_output_size_anomaly(size_bytes: u64, previous: &[u64]) -> Option<Anomaly> {
    let baseline: Vec<f64> = previous
        .iter()
        .copied()
        .filter(|s| *s > 0)
        .take(SIZE_WINDOW)
        .map(|s| s as f64)
        .collect();
    if baseline.len() < MIN_SIZE_SAMPLES {
        return None;
    }

    let avg = baseline.iter().sum::<f64>() / baseline.len() as f64;
    let drop = (avg - size_bytes as f64) / avg * 100.0;
    if drop <= SIZE_DROP_PERCENT {
        return None;
    }

    let expected = avg.round();
    Some(Anomaly {
        kind: AnomalyType::OutputSize,
        severity: AnomalySeverity::Warning,
        expected,
        actual: size_bytes as f64,
        z_score: None,
        threshold: None,
        message: format!(
            "Output size dropped {drop:.0}% ({size_bytes} bytes vs expected {expected} bytes). May indicate partial failure."
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(values: &[f64]) -> WelfordStats {
        values.iter().fold(WelfordStats::new(), |s, v| s.update(*v))
    }

    fn steady() -> Vec<f64> {
        vec![
            990.0, 1000.0, 1010.0, 995.0, 1005.0, 1000.0, 990.0, 1010.0, 1000.0, 1000.0,
        ]
    }

    #[test]
    fn too_few_runs_is_never_anomalous() {
        let stats = history(&steady()[..9]);
        assert!(detect_duration_anomaly(&stats, Some(1000.0), 50_000.0).is_none());
    }

    #[test]
    fn normal_duration_passes() {
        let stats = history(&steady());
        assert!(detect_duration_anomaly(&stats, Some(1000.0), 1008.0).is_none());
    }

    #[test]
    fn far_above_median_is_critical() {
        let stats = history(&steady());
        let a = detect_duration_anomaly(&stats, Some(1000.0), 5000.0).unwrap();
        assert_eq!(a.kind, AnomalyType::Duration);
        assert_eq!(a.severity, AnomalySeverity::Critical);
        assert_eq!(a.expected, 1000.0);
        assert!(a.z_score.unwrap() > 3.0);
    }

    #[test]
    fn outlier_near_median_is_warning() {
        let stats = history(&steady());
        let a = detect_duration_anomaly(&stats, Some(1000.0), 1100.0).unwrap();
        assert_eq!(a.severity, AnomalySeverity::Warning);
    }

    #[test]
    fn zero_variance_history_is_ignored() {
        let stats = history(&[1000.0; 12]);
        assert!(detect_duration_anomaly(&stats, Some(1000.0), 9000.0).is_none());
    }

    #[test]
    fn output_drop_over_seventy_percent() {
        let a = detect_output_size_anomaly(200, &[1000, 1000, 1000]).unwrap();
        assert_eq!(a.kind, AnomalyType::OutputSize);
        assert_eq!(a.expected, 1000.0);
        assert!(a.message.contains("80%"));
    }

    #[test]
    fn output_drop_needs_baseline() {
        assert!(detect_output_size_anomaly(10, &[1000, 0, 1000]).is_none());
        assert!(detect_output_size_anomaly(400, &[1000, 1000, 1000]).is_none());
    }
}
