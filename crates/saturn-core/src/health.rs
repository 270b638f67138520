//! Composite monitor health score.
//!
//! `score = 0.4 * uptime + 0.3 * success_rate + 0.3 * performance`, each
//! component on a 0-100 scale.

use serde::{Deserialize, Serialize};

use crate::anomaly::MIN_DURATION_SAMPLES;
use crate::welford::WelfordStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

#[derive(Debug, Clone, Copy)]
pub struct HealthInput {
    pub expected_runs: u64,
    pub actual_runs: u64,
    pub successful_runs: u64,
    pub durations: WelfordStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    pub score: u32,
    pub uptime: f64,
    pub success_rate: f64,
    pub performance_score: f64,
    pub grade: Grade,
}

pub fn health_score(input: &HealthInput) -> HealthScore {
    let uptime = if input.expected_runs > 0 {
        (input.actual_runs as f64 / input.expected_runs as f64) * 100.0
    } else {
        100.0
    };
    let success_rate = if input.actual_runs > 0 {
        (input.successful_runs as f64 / input.actual_runs as f64) * 100.0
    } else {
        100.0
    };

    // Lower coefficient of variation means more consistent runtimes.
    let mut performance = 100.0;
    if input.durations.count >= MIN_DURATION_SAMPLES {
        if let (Some(mean), Some(stddev)) = (input.durations.mean, input.durations.stddev()) {
            if mean > 0.0 {
                performance = (100.0 - (stddev / mean) * 100.0).clamp(0.0, 100.0);
            }
        }
    }

    let score = (0.4 * uptime + 0.3 * success_rate + 0.3 * performance).round();
    let score = score.max(0.0) as u32;

    HealthScore {
        score,
        uptime: round1(uptime),
        success_rate: round1(success_rate),
        performance_score: round1(performance),
        grade: grade_for(score),
    }
}

fn grade_for(score: u32) -> Grade {
    match score {
        90.. => Grade::A,
        80..=89 => Grade::B,
        70..=79 => Grade::C,
        60..=69 => Grade::D,
        _ => Grade::F,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
