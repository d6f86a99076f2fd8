//! Pairwise agreement statistics over a set of poses.

use crate::error::{AggregatorError, Result};
use crate::geometry::{SE3, quat_angle_between};

/// Mean pairwise spread of a pose set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviationSample {
    /// Mean pairwise Euclidean distance between positions (m).
    pub position_deviation: f64,
    /// Mean pairwise shortest-arc angle between orientations (rad, `[0, π]`).
    pub orientation_deviation: f64,
}

impl DeviationSample {
    pub fn orientation_deviation_deg(&self) -> f64 {
        self.orientation_deviation.to_degrees()
    }
}

/// Compute mean pairwise position and orientation deviation.
///
/// A single pose has zero deviation by definition. An empty set is an error;
/// callers are expected to guard against it.
pub fn analyze(poses: &[SE3]) -> Result<DeviationSample> {
    if poses.is_empty() {
        return Err(AggregatorError::EmptyPoseSet);
    }
    if poses.len() == 1 {
        return Ok(DeviationSample::default());
    }

    let mut pos_sum = 0.0;
    let mut ori_sum = 0.0;
    let mut n_pairs = 0usize;

    for (i, a) in poses.iter().enumerate() {
        for b in &poses[i + 1..] {
            pos_sum += (a.translation - b.translation).norm();
            ori_sum += quat_angle_between(&a.rotation, &b.rotation);
            n_pairs += 1;
        }
    }

    Ok(DeviationSample {
        position_deviation: pos_sum / n_pairs as f64,
        orientation_deviation: ori_sum / n_pairs as f64,
    })
}
