//! Detection gate states and per-call decisions.
//!
//! A decision describes what happened during a single `detect` call:
//! - the terminal gate state (activated / rejected)
//! - evidence counts against the expected rate
//! - pose spread, when it was computed

use std::fmt;

use super::deviation::DeviationSample;

/// State of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// No evaluation in progress.
    #[default]
    Idle,
    /// Collecting and checking evidence.
    Evaluating,
    /// Tracking was requested from the registry.
    Activated,
    /// Evidence was not sufficient; nothing was requested.
    Rejected,
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Activated | Self::Rejected)
    }
}

/// Why an evaluation ended in [`GateState::Rejected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Fewer recent observations than the evidence threshold.
    InsufficientEvidence,
    /// Pose spread exceeded a configured deviation bound.
    DeviationExceeded,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientEvidence => f.write_str("insufficient evidence"),
            Self::DeviationExceeded => f.write_str("deviation exceeded"),
        }
    }
}

/// Outcome of a single `detect` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    pub state: GateState,
    pub reason: Option<RejectReason>,
    /// Observations found in the evaluation window.
    pub observed: usize,
    /// Observations expected in the window at the configured rate.
    pub expected: f64,
    pub deviation: Option<DeviationSample>,
}

impl GateDecision {
    pub fn rejected(
        reason: RejectReason,
        observed: usize,
        expected: f64,
        deviation: Option<DeviationSample>,
    ) -> Self {
        Self {
            state: GateState::Rejected,
            reason: Some(reason),
            observed,
            expected,
            deviation,
        }
    }

    pub fn activated(observed: usize, expected: f64, deviation: DeviationSample) -> Self {
        Self {
            state: GateState::Activated,
            reason: None,
            observed,
            expected,
            deviation: Some(deviation),
        }
    }

    pub fn accepted(&self) -> bool {
        self.state == GateState::Activated
    }
}
