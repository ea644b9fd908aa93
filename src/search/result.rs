//! Run reports for both roles and best-so-far tracking

use crate::graph::CandidateSolution;
use std::time::Duration;

/// Why the supervisor stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A candidate with zero conflicts arrived.
    Solved,
    /// SIGINT/SIGTERM or a raised stop flag.
    Interrupted,
    /// The configured candidate limit was reached.
    LimitReached,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Solved => write!(f, "solved"),
            Outcome::Interrupted => write!(f, "interrupted"),
            Outcome::LimitReached => write!(f, "limit reached"),
        }
    }
}

/// Fewest-conflicts candidate seen so far.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best: Option<CandidateSolution>,
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `candidate` if it has strictly fewer conflicts than the current
    /// best. Returns true if it was kept.
    pub fn offer(&mut self, candidate: &CandidateSolution) -> bool {
        if self
            .best
            .as_ref()
            .is_some_and(|best| candidate.len() >= best.len())
        {
            return false;
        }
        self.best = Some(candidate.clone());
        true
    }

    #[cfg(test)]
    pub fn best(&self) -> Option<&CandidateSolution> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<CandidateSolution> {
        self.best
    }
}

/// Statistics from one supervisor run
#[derive(Debug, Clone)]
pub struct SupervisorReport {
    pub outcome: Outcome,
    /// Best candidate seen (empty if solved)
    pub best: Option<CandidateSolution>,
    /// Number of candidates taken out of the ring
    pub candidates_consumed: u64,
    /// Number of times the best candidate improved
    pub improvements: u64,
    pub elapsed_time: Duration,
}

/// Why a generator stopped writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorExit {
    /// The supervisor set the termination flag.
    Terminated,
    /// SIGINT/SIGTERM or a raised stop flag.
    Interrupted,
    /// The configured candidate limit was reached.
    LimitReached,
}

/// Statistics from one generator run
#[derive(Debug, Clone)]
pub struct GeneratorReport {
    pub exit: GeneratorExit,
    /// Number of candidates written into the ring
    pub candidates_emitted: u64,
    /// Fewest conflicts among emitted candidates, uncapped
    pub fewest_conflicts: Option<usize>,
    pub elapsed_time: Duration,
}
