//! Whole-day schedule: the solver's output and the persisted-schedule shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assignment::Assignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub hard: i64,
    pub soft: i64,
}

impl Score {
    pub const ZERO: Score = Score { hard: 0, soft: 0 };

    pub fn feasible(&self) -> bool {
        self.hard == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignedJob {
    pub job_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub date: NaiveDate,
    pub assignments: Vec<Assignment>,
    pub unassigned: Vec<UnassignedJob>,
    pub score: Score,
    pub elapsed_ms: u64,
    pub moves_evaluated: u64,
}

impl ScheduleResult {
    pub fn feasible(&self) -> bool {
        self.score.feasible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feasible_iff_hard_is_zero() {
        assert!(Score { hard: 0, soft: 10 }.feasible());
        assert!(!Score { hard: -1, soft: 10 }.feasible());
    }
}
