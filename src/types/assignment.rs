//! Per-staff tours produced by the solver and the emergency inserter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopPlan {
    pub job_id: Uuid,
    pub arrive_minute: u32,
    pub start_minute: u32,
    pub end_minute: u32,
    pub travel_minute_from_prev: u32,
}

impl StopPlan {
    pub fn duration_and_buffer(&self) -> u32 {
        self.end_minute - self.start_minute
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub staff_id: Uuid,
    pub stops: Vec<StopPlan>,
}

impl Assignment {
    pub fn new(staff_id: Uuid) -> Self {
        Self { staff_id, stops: Vec::new() }
    }

    /// Stops are expected non-overlapping and sorted by `start_minute`;
    /// returns false if that invariant has been broken (invariant 1).
    pub fn is_sequence_sane(&self) -> bool {
        self.stops
            .windows(2)
            .all(|w| w[0].end_minute <= w[1].arrive_minute && w[0].start_minute <= w[1].start_minute)
    }
}
