//! Per-staff per-day availability window (C2).

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("window_start must be before window_end")]
    WindowOrder,
    #[error("lunch_duration_minutes must be between 0 and 120")]
    LunchDurationOutOfRange,
    #[error("lunch_start must fall within the availability window")]
    LunchOutsideWindow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub staff_id: Uuid,
    pub available: bool,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub lunch_start: Option<NaiveTime>,
    pub lunch_duration_minutes: u32,
}

impl AvailabilityEntry {
    pub fn new(
        staff_id: Uuid,
        available: bool,
        window_start: NaiveTime,
        window_end: NaiveTime,
        lunch_start: Option<NaiveTime>,
        lunch_duration_minutes: u32,
    ) -> Result<Self, ValidationError> {
        if window_start >= window_end {
            return Err(ValidationError::WindowOrder);
        }
        if lunch_duration_minutes > 120 {
            return Err(ValidationError::LunchDurationOutOfRange);
        }
        if let Some(lunch_start) = lunch_start {
            let lunch_end = lunch_start + chrono::Duration::minutes(lunch_duration_minutes as i64);
            if lunch_start < window_start || lunch_end > window_end {
                return Err(ValidationError::LunchOutsideWindow);
            }
        }
        Ok(Self {
            staff_id,
            available,
            window_start,
            window_end,
            lunch_start,
            lunch_duration_minutes,
        })
    }

    /// Total working minutes once lunch is excluded; `0` when unavailable.
    pub fn available_minutes(&self) -> u32 {
        if !self.available {
            return 0;
        }
        let window_minutes = (self.window_end - self.window_start).num_minutes() as u32;
        window_minutes.saturating_sub(self.lunch_duration_minutes)
    }

    /// True iff `t` falls inside the work window and outside lunch.
    pub fn is_time_available(&self, t: NaiveTime) -> bool {
        if !self.available {
            return false;
        }
        if t < self.window_start || t >= self.window_end {
            return false;
        }
        if let Some(lunch_start) = self.lunch_start {
            let lunch_end = lunch_start + chrono::Duration::minutes(self.lunch_duration_minutes as i64);
            if t >= lunch_start && t < lunch_end {
                return false;
            }
        }
        true
    }

    pub fn lunch_interval(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.lunch_start.map(|start| {
            (start, start + chrono::Duration::minutes(self.lunch_duration_minutes as i64))
        })
    }
}
