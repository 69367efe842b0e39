//! Job snapshot: the immutable unit of work the solver assigns to staff.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum Priority {
    Normal = 0,
    High = 1,
    Urgent = 2,
}

impl Priority {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            2 => Priority::Urgent,
            1 => Priority::High,
            _ => Priority::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Approved,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Closed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Approved => "approved",
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Closed => "closed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(JobStatus::Approved),
            "scheduled" => Some(JobStatus::Scheduled),
            "in_progress" => Some(JobStatus::InProgress),
            "completed" => Some(JobStatus::Completed),
            "cancelled" => Some(JobStatus::Cancelled),
            "closed" => Some(JobStatus::Closed),
            _ => None,
        }
    }
}

pub type EquipmentTag = String;

/// Read-only projection of a job the solver may assign. Never written back
/// through; the persister transitions the job row's status separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub address: String,
    pub property_location: Option<Location>,
    pub city_tag: String,
    pub job_type: String,
    pub duration_minutes: u32,
    pub buffer_minutes: u32,
    pub priority: Priority,
    pub equipment_required: BTreeSet<EquipmentTag>,
    pub staffing_required: u32,
    pub earliest_start: Option<NaiveTime>,
    pub latest_finish: Option<NaiveTime>,
    pub preferred_window: Option<(NaiveTime, NaiveTime)>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl JobSnapshot {
    /// `false` when the job has no usable coordinates; such jobs never enter
    /// the solver and are reported unassigned with reason `unlocatable`.
    pub fn is_locatable(&self) -> bool {
        self.property_location.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_round_trips_through_i32() {
        assert_eq!(Priority::from_i32(Priority::Urgent.as_i32()), Priority::Urgent);
        assert_eq!(Priority::from_i32(5), Priority::Normal);
    }

    #[test]
    fn job_status_round_trips_through_str() {
        for status in [
            JobStatus::Approved,
            JobStatus::Scheduled,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Cancelled,
            JobStatus::Closed,
        ] {
            assert_eq!(JobStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unlocatable_job_has_no_location() {
        let job = JobSnapshot {
            job_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            customer_name: "Customer A".into(),
            address: "1 Main St".into(),
            property_location: None,
            city_tag: "prague".into(),
            job_type: "irrigation".into(),
            duration_minutes: 60,
            buffer_minutes: 0,
            priority: Priority::Normal,
            equipment_required: BTreeSet::new(),
            staffing_required: 1,
            earliest_start: None,
            latest_finish: None,
            preferred_window: None,
            status: JobStatus::Approved,
            created_at: Utc::now(),
        };
        assert!(!job.is_locatable());
    }
}
