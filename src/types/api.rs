//! Request/response bodies for `/api/v1/schedule/*`, shaped exactly as the
//! wire contract specifies (snake_case field names, `HH:MM:SS` times).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audit::ClearAudit;
use super::job::JobSnapshot;
use super::schedule::ScheduleResult;

fn minutes_to_hms(minutes: u32) -> String {
    format!("{:02}:{:02}:{:02}", minutes / 60, minutes % 60, 0)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleGenerateRequest {
    pub schedule_date: NaiveDate,
    pub timeout_seconds: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReoptimizeRequest {
    pub timeout_seconds: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmergencyInsertRequest {
    pub job_id: Uuid,
    pub target_date: NaiveDate,
    pub priority_level: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearRequest {
    pub schedule_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledJob {
    pub job_id: Uuid,
    pub customer_name: String,
    pub address: String,
    pub city: String,
    pub start_time: String,
    pub end_time: String,
    pub arrive_time: String,
    pub duration_minutes: u32,
    pub buffer_minutes: u32,
    pub travel_time_minutes: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffAssignment {
    pub staff_id: Uuid,
    pub staff_name: String,
    pub jobs: Vec<ScheduledJob>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnassignedJobEntry {
    pub job_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResponse {
    pub schedule_date: NaiveDate,
    pub is_feasible: bool,
    pub hard_score: i64,
    pub soft_score: i64,
    pub elapsed_ms: u64,
    pub assignments: Vec<StaffAssignment>,
    pub unassigned_jobs: Vec<UnassignedJobEntry>,
}

impl ScheduleResponse {
    /// Builds the wire shape from the solver's internal result plus the job
    /// and staff snapshots needed to resolve display fields (customer name,
    /// address, city tag, staff name) that the internal `Assignment` does
    /// not carry.
    pub fn from_result(
        result: &ScheduleResult,
        jobs_by_id: &std::collections::HashMap<Uuid, JobSnapshot>,
        staff_names: &std::collections::HashMap<Uuid, String>,
    ) -> Self {
        let assignments = result
            .assignments
            .iter()
            .map(|a| StaffAssignment {
                staff_id: a.staff_id,
                staff_name: staff_names.get(&a.staff_id).cloned().unwrap_or_default(),
                jobs: a
                    .stops
                    .iter()
                    .map(|stop| {
                        let job = jobs_by_id.get(&stop.job_id);
                        ScheduledJob {
                            job_id: stop.job_id,
                            customer_name: job.map(|j| j.customer_name.clone()).unwrap_or_default(),
                            address: job.map(|j| j.address.clone()).unwrap_or_default(),
                            city: job.map(|j| j.city_tag.clone()).unwrap_or_default(),
                            start_time: minutes_to_hms(stop.start_minute),
                            end_time: minutes_to_hms(stop.end_minute),
                            arrive_time: minutes_to_hms(stop.arrive_minute),
                            duration_minutes: job.map(|j| j.duration_minutes).unwrap_or(0),
                            buffer_minutes: job.map(|j| j.buffer_minutes).unwrap_or(0),
                            travel_time_minutes: stop.travel_minute_from_prev,
                        }
                    })
                    .collect(),
            })
            .collect();

        let unassigned_jobs = result
            .unassigned
            .iter()
            .map(|u| UnassignedJobEntry { job_id: u.job_id, reason: u.reason.clone() })
            .collect();

        Self {
            schedule_date: result.date,
            is_feasible: result.feasible(),
            hard_score: result.score.hard,
            soft_score: result.score.soft,
            elapsed_ms: result.elapsed_ms,
            assignments,
            unassigned_jobs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CapacityResponse {
    pub total_staff: u32,
    pub available_staff: u32,
    pub total_capacity_minutes: u64,
    pub scheduled_minutes: u64,
    pub remaining_capacity_minutes: i64,
    pub can_accept_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyInsertAssignment {
    pub staff_id: Uuid,
    pub stop: super::assignment::StopPlan,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyInsertResponse {
    pub success: bool,
    pub assignment: Option<EmergencyInsertAssignment>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub audit_id: Uuid,
    pub appointments_deleted: u64,
    pub jobs_reset: u64,
    pub cleared_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreResponse {
    pub audit_id: Uuid,
    pub appointments_restored: u64,
    pub jobs_updated: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub audit_id: Uuid,
    pub schedule_date: NaiveDate,
    pub cleared_at: chrono::DateTime<chrono::Utc>,
    pub appointment_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditDetail {
    pub audit: ClearAudit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_to_hms_formats_with_leading_zeros() {
        assert_eq!(minutes_to_hms(481), "08:01:00");
        assert_eq!(minutes_to_hms(0), "00:00:00");
    }

    #[test]
    fn schedule_response_from_result_resolves_display_fields() {
        use super::super::assignment::{Assignment, StopPlan};
        use super::super::job::{JobStatus, Priority};
        use super::super::schedule::{Score, UnassignedJob};
        use std::collections::{BTreeSet, HashMap};

        let job_id = Uuid::new_v4();
        let staff_id = Uuid::new_v4();
        let job = JobSnapshot {
            job_id,
            customer_id: Uuid::new_v4(),
            customer_name: "Alice".into(),
            address: "12 Oak St".into(),
            property_location: Some(super::super::location::Location::new(50.0, 14.0)),
            city_tag: "prague".into(),
            job_type: "mow".into(),
            duration_minutes: 60,
            buffer_minutes: 0,
            priority: Priority::Normal,
            equipment_required: BTreeSet::new(),
            staffing_required: 1,
            earliest_start: None,
            latest_finish: None,
            preferred_window: None,
            status: JobStatus::Approved,
            created_at: chrono::Utc::now(),
        };

        let mut assignment = Assignment::new(staff_id);
        assignment.stops.push(StopPlan {
            job_id,
            arrive_minute: 481,
            start_minute: 481,
            end_minute: 541,
            travel_minute_from_prev: 1,
        });

        let result = ScheduleResult {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            assignments: vec![assignment],
            unassigned: vec![UnassignedJob { job_id: Uuid::new_v4(), reason: "no_fit".into() }],
            score: Score { hard: 0, soft: 120 },
            elapsed_ms: 42,
            moves_evaluated: 7,
        };

        let jobs_by_id = HashMap::from([(job_id, job)]);
        let staff_names = HashMap::from([(staff_id, "Tech A".to_string())]);

        let response = ScheduleResponse::from_result(&result, &jobs_by_id, &staff_names);
        assert!(response.is_feasible);
        assert_eq!(response.assignments[0].staff_name, "Tech A");
        assert_eq!(response.assignments[0].jobs[0].customer_name, "Alice");
        assert_eq!(response.assignments[0].jobs[0].start_time, "08:01:00");
        assert_eq!(response.unassigned_jobs.len(), 1);
    }
}
