//! Constraint engine (C4): hard/soft scoring over a candidate schedule.
//!
//! Each rule is a small pure function so a new one can be added without
//! touching the solver's search loop. Weights match the fixed table; only
//! equipment/availability/travel/priority/city-batching are grounded
//! directly on a reference scoring implementation — the remaining soft
//! rules (job-type batching, buffer preference, backtracking, preferred
//! window, FCFS) are built from the weight table alone.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveTime, Timelike};
use uuid::Uuid;

use crate::types::{Assignment, AvailabilityEntry, JobSnapshot, JobStatus, Score, StaffSnapshot};

const EQUIPMENT_PENALTY: i64 = 1;
const LUNCH_PENALTY: i64 = 1;
const OVERLAP_PENALTY: i64 = 1;
const BOUNDS_PENALTY: i64 = 1;
const MULTI_STAFF_PENALTY: i64 = 1;
const STATUS_PENALTY: i64 = 1;

const PRIORITY_WEIGHT: i64 = 90;
const TRAVEL_WEIGHT: i64 = 80;
const CITY_BATCH_WEIGHT: i64 = 70;
const PREFERRED_WINDOW_WEIGHT: i64 = 70;
const JOB_TYPE_BATCH_WEIGHT: i64 = 50;
const BUFFER_WEIGHT: i64 = 60;
const BACKTRACK_WEIGHT: i64 = 50;
const FCFS_WEIGHT: i64 = 30;

/// Statuses a job may be assigned while in: jobs already scheduled are
/// re-scorable during re-optimization, everything past `in_progress` is not.
fn status_is_eligible(status: JobStatus) -> bool {
    matches!(status, JobStatus::Approved | JobStatus::Scheduled)
}

fn minutes_since_midnight(t: NaiveTime) -> u32 {
    (t.hour() * 60 + t.minute()) as u32
}

/// Scores every staff tour plus the cross-tour multi-staff coherence rule.
pub fn score_schedule(
    assignments: &[Assignment],
    jobs_by_id: &HashMap<Uuid, JobSnapshot>,
    staff_by_id: &HashMap<Uuid, StaffSnapshot>,
    availability_by_staff: &HashMap<Uuid, AvailabilityEntry>,
) -> Score {
    let mut total = Score::ZERO;

    for assignment in assignments {
        let Some(staff) = staff_by_id.get(&assignment.staff_id) else { continue };
        let availability = availability_by_staff.get(&assignment.staff_id);
        let per_staff = score_assignment(assignment, jobs_by_id, staff, availability);
        total.hard += per_staff.hard;
        total.soft += per_staff.soft;
    }

    total.hard += score_multi_staff_coherence(assignments, jobs_by_id);
    total
}

/// Hard + soft score contributed by a single staff member's tour.
pub fn score_assignment(
    assignment: &Assignment,
    jobs_by_id: &HashMap<Uuid, JobSnapshot>,
    staff: &StaffSnapshot,
    availability: Option<&AvailabilityEntry>,
) -> Score {
    let mut hard = 0i64;
    let mut soft = 0i64;

    for (idx, stop) in assignment.stops.iter().enumerate() {
        let Some(job) = jobs_by_id.get(&stop.job_id) else { continue };

        if !job.equipment_required.is_subset(&staff.equipment_owned) {
            hard -= EQUIPMENT_PENALTY;
        }

        if !status_is_eligible(job.status) {
            hard -= STATUS_PENALTY;
        }

        if let Some(earliest) = job.earliest_start {
            if stop.start_minute < minutes_since_midnight(earliest) {
                hard -= BOUNDS_PENALTY;
            }
        }
        if let Some(latest) = job.latest_finish {
            if stop.end_minute > minutes_since_midnight(latest) {
                hard -= BOUNDS_PENALTY;
            }
        }

        if let Some(availability) = availability {
            if stop.end_minute > minutes_since_midnight(availability.window_end) {
                let overrun = stop.end_minute - minutes_since_midnight(availability.window_end);
                hard -= overrun as i64;
            }
            if let Some((lunch_start, lunch_end)) = availability.lunch_interval() {
                let lunch_start = minutes_since_midnight(lunch_start);
                let lunch_end = minutes_since_midnight(lunch_end);
                if stop.start_minute < lunch_end && stop.end_minute > lunch_start {
                    hard -= LUNCH_PENALTY;
                }
            }
        }

        if idx > 0 {
            let prev = &assignment.stops[idx - 1];
            if prev.end_minute > stop.arrive_minute {
                hard -= OVERLAP_PENALTY;
            }
        }

        soft += job.priority.as_i32() as i64 * PRIORITY_WEIGHT;
        soft -= stop.travel_minute_from_prev as i64 * TRAVEL_WEIGHT;

        if let Some((pref_start, pref_end)) = job.preferred_window {
            let pref_start = minutes_since_midnight(pref_start);
            let pref_end = minutes_since_midnight(pref_end);
            if stop.start_minute >= pref_start && stop.start_minute < pref_end {
                soft += PREFERRED_WINDOW_WEIGHT;
            }
        }

        if job.buffer_minutes > 0 && idx + 1 < assignment.stops.len() {
            let next = &assignment.stops[idx + 1];
            if next.travel_minute_from_prev <= job.buffer_minutes {
                soft += BUFFER_WEIGHT;
            }
        }

        if idx > 0 {
            let prev_job = jobs_by_id.get(&assignment.stops[idx - 1].job_id);
            if let Some(prev_job) = prev_job {
                if prev_job.city_tag == job.city_tag {
                    soft += CITY_BATCH_WEIGHT;
                }
                if prev_job.job_type == job.job_type {
                    soft += JOB_TYPE_BATCH_WEIGHT;
                }
                if prev_job.created_at <= job.created_at {
                    soft += FCFS_WEIGHT;
                }
            }
        }
    }

    if assignment.stops.len() > 1 {
        let mean_travel: f64 = assignment.stops[1..].iter().map(|s| s.travel_minute_from_prev as f64).sum::<f64>()
            / (assignment.stops.len() - 1) as f64;
        for stop in &assignment.stops[1..] {
            if stop.travel_minute_from_prev as f64 > mean_travel * 1.5 {
                soft -= BACKTRACK_WEIGHT;
            }
        }
    }

    Score { hard, soft }
}

/// Jobs with `staffing_required > 1` must have exactly that many distinct
/// staff assigned with an identical `start_minute`. Penalizes each missing
/// staff slot.
fn score_multi_staff_coherence(assignments: &[Assignment], jobs_by_id: &HashMap<Uuid, JobSnapshot>) -> i64 {
    let mut starts_by_job: HashMap<Uuid, HashMap<u32, HashSet<Uuid>>> = HashMap::new();

    for assignment in assignments {
        for stop in &assignment.stops {
            starts_by_job
                .entry(stop.job_id)
                .or_default()
                .entry(stop.start_minute)
                .or_default()
                .insert(assignment.staff_id);
        }
    }

    let mut penalty = 0i64;
    for (job_id, job) in jobs_by_id {
        if job.staffing_required <= 1 {
            continue;
        }
        let best_coverage = starts_by_job
            .get(job_id)
            .and_then(|by_start| by_start.values().map(|staff| staff.len() as u32).max())
            .unwrap_or(0);
        if best_coverage < job.staffing_required {
            penalty -= (job.staffing_required - best_coverage) as i64 * MULTI_STAFF_PENALTY;
        }
    }
    penalty
}
