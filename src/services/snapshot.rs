//! Snapshot loader (C3): assembles the solver's immutable input for a date.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::db::queries::{availability, jobs, staff};
use crate::types::{AvailabilityEntry, JobSnapshot, StaffSnapshot};

/// Immutable input handed to the solver: every eligible staff member, their
/// availability for `date`, and every job still waiting to be scheduled.
#[derive(Debug, Clone)]
pub struct SolverInput {
    pub date: NaiveDate,
    pub staff: Vec<StaffSnapshot>,
    pub availability: Vec<AvailabilityEntry>,
    pub jobs: Vec<JobSnapshot>,
}

impl SolverInput {
    pub fn availability_for(&self, staff_id: uuid::Uuid) -> Option<&AvailabilityEntry> {
        self.availability.iter().find(|a| a.staff_id == staff_id)
    }
}

/// Loads the read-only snapshot for `date`. When `job_id_filter` is set,
/// only that single job is included (used by the emergency-insert path,
/// which needs the rest of the day's staff/availability but exactly one
/// candidate job).
pub async fn load_snapshot(
    pool: &PgPool,
    date: NaiveDate,
    job_id_filter: Option<uuid::Uuid>,
) -> Result<SolverInput> {
    let staff = staff::list_eligible_staff(pool).await?;
    let availability = availability::list_for_date(pool, date).await?;

    let jobs = match job_id_filter {
        Some(job_id) => jobs::get_by_id(pool, job_id).await?.into_iter().collect(),
        None => jobs::list_unscheduled(pool).await?,
    };

    Ok(SolverInput { date, staff, availability, jobs })
}

/// Loads the snapshot a re-optimize is allowed to search over: every
/// `approved` job plus every `scheduled` job that already has an appointment
/// on `date`. A `scheduled` job tied to some other day never enters — this
/// is what keeps re-optimize from reaching across days.
pub async fn load_snapshot_for_reoptimize(pool: &PgPool, date: NaiveDate) -> Result<SolverInput> {
    let staff = staff::list_eligible_staff(pool).await?;
    let availability = availability::list_for_date(pool, date).await?;
    let jobs = jobs::list_for_reoptimize(pool, date).await?;

    Ok(SolverInput { date, staff, availability, jobs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, StaffRole};
    use std::collections::BTreeSet;

    #[test]
    fn availability_for_finds_matching_staff_id() {
        let staff_id = uuid::Uuid::new_v4();
        let entry = AvailabilityEntry::new(
            staff_id,
            true,
            chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            None,
            0,
        )
        .unwrap();

        let input = SolverInput {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            staff: vec![StaffSnapshot {
                staff_id,
                name: "Tech A".into(),
                role: StaffRole::Tech,
                home_location: Location::new(50.0, 14.0),
                equipment_owned: BTreeSet::new(),
                active: true,
            }],
            availability: vec![entry],
            jobs: vec![],
        };

        assert!(input.availability_for(staff_id).is_some());
        assert!(input.availability_for(uuid::Uuid::new_v4()).is_none());
    }
}
