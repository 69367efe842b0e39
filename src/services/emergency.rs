//! Emergency single-job insertion (C7): finds the minimal-disturbance slot
//! for one job against the day's already-persisted schedule, without
//! re-running the full solver. Generalized from the insertion-delta style
//! of `services/insertion.rs`.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries::{appointments, availability, jobs, staff};
use crate::services::constraints;
use crate::services::routing::TravelProvider;
use crate::services::snapshot::SolverInput;
use crate::services::solver::{build_travel_lookup, rebuild_tour};
use crate::types::{Assignment, JobSnapshot, JobStatus, Priority, StopPlan};

/// Result of an emergency-insert attempt.
pub struct EmergencyOutcome {
    pub placement: Option<(Uuid, StopPlan)>,
    pub reason: Option<String>,
}

/// Tries to seat `job_id` into `target_date`'s existing schedule at the
/// single best (least score-degrading) feasible slot across all staff, then
/// persists just that one staff member's tour.
pub async fn insert_emergency(
    pool: &PgPool,
    provider: Option<&dyn TravelProvider>,
    target_date: NaiveDate,
    job_id: Uuid,
    priority_override: Option<i32>,
) -> Result<EmergencyOutcome> {
    let staff_list = staff::list_eligible_staff(pool).await?;
    let availability_list = availability::list_for_date(pool, target_date).await?;
    let existing_appointments = appointments::list_for_date(pool, target_date).await?;

    let mut job = jobs::get_by_id(pool, job_id).await?.ok_or_else(|| anyhow!("job {job_id} not found"))?;
    if let Some(level) = priority_override {
        job.priority = Priority::from_i32(level);
    }

    if !job.is_locatable() {
        return Ok(EmergencyOutcome { placement: None, reason: Some("unlocatable".into()) });
    }

    let mut tours: BTreeMap<Uuid, Vec<Uuid>> = staff_list.iter().map(|s| (s.staff_id, Vec::new())).collect();
    for appt in &existing_appointments {
        tours.entry(appt.staff_id).or_default().push(appt.job_id);
    }

    let mut jobs_by_id: HashMap<Uuid, JobSnapshot> = HashMap::new();
    for appt in &existing_appointments {
        if jobs_by_id.contains_key(&appt.job_id) {
            continue;
        }
        if let Some(existing) = jobs::get_by_id(pool, appt.job_id).await? {
            jobs_by_id.insert(existing.job_id, existing);
        }
    }
    jobs_by_id.insert(job.job_id, job.clone());

    let staff_by_id: HashMap<Uuid, _> = staff_list.iter().map(|s| (s.staff_id, s.clone())).collect();
    let availability_by_staff: HashMap<Uuid, _> = availability_list.iter().map(|a| (a.staff_id, *a)).collect();

    let input = SolverInput {
        date: target_date,
        staff: staff_list.clone(),
        availability: availability_list.clone(),
        jobs: jobs_by_id.values().cloned().collect(),
    };
    let travel = build_travel_lookup(provider, &input).await;

    let Some((staff_id, idx, _)) =
        best_emergency_slot(&job, &tours, &staff_by_id, &availability_by_staff, &jobs_by_id, &travel)
    else {
        return Ok(EmergencyOutcome { placement: None, reason: Some("no_fit".into()) });
    };

    let staff_snapshot = &staff_by_id[&staff_id];
    let staff_availability = &availability_by_staff[&staff_id];
    let mut order = tours[&staff_id].clone();
    order.insert(idx, job.job_id);
    let stops = rebuild_tour(staff_snapshot, staff_availability, &order, &jobs_by_id, &travel);
    let placed_stop = stops[idx].clone();

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM appointments WHERE scheduled_date = $1 AND staff_id = $2")
        .bind(target_date)
        .bind(staff_id)
        .execute(&mut *tx)
        .await?;

    for (order_idx, stop) in stops.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO appointments
                (job_id, staff_id, scheduled_date, time_window_start, time_window_end,
                 status, route_order, estimated_arrival)
            VALUES ($1, $2, $3, $4, $5, 'scheduled', $6, $7)
            "#,
        )
        .bind(stop.job_id)
        .bind(staff_id)
        .bind(target_date)
        .bind(minutes_to_time(stop.start_minute))
        .bind(minutes_to_time(stop.end_minute))
        .bind(order_idx as i32)
        .bind(minutes_to_time(stop.arrive_minute))
        .execute(&mut *tx)
        .await?;
    }

    jobs::set_status_tx(&mut tx, job.job_id, JobStatus::Scheduled).await?;
    tx.commit().await?;

    Ok(EmergencyOutcome { placement: Some((staff_id, placed_stop)), reason: None })
}

/// Across every staff's current tour, finds the `(staff_id, insertion_index)`
/// that seats `job` with the least soft-score disturbance while staying hard
/// feasible. Only ever reads `tours`, so a choice against one staff's tour
/// can never touch another's — emergency insertion by construction cannot
/// resequence an unrelated staff member.
#[allow(clippy::too_many_arguments)]
fn best_emergency_slot(
    job: &JobSnapshot,
    tours: &BTreeMap<Uuid, Vec<Uuid>>,
    staff_by_id: &HashMap<Uuid, crate::types::StaffSnapshot>,
    availability_by_staff: &HashMap<Uuid, crate::types::AvailabilityEntry>,
    jobs_by_id: &HashMap<Uuid, JobSnapshot>,
    travel: &crate::services::solver::TravelLookup,
) -> Option<(Uuid, usize, i64)> {
    let mut best: Option<(Uuid, usize, i64)> = None;

    for (&staff_id, order) in tours {
        let Some(staff_snapshot) = staff_by_id.get(&staff_id) else { continue };
        if !staff_snapshot.has_equipment(&job.equipment_required) {
            continue;
        }
        let Some(staff_availability) = availability_by_staff.get(&staff_id) else { continue };

        for idx in 0..=order.len() {
            let mut candidate = order.clone();
            candidate.insert(idx, job.job_id);
            let stops = rebuild_tour(staff_snapshot, staff_availability, &candidate, jobs_by_id, travel);
            let assignment = Assignment { staff_id, stops };
            let score = constraints::score_assignment(&assignment, jobs_by_id, staff_snapshot, Some(staff_availability));
            if score.hard < 0 {
                continue;
            }
            let better = match &best {
                None => true,
                Some((_, _, best_soft)) => score.soft > *best_soft,
            };
            if better {
                best = Some((staff_id, idx, score.soft));
            }
        }
    }

    best
}

fn minutes_to_time(minutes: u32) -> chrono::NaiveTime {
    chrono::NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(23, 59, 0).expect("valid fallback time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::solver::build_travel_lookup;
    use crate::types::{AvailabilityEntry, JobStatus, Location, StaffRole, StaffSnapshot};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn staff(id: Uuid, lat: f64, lon: f64) -> StaffSnapshot {
        StaffSnapshot {
            staff_id: id,
            name: "Tech".into(),
            role: StaffRole::Tech,
            home_location: Location::new(lat, lon),
            equipment_owned: BTreeSet::new(),
            active: true,
        }
    }

    fn availability(staff_id: Uuid) -> AvailabilityEntry {
        AvailabilityEntry::new(
            staff_id,
            true,
            chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            None,
            0,
        )
        .unwrap()
    }

    fn job(id: Uuid, lat: f64, lon: f64) -> JobSnapshot {
        JobSnapshot {
            job_id: id,
            customer_id: Uuid::new_v4(),
            customer_name: "Customer".into(),
            address: "1 Main St".into(),
            property_location: Some(Location::new(lat, lon)),
            city_tag: "prague".into(),
            job_type: "mow".into(),
            duration_minutes: 30,
            buffer_minutes: 0,
            priority: Priority::Urgent,
            equipment_required: BTreeSet::new(),
            staffing_required: 1,
            earliest_start: None,
            latest_finish: None,
            preferred_window: None,
            status: JobStatus::Approved,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn best_slot_never_considers_a_staff_member_without_the_required_equipment() {
        let has_chainsaw = Uuid::new_v4();
        let bare_handed = Uuid::new_v4();
        let emergency_job_id = Uuid::new_v4();

        let mut staff_by_id = HashMap::new();
        let mut equipped = staff(has_chainsaw, 50.0, 14.0);
        equipped.equipment_owned = BTreeSet::from(["chainsaw".to_string()]);
        staff_by_id.insert(has_chainsaw, equipped);
        staff_by_id.insert(bare_handed, staff(bare_handed, 50.0, 14.0));

        let availability_by_staff: HashMap<_, _> =
            [(has_chainsaw, availability(has_chainsaw)), (bare_handed, availability(bare_handed))].into();

        let tours: BTreeMap<Uuid, Vec<Uuid>> = [(has_chainsaw, Vec::new()), (bare_handed, Vec::new())].into();

        let mut emergency_job = job(emergency_job_id, 50.01, 14.01);
        emergency_job.equipment_required = BTreeSet::from(["chainsaw".to_string()]);

        let jobs_by_id: HashMap<_, _> = [(emergency_job_id, emergency_job.clone())].into();

        let input = SolverInput {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            staff: staff_by_id.values().cloned().collect(),
            availability: availability_by_staff.values().copied().collect(),
            jobs: vec![emergency_job.clone()],
        };
        let travel = build_travel_lookup(None, &input).await;

        let result =
            best_emergency_slot(&emergency_job, &tours, &staff_by_id, &availability_by_staff, &jobs_by_id, &travel);

        assert_eq!(result.map(|(staff_id, ..)| staff_id), Some(has_chainsaw));
    }

    #[tokio::test]
    async fn best_slot_leaves_other_staff_tours_untouched() {
        let busy_staff = Uuid::new_v4();
        let idle_staff = Uuid::new_v4();
        let existing_job_id = Uuid::new_v4();
        let emergency_job_id = Uuid::new_v4();

        let staff_by_id: HashMap<_, _> =
            [(busy_staff, staff(busy_staff, 50.0, 14.0)), (idle_staff, staff(idle_staff, 50.0, 14.0))].into();
        let availability_by_staff: HashMap<_, _> =
            [(busy_staff, availability(busy_staff)), (idle_staff, availability(idle_staff))].into();

        let mut tours: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();
        tours.insert(busy_staff, vec![existing_job_id]);
        tours.insert(idle_staff, Vec::new());

        let emergency_job = job(emergency_job_id, 50.02, 14.02);
        let jobs_by_id: HashMap<_, _> =
            [(existing_job_id, job(existing_job_id, 50.01, 14.01)), (emergency_job_id, emergency_job.clone())].into();

        let input = SolverInput {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            staff: staff_by_id.values().cloned().collect(),
            availability: availability_by_staff.values().copied().collect(),
            jobs: jobs_by_id.values().cloned().collect(),
        };
        let travel = build_travel_lookup(None, &input).await;

        let before = tours.clone();
        let _ = best_emergency_slot(&emergency_job, &tours, &staff_by_id, &availability_by_staff, &jobs_by_id, &travel);

        assert_eq!(tours, before, "slot search must never mutate the tours it is scoring");
    }
}
