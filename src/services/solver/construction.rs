//! Greedy construction heuristic: deterministic ordering, best-delta
//! insertion per job.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use super::{rebuild_tour, TravelLookup};
use crate::services::constraints;
use crate::services::snapshot::SolverInput;
use crate::types::{Assignment, AvailabilityEntry, JobSnapshot, Score, StaffSnapshot, UnassignedJob};

fn ordering_key(job: &JobSnapshot) -> (std::cmp::Reverse<i32>, chrono::DateTime<chrono::Utc>, std::cmp::Reverse<u32>) {
    (std::cmp::Reverse(job.priority.as_i32()), job.created_at, std::cmp::Reverse(job.duration_minutes))
}

/// Builds an initial feasible-as-possible schedule. Every job is either
/// placed into some staff's tour or recorded as unassigned with a reason.
pub fn construct(
    input: &SolverInput,
    travel: &TravelLookup,
) -> (Vec<Assignment>, Vec<UnassignedJob>) {
    let jobs_by_id: HashMap<Uuid, JobSnapshot> = input.jobs.iter().map(|j| (j.job_id, j.clone())).collect();
    let staff_by_id: HashMap<Uuid, StaffSnapshot> = input.staff.iter().map(|s| (s.staff_id, s.clone())).collect();
    let availability_by_staff: HashMap<Uuid, AvailabilityEntry> =
        input.availability.iter().map(|a| (a.staff_id, *a)).collect();

    let eligible_staff_ids: Vec<Uuid> = input
        .staff
        .iter()
        .filter(|s| s.is_eligible() && availability_by_staff.get(&s.staff_id).map(|a| a.available).unwrap_or(false))
        .map(|s| s.staff_id)
        .collect();

    let mut tours: BTreeMap<Uuid, Vec<Uuid>> = eligible_staff_ids.iter().map(|&id| (id, Vec::new())).collect();
    let mut unassigned = Vec::new();

    let mut ordered_jobs: Vec<&JobSnapshot> = input.jobs.iter().collect();
    ordered_jobs.sort_by(|a, b| ordering_key(a).cmp(&ordering_key(b)));

    for job in ordered_jobs {
        if !job.is_locatable() {
            unassigned.push(UnassignedJob { job_id: job.job_id, reason: "unlocatable".into() });
            continue;
        }

        if job.staffing_required <= 1 {
            match best_single_staff_slot(job, &eligible_staff_ids, &tours, &staff_by_id, &availability_by_staff, &jobs_by_id, travel) {
                Some((staff_id, idx)) => {
                    tours.get_mut(&staff_id).expect("eligible staff has a tour entry").insert(idx, job.job_id);
                }
                None => unassigned.push(UnassignedJob { job_id: job.job_id, reason: "no_fit".into() }),
            }
        } else {
            match try_multi_staff_insert(job, &eligible_staff_ids, &mut tours, &staff_by_id, &availability_by_staff, &jobs_by_id, travel) {
                true => {}
                false => unassigned.push(UnassignedJob { job_id: job.job_id, reason: "multi_staff_unavailable".into() }),
            }
        }
    }

    let assignments = tours
        .into_iter()
        .map(|(staff_id, order)| {
            let staff = &staff_by_id[&staff_id];
            let availability = &availability_by_staff[&staff_id];
            let stops = rebuild_tour(staff, availability, &order, &jobs_by_id, travel);
            Assignment { staff_id, stops }
        })
        .collect();

    (assignments, unassigned)
}

#[allow(clippy::too_many_arguments)]
fn best_single_staff_slot(
    job: &JobSnapshot,
    eligible_staff_ids: &[Uuid],
    tours: &BTreeMap<Uuid, Vec<Uuid>>,
    staff_by_id: &HashMap<Uuid, StaffSnapshot>,
    availability_by_staff: &HashMap<Uuid, AvailabilityEntry>,
    jobs_by_id: &HashMap<Uuid, JobSnapshot>,
    travel: &TravelLookup,
) -> Option<(Uuid, usize)> {
    let mut best: Option<(Uuid, usize, Score)> = None;

    for &staff_id in eligible_staff_ids {
        let staff = &staff_by_id[&staff_id];
        if !staff.has_equipment(&job.equipment_required) {
            continue;
        }
        let availability = &availability_by_staff[&staff_id];
        let current = &tours[&staff_id];

        for idx in 0..=current.len() {
            let mut candidate_order = current.clone();
            candidate_order.insert(idx, job.job_id);
            let stops = rebuild_tour(staff, availability, &candidate_order, jobs_by_id, travel);
            let assignment = Assignment { staff_id, stops };
            let score = constraints::score_assignment(&assignment, jobs_by_id, staff, Some(availability));

            if score.hard < 0 {
                continue;
            }
            let better = match &best {
                None => true,
                Some((_, _, best_score)) => score.soft.cmp(&best_score.soft) == Ordering::Greater,
            };
            if better {
                best = Some((staff_id, idx, score));
            }
        }
    }

    best.map(|(staff_id, idx, _)| (staff_id, idx))
}

#[allow(clippy::too_many_arguments)]
fn try_multi_staff_insert(
    job: &JobSnapshot,
    eligible_staff_ids: &[Uuid],
    tours: &mut BTreeMap<Uuid, Vec<Uuid>>,
    staff_by_id: &HashMap<Uuid, StaffSnapshot>,
    availability_by_staff: &HashMap<Uuid, AvailabilityEntry>,
    jobs_by_id: &HashMap<Uuid, JobSnapshot>,
    travel: &TravelLookup,
) -> bool {
    let n = job.staffing_required as usize;

    let mut candidates: Vec<Uuid> = eligible_staff_ids
        .iter()
        .copied()
        .filter(|id| staff_by_id[id].has_equipment(&job.equipment_required))
        .collect();
    if candidates.len() < n {
        return false;
    }
    candidates.sort_by_key(|id| tours[id].len());
    let chosen = &candidates[..n];

    let mut natural_starts = Vec::with_capacity(n);
    for &staff_id in chosen {
        let staff = &staff_by_id[&staff_id];
        let availability = &availability_by_staff[&staff_id];
        let mut order = tours[&staff_id].clone();
        order.push(job.job_id);
        let stops = rebuild_tour(staff, availability, &order, jobs_by_id, travel);
        natural_starts.push(stops.last().expect("just appended a stop").start_minute);
    }
    let common_start = *natural_starts.iter().max().expect("n > 0");

    for &staff_id in chosen {
        let staff = &staff_by_id[&staff_id];
        let availability = &availability_by_staff[&staff_id];
        let mut order = tours[&staff_id].clone();
        order.push(job.job_id);
        let mut stops = rebuild_tour(staff, availability, &order, jobs_by_id, travel);
        let last = stops.last_mut().expect("just appended a stop");
        if common_start < last.arrive_minute {
            return false;
        }
        last.start_minute = common_start;
        last.end_minute = common_start + job.duration_minutes + job.buffer_minutes;

        let assignment = Assignment { staff_id, stops };
        let score = constraints::score_assignment(&assignment, jobs_by_id, staff, Some(availability));
        if score.hard < 0 {
            return false;
        }
    }

    for &staff_id in chosen {
        tours.get_mut(&staff_id).expect("chosen staff has a tour entry").push(job.job_id);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::solver::build_travel_lookup;
    use crate::types::{JobStatus, Location, Priority, StaffRole};
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

    fn job(id: Uuid, lat: f64, lon: f64) -> JobSnapshot {
        JobSnapshot {
            job_id: id,
            customer_id: Uuid::new_v4(),
            customer_name: "Customer".into(),
            address: "1 Main St".into(),
            property_location: Some(Location::new(lat, lon)),
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
        }
    }

    #[tokio::test]
    async fn construct_assigns_a_single_locatable_job_to_the_only_staff() {
        let staff_id = Uuid::new_v4();
        let job_id = Uuid::new_v4();
        let availability = AvailabilityEntry::new(
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
            staff: vec![staff(staff_id, 50.0, 14.0)],
            availability: vec![availability],
            jobs: vec![job(job_id, 50.01, 14.01)],
        };

        let travel = build_travel_lookup(None, &input).await;
        let (assignments, unassigned) = construct(&input, &travel);

        assert!(unassigned.is_empty());
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].stops.len(), 1);
        assert_eq!(assignments[0].stops[0].job_id, job_id);
    }

    #[tokio::test]
    async fn construct_reports_unlocatable_jobs_as_unassigned() {
        let staff_id = Uuid::new_v4();
        let mut unlocatable = job(Uuid::new_v4(), 0.0, 0.0);
        unlocatable.property_location = None;
        let availability = AvailabilityEntry::new(
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
            staff: vec![staff(staff_id, 50.0, 14.0)],
            availability: vec![availability],
            jobs: vec![unlocatable],
        };

        let travel = build_travel_lookup(None, &input).await;
        let (assignments, unassigned) = construct(&input, &travel);

        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].reason, "unlocatable");
        assert!(assignments[0].stops.is_empty());
    }

    #[tokio::test]
    async fn construct_leaves_a_job_unassigned_when_no_staff_has_the_required_equipment() {
        let staff_id = Uuid::new_v4();
        let mut needs_chainsaw = job(Uuid::new_v4(), 50.01, 14.01);
        needs_chainsaw.equipment_required = BTreeSet::from(["chainsaw".to_string()]);
        let availability = AvailabilityEntry::new(
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
            staff: vec![staff(staff_id, 50.0, 14.0)],
            availability: vec![availability],
            jobs: vec![needs_chainsaw],
        };

        let travel = build_travel_lookup(None, &input).await;
        let (assignments, unassigned) = construct(&input, &travel);

        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].reason, "no_fit");
        assert!(assignments[0].stops.is_empty());
    }

    #[tokio::test]
    async fn construct_seats_the_higher_priority_job_first_when_only_one_slot_fits() {
        let staff_id = Uuid::new_v4();
        let availability = AvailabilityEntry::new(
            staff_id,
            true,
            chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(9, 5, 0).unwrap(),
            None,
            0,
        )
        .unwrap();

        let mut low = job(Uuid::new_v4(), 50.01, 14.01);
        low.priority = Priority::Normal;
        let mut high = job(Uuid::new_v4(), 50.01, 14.01);
        high.priority = Priority::Urgent;

        let input = SolverInput {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            staff: vec![staff(staff_id, 50.0, 14.0)],
            availability: vec![availability],
            jobs: vec![low.clone(), high.clone()],
        };

        let travel = build_travel_lookup(None, &input).await;
        let (assignments, unassigned) = construct(&input, &travel);

        assert_eq!(assignments[0].stops.len(), 1);
        assert_eq!(assignments[0].stops[0].job_id, high.job_id);
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].job_id, low.job_id);
    }
}
