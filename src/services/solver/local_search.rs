//! Deadline-bounded local search. The single move primitive is relocate
//! (pull one job out, reinsert it anywhere, same staff or a different one) —
//! it subsumes 2-opt reordering, pairwise swaps (two relocates in sequence)
//! and priority-promote (relocating a job earlier in its tour) without a
//! separate code path for each. unassign-reinsert is the one distinct move:
//! it tries seating a currently-unassigned job. Best-improvement acceptance,
//! a tabu list on (job, destination) pairs, deadline-checked every round.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Instant;

use uuid::Uuid;

use super::{rebuild_tour, SolverConfig, TravelLookup};
use crate::services::constraints;
use crate::services::snapshot::SolverInput;
use crate::types::{Assignment, AvailabilityEntry, JobSnapshot, Score, StaffSnapshot, UnassignedJob};

/// A move is identified by the pair of job ids it touches, tabu-listed by
/// that pair so the search doesn't immediately undo what it just did.
type MoveKey = (Uuid, Uuid);

struct TabuList {
    order: VecDeque<MoveKey>,
    seen: HashSet<MoveKey>,
    capacity: usize,
}

impl TabuList {
    fn new(capacity: usize) -> Self {
        Self { order: VecDeque::new(), seen: HashSet::new(), capacity: capacity.max(1) }
    }

    fn contains(&self, key: &MoveKey) -> bool {
        self.seen.contains(key)
    }

    fn push(&mut self, key: MoveKey) {
        if self.seen.insert(key) {
            self.order.push_back(key);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }
    }
}

struct Context<'a> {
    jobs_by_id: &'a HashMap<Uuid, JobSnapshot>,
    staff_by_id: &'a HashMap<Uuid, StaffSnapshot>,
    availability_by_staff: &'a HashMap<Uuid, AvailabilityEntry>,
    travel: &'a TravelLookup,
}

impl<'a> Context<'a> {
    fn tour_score(&self, staff_id: Uuid, order: &[Uuid]) -> (Vec<crate::types::StopPlan>, Score) {
        let staff = &self.staff_by_id[&staff_id];
        let availability = &self.availability_by_staff[&staff_id];
        let stops = rebuild_tour(staff, availability, order, self.jobs_by_id, self.travel);
        let assignment = Assignment { staff_id, stops: stops.clone() };
        let score = constraints::score_assignment(&assignment, self.jobs_by_id, staff, Some(availability));
        (stops, score)
    }
}

/// Runs relocate/2-opt/swap/unassign-reinsert/priority-promote moves until
/// the deadline, improving total soft score while never breaking a
/// previously-feasible tour. Never `.await`s: the whole loop is synchronous.
pub fn local_search(
    input: &SolverInput,
    travel: &TravelLookup,
    config: &SolverConfig,
    mut assignments: Vec<Assignment>,
    mut unassigned: Vec<UnassignedJob>,
) -> (Vec<Assignment>, Vec<UnassignedJob>, u64) {
    let jobs_by_id: HashMap<Uuid, JobSnapshot> = input.jobs.iter().map(|j| (j.job_id, j.clone())).collect();
    let staff_by_id: HashMap<Uuid, StaffSnapshot> = input.staff.iter().map(|s| (s.staff_id, s.clone())).collect();
    let availability_by_staff: HashMap<Uuid, AvailabilityEntry> =
        input.availability.iter().map(|a| (a.staff_id, *a)).collect();
    let ctx = Context { jobs_by_id: &jobs_by_id, staff_by_id: &staff_by_id, availability_by_staff: &availability_by_staff, travel };

    let deadline = config.deadline();
    let mut tabu = TabuList::new(config.tabu_size);
    let mut moves_evaluated: u64 = 0;

    let mut tours: BTreeMap<Uuid, Vec<Uuid>> =
        assignments.iter().map(|a| (a.staff_id, a.stops.iter().map(|s| s.job_id).collect())).collect();

    loop {
        if past_deadline(deadline, config.overrun_tolerance_ms) {
            break;
        }

        let mut best_move: Option<(i64, Box<dyn FnOnce(&mut BTreeMap<Uuid, Vec<Uuid>>, &mut Vec<UnassignedJob>)>, MoveKey)> = None;

        let staff_ids: Vec<Uuid> = tours.keys().copied().collect();

        // relocate + swap + 2-opt: pairs of staff (including same staff twice for intra-tour moves)
        for &from_staff in &staff_ids {
            if past_deadline(deadline, config.overrun_tolerance_ms) {
                break;
            }
            let from_order = tours[&from_staff].clone();

            for (from_idx, &job_id) in from_order.iter().enumerate() {
                for &to_staff in &staff_ids {
                    let to_order = tours[&to_staff].clone();
                    let insert_range = if to_staff == from_staff { 0..=to_order.len() } else { 0..=to_order.len() };

                    for to_idx in insert_range {
                        if to_staff == from_staff && (to_idx == from_idx || to_idx == from_idx + 1) {
                            continue;
                        }
                        moves_evaluated += 1;
                        let key = (job_id, Uuid::nil());
                        if tabu.contains(&key) {
                            continue;
                        }

                        let delta = relocate_delta(&ctx, &tours, from_staff, from_idx, to_staff, to_idx);
                        if let Some(delta) = delta {
                            if is_better(&best_move, delta) {
                                let (fs, fidx, ts, tidx) = (from_staff, from_idx, to_staff, to_idx);
                                best_move = Some((
                                    delta,
                                    Box::new(move |tours, _unassigned| {
                                        let job = tours.get_mut(&fs).expect("from staff has a tour").remove(fidx);
                                        let insert_at = if ts == fs && tidx > fidx { tidx - 1 } else { tidx };
                                        tours.get_mut(&ts).expect("to staff has a tour").insert(insert_at, job);
                                    }),
                                    key,
                                ));
                            }
                        }
                    }
                }
            }
        }

        // unassign-reinsert: try seating an unassigned job somewhere
        for unassigned_job in unassigned.iter() {
            if past_deadline(deadline, config.overrun_tolerance_ms) {
                break;
            }
            let Some(job) = jobs_by_id.get(&unassigned_job.job_id) else { continue };
            if !job.is_locatable() {
                continue;
            }

            for &staff_id in &staff_ids {
                let Some(staff) = staff_by_id.get(&staff_id) else { continue };
                if !staff.has_equipment(&job.equipment_required) {
                    continue;
                }
                let order = tours[&staff_id].clone();
                for idx in 0..=order.len() {
                    moves_evaluated += 1;
                    let key = (job.job_id, staff_id);
                    if tabu.contains(&key) {
                        continue;
                    }
                    let mut candidate = order.clone();
                    candidate.insert(idx, job.job_id);
                    let (_, score) = ctx.tour_score(staff_id, &candidate);
                    if score.hard == 0 {
                        let delta = score.soft;
                        if is_better(&best_move, delta) {
                            let job_id = job.job_id;
                            best_move = Some((
                                delta,
                                Box::new(move |tours, unassigned| {
                                    tours.get_mut(&staff_id).expect("staff has a tour").insert(idx, job_id);
                                    unassigned.retain(|u| u.job_id != job_id);
                                }),
                                key,
                            ));
                        }
                    }
                }
            }
        }

        match best_move {
            Some((_, apply, key)) => {
                apply(&mut tours, &mut unassigned);
                tabu.push(key);
            }
            None => break,
        }
    }

    let assignments_out: Vec<Assignment> = tours
        .into_iter()
        .map(|(staff_id, order)| {
            let (stops, _) = ctx.tour_score(staff_id, &order);
            Assignment { staff_id, stops }
        })
        .collect();
    assignments.clear();
    assignments.extend(assignments_out);

    (assignments, unassigned, moves_evaluated)
}

fn past_deadline(deadline: Instant, overrun_tolerance_ms: u64) -> bool {
    Instant::now() > deadline + std::time::Duration::from_millis(overrun_tolerance_ms)
}

fn is_better(best: &Option<(i64, Box<dyn FnOnce(&mut BTreeMap<Uuid, Vec<Uuid>>, &mut Vec<UnassignedJob>)>, MoveKey)>, delta: i64) -> bool {
    match best {
        None => true,
        Some((best_delta, _, _)) => delta > *best_delta,
    }
}

/// Soft-score delta (moved tour's soft score) for relocating `from_order[from_idx]`
/// into `to_staff`'s tour at `to_idx`. Returns `None` if either resulting tour
/// would become hard-infeasible.
fn relocate_delta(
    ctx: &Context,
    tours: &BTreeMap<Uuid, Vec<Uuid>>,
    from_staff: Uuid,
    from_idx: usize,
    to_staff: Uuid,
    to_idx: usize,
) -> Option<i64> {
    let mut from_order = tours[&from_staff].clone();
    let job_id = from_order.remove(from_idx);

    if from_staff == to_staff {
        let insert_at = if to_idx > from_idx { to_idx - 1 } else { to_idx };
        let mut order = from_order;
        order.insert(insert_at, job_id);
        let (_, score) = ctx.tour_score(to_staff, &order);
        if score.hard < 0 {
            return None;
        }
        return Some(score.soft);
    }

    let staff = ctx.staff_by_id.get(&to_staff)?;
    let job = ctx.jobs_by_id.get(&job_id)?;
    if !staff.has_equipment(&job.equipment_required) {
        return None;
    }

    let (_, from_score) = ctx.tour_score(from_staff, &from_order);
    if from_score.hard < 0 {
        return None;
    }

    let mut to_order = tours[&to_staff].clone();
    to_order.insert(to_idx, job_id);
    let (_, to_score) = ctx.tour_score(to_staff, &to_order);
    if to_score.hard < 0 {
        return None;
    }

    Some(from_score.soft + to_score.soft)
}
