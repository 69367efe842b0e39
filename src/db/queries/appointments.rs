//! Appointment persistence (C6 persister, C8 clear/restore, C9 capacity).

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, Timelike};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::types::{Assignment, SerializedAppointment, StopPlan};

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    job_id: Uuid,
    staff_id: Uuid,
    scheduled_date: NaiveDate,
    time_window_start: NaiveTime,
    time_window_end: NaiveTime,
    status: String,
    route_order: Option<i32>,
    estimated_arrival: Option<NaiveTime>,
}

impl AppointmentRow {
    fn into_serialized(self) -> SerializedAppointment {
        SerializedAppointment {
            id: self.id,
            job_id: self.job_id,
            staff_id: self.staff_id,
            scheduled_date: self.scheduled_date,
            time_window_start: self.time_window_start.format("%H:%M:%S").to_string(),
            time_window_end: self.time_window_end.format("%H:%M:%S").to_string(),
            status: self.status,
            route_order: self.route_order,
            estimated_arrival: self.estimated_arrival.map(|t| t.format("%H:%M:%S").to_string()),
        }
    }
}

fn minutes_to_time(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 0).unwrap())
}

/// All appointments persisted for `date`, across every staff member.
pub async fn list_for_date(pool: &PgPool, date: NaiveDate) -> Result<Vec<SerializedAppointment>> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT id, job_id, staff_id, scheduled_date, time_window_start, time_window_end,
               status, route_order, estimated_arrival
        FROM appointments
        WHERE scheduled_date = $1
        ORDER BY staff_id, route_order NULLS LAST
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AppointmentRow::into_serialized).collect())
}

/// The persisted tours that a re-optimize is allowed to touch: one
/// `Assignment` per staff member, built from appointments whose job is
/// currently `scheduled`, ordered by `route_order`. In-progress/completed
/// stops never enter this set, so the solver can never see or move them.
pub async fn list_scheduled_assignments_for_date(pool: &PgPool, date: NaiveDate) -> Result<Vec<Assignment>> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT a.id, a.job_id, a.staff_id, a.scheduled_date, a.time_window_start, a.time_window_end,
               a.status, a.route_order, a.estimated_arrival
        FROM appointments a
        JOIN jobs j ON j.id = a.job_id
        WHERE a.scheduled_date = $1 AND j.status = 'scheduled'
        ORDER BY a.staff_id, a.route_order NULLS LAST
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    let mut by_staff: BTreeMap<Uuid, Vec<StopPlan>> = BTreeMap::new();
    for row in rows {
        let start = row.time_window_start.hour() * 60 + row.time_window_start.minute();
        let end = row.time_window_end.hour() * 60 + row.time_window_end.minute();
        let arrive = row.estimated_arrival.map(|t| t.hour() * 60 + t.minute()).unwrap_or(start);
        by_staff.entry(row.staff_id).or_default().push(StopPlan {
            job_id: row.job_id,
            arrive_minute: arrive,
            start_minute: start,
            end_minute: end,
            travel_minute_from_prev: 0,
        });
    }

    Ok(by_staff.into_iter().map(|(staff_id, stops)| Assignment { staff_id, stops }).collect())
}

/// Replaces every appointment for `date` with the solver's fresh result.
/// Runs inside the caller's transaction (C6's `pool.begin()` → commit idiom).
/// Only appointments whose job is currently `scheduled` are cleared first —
/// a stop whose job has moved on to `in_progress`/`completed` out of band is
/// left untouched, per the persister's "in-progress/completed are untouched"
/// rule.
pub async fn replace_for_date_tx(
    tx: &mut Transaction<'_, Postgres>,
    date: NaiveDate,
    assignments: &[Assignment],
) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM appointments
        USING jobs
        WHERE appointments.job_id = jobs.id
          AND appointments.scheduled_date = $1
          AND jobs.status = 'scheduled'
        "#,
    )
    .bind(date)
    .execute(&mut **tx)
    .await?;

    for assignment in assignments {
        for (order, stop) in assignment.stops.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO appointments
                    (job_id, staff_id, scheduled_date, time_window_start, time_window_end,
                     status, route_order, estimated_arrival)
                VALUES ($1, $2, $3, $4, $5, 'scheduled', $6, $7)
                "#,
            )
            .bind(stop.job_id)
            .bind(assignment.staff_id)
            .bind(date)
            .bind(minutes_to_time(stop.start_minute))
            .bind(minutes_to_time(stop.end_minute))
            .bind(order as i32)
            .bind(minutes_to_time(stop.arrive_minute))
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

/// Deletes and returns every appointment for `date`, regardless of status
/// (C8 clear). Unlike `replace_for_date_tx`, this intentionally does not
/// filter by job status: a clear wipes the whole day, in-progress and
/// completed stops included, and the audit row is what makes that
/// reversible.
pub async fn delete_for_date_tx(
    tx: &mut Transaction<'_, Postgres>,
    date: NaiveDate,
) -> Result<Vec<SerializedAppointment>> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"
        DELETE FROM appointments
        WHERE scheduled_date = $1
        RETURNING id, job_id, staff_id, scheduled_date, time_window_start, time_window_end,
                  status, route_order, estimated_arrival
        "#,
    )
    .bind(date)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(AppointmentRow::into_serialized).collect())
}

/// Re-inserts a previously serialized batch of appointments (C8 restore).
/// Skips rows whose referenced job no longer exists, logging the skip —
/// partial restores succeed overall, per spec's error policy.
pub async fn restore_serialized_tx(
    tx: &mut Transaction<'_, Postgres>,
    appointments: &[SerializedAppointment],
) -> Result<u64> {
    let mut restored = 0u64;
    for appt in appointments {
        let start = NaiveTime::parse_from_str(&appt.time_window_start, "%H:%M:%S")?;
        let end = NaiveTime::parse_from_str(&appt.time_window_end, "%H:%M:%S")?;
        let arrival = appt
            .estimated_arrival
            .as_deref()
            .map(|s| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO appointments
                (id, job_id, staff_id, scheduled_date, time_window_start, time_window_end,
                 status, route_order, estimated_arrival)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(appt.id)
        .bind(appt.job_id)
        .bind(appt.staff_id)
        .bind(appt.scheduled_date)
        .bind(start)
        .bind(end)
        .bind(&appt.status)
        .bind(appt.route_order)
        .bind(arrival)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() > 0 {
            restored += 1;
        } else {
            tracing::warn!(appointment_id = %appt.id, "skipped restoring appointment, job no longer exists or id conflict");
        }
    }
    Ok(restored)
}

/// Total scheduled minutes for `date`, `job.duration + job.buffer` per
/// appointment, used by the capacity reporter (C9).
pub async fn scheduled_minutes_for_date(pool: &PgPool, date: NaiveDate) -> Result<i64> {
    let total: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(j.estimated_duration_minutes + j.buffer_minutes), 0)
        FROM appointments a
        JOIN jobs j ON j.id = a.job_id
        WHERE a.scheduled_date = $1
        "#,
    )
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(total.unwrap_or(0))
}
