//! Job database queries (C3 snapshot loader, C7 emergency lookup).

use anyhow::Result;
use chrono::{NaiveTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::types::{JobSnapshot, JobStatus, Location, Priority};

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    customer_id: Uuid,
    customer_name: String,
    address: String,
    property_lat: Option<f64>,
    property_lon: Option<f64>,
    city_tag: String,
    job_type: String,
    status: String,
    estimated_duration_minutes: i32,
    buffer_minutes: i32,
    priority_level: i32,
    equipment_required: serde_json::Value,
    staffing_required: i32,
    earliest_start: Option<NaiveTime>,
    latest_finish: Option<NaiveTime>,
    preferred_window_start: Option<NaiveTime>,
    preferred_window_end: Option<NaiveTime>,
    created_at: chrono::DateTime<Utc>,
}

impl JobRow {
    fn into_snapshot(self) -> JobSnapshot {
        let equipment_required: BTreeSet<String> = self
            .equipment_required
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default();

        let property_location =
            match (self.property_lat, self.property_lon) {
                (Some(lat), Some(lon)) => Some(Location::new(lat, lon)),
                _ => None,
            };

        let preferred_window = match (self.preferred_window_start, self.preferred_window_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        };

        JobSnapshot {
            job_id: self.id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            address: self.address,
            property_location,
            city_tag: self.city_tag,
            job_type: self.job_type,
            duration_minutes: self.estimated_duration_minutes.max(0) as u32,
            buffer_minutes: self.buffer_minutes.max(0) as u32,
            priority: Priority::from_i32(self.priority_level),
            equipment_required,
            staffing_required: self.staffing_required.max(1) as u32,
            earliest_start: self.earliest_start,
            latest_finish: self.latest_finish,
            preferred_window,
            status: JobStatus::from_str(&self.status).unwrap_or(JobStatus::Approved),
            created_at: self.created_at,
        }
    }
}

const JOB_COLUMNS: &str = r#"
    id, customer_id, customer_name, address, property_lat, property_lon, city_tag,
    job_type, status, estimated_duration_minutes, buffer_minutes, priority_level,
    equipment_required, staffing_required, earliest_start, latest_finish,
    preferred_window_start, preferred_window_end, created_at
"#;

/// Jobs eligible for scheduling: `approved` status, not yet scheduled.
/// This is the pool the solver's construction heuristic draws from.
pub async fn list_unscheduled(pool: &PgPool) -> Result<Vec<JobSnapshot>> {
    let query = format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE status = 'approved' ORDER BY priority_level DESC, created_at ASC"
    );
    let rows = sqlx::query_as::<_, JobRow>(&query).fetch_all(pool).await?;
    Ok(rows.into_iter().map(JobRow::into_snapshot).collect())
}

/// Jobs eligible for re-optimization: `approved`, plus `scheduled` jobs that
/// already have an appointment on `date` (the day being re-optimized). A
/// `scheduled` job with no appointment on this date belongs to some other
/// day and must not be pulled in.
pub async fn list_for_reoptimize(pool: &PgPool, date: chrono::NaiveDate) -> Result<Vec<JobSnapshot>> {
    let query = format!(
        r#"
        SELECT {JOB_COLUMNS} FROM jobs
        WHERE status = 'approved'
           OR (status = 'scheduled' AND id IN (SELECT job_id FROM appointments WHERE scheduled_date = $1))
        ORDER BY priority_level DESC, created_at ASC
        "#
    );
    let rows = sqlx::query_as::<_, JobRow>(&query).bind(date).fetch_all(pool).await?;
    Ok(rows.into_iter().map(JobRow::into_snapshot).collect())
}

pub async fn get_by_id(pool: &PgPool, job_id: Uuid) -> Result<Option<JobSnapshot>> {
    let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
    let row = sqlx::query_as::<_, JobRow>(&query).bind(job_id).fetch_optional(pool).await?;
    Ok(row.map(JobRow::into_snapshot))
}

pub async fn set_status(pool: &sqlx::PgPool, job_id: Uuid, status: JobStatus) -> Result<()> {
    sqlx::query("UPDATE jobs SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_status_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    job_id: Uuid,
    status: JobStatus,
) -> Result<()> {
    sqlx::query("UPDATE jobs SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(job_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Of `job_ids`, returns only those whose current status is `scheduled`.
/// Used by clear (C8) to scope its job reset to jobs the clear is actually
/// allowed to touch — an in-progress or completed job referenced by one of
/// the cleared appointments must keep its own status.
pub async fn filter_scheduled_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    job_ids: &[Uuid],
) -> Result<Vec<Uuid>> {
    let rows: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM jobs WHERE id = ANY($1) AND status = 'scheduled'")
            .bind(job_ids)
            .fetch_all(&mut **tx)
            .await?;
    Ok(rows)
}

/// Reset a batch of jobs back to `approved`, used by clear/restore (C8).
pub async fn reset_to_approved_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    job_ids: &[Uuid],
) -> Result<u64> {
    let result = sqlx::query("UPDATE jobs SET status = 'approved', updated_at = NOW() WHERE id = ANY($1)")
        .bind(job_ids)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}
