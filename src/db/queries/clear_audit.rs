//! `schedule_clear_audit` persistence (C8).

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::types::{AuditSummary, ClearAudit, SerializedAppointment};

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    schedule_date: NaiveDate,
    cleared_at: chrono::DateTime<chrono::Utc>,
    cleared_by: Option<Uuid>,
    notes: Option<String>,
    appointments_data: serde_json::Value,
    jobs_reset: serde_json::Value,
    appointment_count: i32,
}

impl AuditRow {
    fn into_audit(self) -> Result<ClearAudit> {
        let appointments_data: Vec<SerializedAppointment> = serde_json::from_value(self.appointments_data)?;
        let jobs_reset: Vec<Uuid> = serde_json::from_value(self.jobs_reset)?;
        Ok(ClearAudit {
            audit_id: self.id,
            schedule_date: self.schedule_date,
            cleared_at: self.cleared_at,
            cleared_by: self.cleared_by,
            notes: self.notes,
            appointments_data,
            jobs_reset,
            appointment_count: self.appointment_count,
        })
    }
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    schedule_date: NaiveDate,
    cleared_by: Option<Uuid>,
    notes: Option<&str>,
    appointments_data: &[SerializedAppointment],
    jobs_reset: &[Uuid],
) -> Result<Uuid> {
    let audit_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO schedule_clear_audit
            (schedule_date, cleared_by, notes, appointments_data, jobs_reset, appointment_count)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(schedule_date)
    .bind(cleared_by)
    .bind(notes)
    .bind(serde_json::to_value(appointments_data)?)
    .bind(serde_json::to_value(jobs_reset)?)
    .bind(appointments_data.len() as i32)
    .fetch_one(&mut **tx)
    .await?;
    Ok(audit_id)
}

/// Deletes an audit row after a successful restore, inside the caller's
/// transaction — restore is a one-shot operation, not a replayable one.
pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, audit_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM schedule_clear_audit WHERE id = $1").bind(audit_id).execute(&mut **tx).await?;
    Ok(())
}

pub async fn get_by_id(pool: &PgPool, audit_id: Uuid) -> Result<Option<ClearAudit>> {
    let row = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT id, schedule_date, cleared_at, cleared_by, notes, appointments_data,
               jobs_reset, appointment_count
        FROM schedule_clear_audit
        WHERE id = $1
        "#,
    )
    .bind(audit_id)
    .fetch_optional(pool)
    .await?;

    row.map(AuditRow::into_audit).transpose()
}

pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<AuditSummary>> {
    let rows = sqlx::query_as::<_, (Uuid, NaiveDate, chrono::DateTime<chrono::Utc>, i32)>(
        r#"
        SELECT id, schedule_date, cleared_at, appointment_count
        FROM schedule_clear_audit
        ORDER BY cleared_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(audit_id, schedule_date, cleared_at, appointment_count)| AuditSummary {
            audit_id,
            schedule_date,
            cleared_at,
            appointment_count,
        })
        .collect())
}
