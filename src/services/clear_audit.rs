//! Clear/restore with audit trail (C8). Grounded directly on
//! `original_source`'s `schedule_clear_service.py`: clearing a day's
//! schedule records exactly what was removed so it can be restored intact.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries::{appointments, clear_audit, jobs};
use crate::types::{AuditSummary, ClearAudit};

/// Deletes every appointment for `date` (every status — restorable in full),
/// resets back to `approved` only the jobs that were currently `scheduled`,
/// and records a restorable audit row — all in one transaction.
pub async fn clear(
    pool: &PgPool,
    schedule_date: NaiveDate,
    cleared_by: Option<Uuid>,
    notes: Option<&str>,
) -> Result<(Uuid, u64, u64)> {
    let mut tx = pool.begin().await?;

    let removed = appointments::delete_for_date_tx(&mut tx, schedule_date).await?;
    let referenced_job_ids: Vec<Uuid> = removed.iter().map(|a| a.job_id).collect::<BTreeSet<_>>().into_iter().collect();
    let scheduled_job_ids = jobs::filter_scheduled_tx(&mut tx, &referenced_job_ids).await?;
    let jobs_reset = jobs::reset_to_approved_tx(&mut tx, &scheduled_job_ids).await?;

    let audit_id =
        clear_audit::insert_tx(&mut tx, schedule_date, cleared_by, notes, &removed, &scheduled_job_ids).await?;

    tx.commit().await?;
    Ok((audit_id, removed.len() as u64, jobs_reset))
}

/// Re-inserts a previously cleared day's appointments, re-marks their jobs
/// `scheduled`, and deletes the audit row — a restore is one-shot, a second
/// call against the same `audit_id` returns `None` since the row is gone.
pub async fn restore(pool: &PgPool, audit_id: Uuid) -> Result<Option<(u64, u64)>> {
    let mut tx = pool.begin().await?;

    let Some(audit) = clear_audit::get_by_id(pool, audit_id).await? else {
        return Ok(None);
    };

    let restored = appointments::restore_serialized_tx(&mut tx, &audit.appointments_data).await?;

    let mut jobs_updated = 0u64;
    for job_id in &audit.jobs_reset {
        jobs::set_status_tx(&mut tx, *job_id, crate::types::JobStatus::Scheduled).await?;
        jobs_updated += 1;
    }

    clear_audit::delete_tx(&mut tx, audit_id).await?;

    tx.commit().await?;
    Ok(Some((restored, jobs_updated)))
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<AuditSummary>> {
    clear_audit::list_recent(pool, limit).await
}

pub async fn detail(pool: &PgPool, audit_id: Uuid) -> Result<Option<ClearAudit>> {
    clear_audit::get_by_id(pool, audit_id).await
}
