//! Schedule persister (C6): writes a solver result to `appointments` and
//! flips every scheduled job's status, inside one transaction.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::db::queries::{appointments, jobs};
use crate::types::{Assignment, JobStatus};

/// Replaces `date`'s appointments with `assignments` and marks every
/// scheduled job `scheduled`. All-or-nothing: a failure midway rolls the
/// whole write back, leaving the previous schedule (if any) intact.
pub async fn persist_schedule(pool: &PgPool, date: NaiveDate, assignments: &[Assignment]) -> Result<()> {
    let mut tx = pool.begin().await?;

    appointments::replace_for_date_tx(&mut tx, date, assignments).await?;

    for assignment in assignments {
        for stop in &assignment.stops {
            jobs::set_status_tx(&mut tx, stop.job_id, JobStatus::Scheduled).await?;
        }
    }

    tx.commit().await?;
    Ok(())
}
