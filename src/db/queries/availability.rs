//! Staff availability queries (C2/C3).

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::AvailabilityEntry;

#[derive(sqlx::FromRow)]
struct AvailabilityRow {
    staff_id: Uuid,
    start_time: chrono::NaiveTime,
    end_time: chrono::NaiveTime,
    is_available: bool,
    lunch_start: Option<chrono::NaiveTime>,
    lunch_duration_minutes: Option<i32>,
}

/// Availability rows for every active, tech-role staff member on `date`,
/// skipping rows whose window fails validation (logged, not propagated — a
/// malformed row is treated the same as "not available"). Joined against
/// `staff` so an inactive or non-tech staff member's leftover availability
/// row never counts toward capacity or enters the solver.
pub async fn list_for_date(pool: &PgPool, date: NaiveDate) -> Result<Vec<AvailabilityEntry>> {
    let rows = sqlx::query_as::<_, AvailabilityRow>(
        r#"
        SELECT sa.staff_id, sa.start_time, sa.end_time, sa.is_available, sa.lunch_start, sa.lunch_duration_minutes
        FROM staff_availability sa
        JOIN staff s ON s.id = sa.staff_id
        WHERE sa.date = $1 AND s.active = TRUE AND s.role = 'tech'
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        match AvailabilityEntry::new(
            row.staff_id,
            row.is_available,
            row.start_time,
            row.end_time,
            row.lunch_start,
            row.lunch_duration_minutes.unwrap_or(0).max(0) as u32,
        ) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(staff_id = %row.staff_id, error = %err, "skipping invalid availability row");
            }
        }
    }
    Ok(entries)
}
