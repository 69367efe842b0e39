//! Capacity reporter (C9): pure aggregation, no solver involvement.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::db::queries::{appointments, availability, staff};
use crate::types::CapacityResponse;

/// Reports how much of `date`'s staff capacity is already booked.
pub async fn capacity_for_date(pool: &PgPool, date: NaiveDate) -> Result<CapacityResponse> {
    let staff_list = staff::list_eligible_staff(pool).await?;
    let availability_list = availability::list_for_date(pool, date).await?;
    let scheduled_minutes = appointments::scheduled_minutes_for_date(pool, date).await?;

    let available_staff = availability_list.iter().filter(|a| a.available).count() as u32;
    let total_capacity_minutes: u64 =
        availability_list.iter().map(|a| a.available_minutes() as u64).sum();

    let remaining_capacity_minutes = total_capacity_minutes as i64 - scheduled_minutes;

    Ok(CapacityResponse {
        total_staff: staff_list.len() as u32,
        available_staff,
        total_capacity_minutes,
        scheduled_minutes: scheduled_minutes.max(0) as u64,
        remaining_capacity_minutes,
        can_accept_more: remaining_capacity_minutes > 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_accept_more_is_false_when_capacity_is_exhausted() {
        let response = CapacityResponse {
            total_staff: 2,
            available_staff: 2,
            total_capacity_minutes: 480,
            scheduled_minutes: 480,
            remaining_capacity_minutes: 0,
            can_accept_more: 0 > 0,
        };
        assert!(!response.can_accept_more);
    }
}
