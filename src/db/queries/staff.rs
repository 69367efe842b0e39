//! Staff database queries (C3 snapshot loader).

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::{Location, StaffRole, StaffSnapshot};

#[derive(sqlx::FromRow)]
struct StaffRow {
    id: Uuid,
    name: String,
    role: String,
    home_lat: f64,
    home_lon: f64,
    equipment_owned: serde_json::Value,
    active: bool,
}

impl StaffRow {
    fn into_snapshot(self) -> StaffSnapshot {
        let equipment_owned = self
            .equipment_owned
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default();

        StaffSnapshot {
            staff_id: self.id,
            name: self.name,
            role: StaffRole::from_str(&self.role).unwrap_or(StaffRole::Tech),
            home_location: Location::new(self.home_lat, self.home_lon),
            equipment_owned,
            active: self.active,
        }
    }
}

/// Every eligible (active, dispatchable) staff member, used to build the
/// solver's `SolverInput` for a given date.
pub async fn list_eligible_staff(pool: &PgPool) -> Result<Vec<StaffSnapshot>> {
    let rows = sqlx::query_as::<_, StaffRow>(
        r#"
        SELECT id, name, role, home_lat, home_lon, equipment_owned, active
        FROM staff
        WHERE active = TRUE
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StaffRow::into_snapshot).filter(|s| s.is_eligible()).collect())
}

pub async fn get_staff_name(pool: &PgPool, staff_id: Uuid) -> Result<Option<String>> {
    let row = sqlx::query_scalar::<_, String>("SELECT name FROM staff WHERE id = $1")
        .bind(staff_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
