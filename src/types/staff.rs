//! Staff snapshot: a dispatchable technician and their home base.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::job::EquipmentTag;
use super::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Tech,
    Sales,
    Admin,
}

impl StaffRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StaffRole::Tech => "tech",
            StaffRole::Sales => "sales",
            StaffRole::Admin => "admin",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "tech" => Some(StaffRole::Tech),
            "sales" => Some(StaffRole::Sales),
            "admin" => Some(StaffRole::Admin),
            _ => None,
        }
    }

    /// Only techs are dispatchable by default (spec §3).
    pub fn is_dispatchable(self) -> bool {
        matches!(self, StaffRole::Tech)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffSnapshot {
    pub staff_id: Uuid,
    pub name: String,
    pub role: StaffRole,
    pub home_location: Location,
    pub equipment_owned: BTreeSet<EquipmentTag>,
    pub active: bool,
}

impl StaffSnapshot {
    pub fn has_equipment(&self, required: &BTreeSet<EquipmentTag>) -> bool {
        required.is_subset(&self.equipment_owned)
    }

    pub fn is_eligible(&self) -> bool {
        self.active && self.role.is_dispatchable()
    }
}
