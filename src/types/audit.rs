//! Clear/restore audit record (C8).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One serialized appointment row, sufficient to recreate it on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedAppointment {
    pub id: Uuid,
    pub job_id: Uuid,
    pub staff_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub time_window_start: String,
    pub time_window_end: String,
    pub status: String,
    pub route_order: Option<i32>,
    pub estimated_arrival: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearAudit {
    pub audit_id: Uuid,
    pub schedule_date: NaiveDate,
    pub cleared_at: DateTime<Utc>,
    pub cleared_by: Option<Uuid>,
    pub notes: Option<String>,
    pub appointments_data: Vec<SerializedAppointment>,
    pub jobs_reset: Vec<Uuid>,
    pub appointment_count: i32,
}
