//! Database queries

pub mod appointments;
pub mod availability;
pub mod clear_audit;
pub mod jobs;
pub mod staff;
