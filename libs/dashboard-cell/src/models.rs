use serde::{Deserialize, Serialize};

/// Counters shown on the admin landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_doctors: i64,
    pub total_patients: i64,
    /// Appointments created since the start of today.
    pub new_appointments: i64,
    /// Appointments scheduled for today.
    pub today_appointments: i64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DashboardError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
