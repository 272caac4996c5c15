use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_models::error::FieldError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRef {
    pub id: i64,
    pub name: String,
    pub specialty: String,
}

/// Appointment row with the patient and doctor it references embedded,
/// as the table and dashboard views consume it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetail {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub patient: PatientRef,
    pub doctor: DoctorRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentType {
    General,
    Specialist,
    Emergency,
    FollowUp,
    Other,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::General => write!(f, "GENERAL"),
            AppointmentType::Specialist => write!(f, "SPECIALIST"),
            AppointmentType::Emergency => write!(f, "EMERGENCY"),
            AppointmentType::FollowUp => write!(f, "FOLLOW_UP"),
            AppointmentType::Other => write!(f, "OTHER"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Payload shared by the booking flow (POST) and the edit flow (PUT). The
/// edit flow re-runs scheduling validation with the edited record excluded
/// from the overlap set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub description: Option<String>,
    pub notes: Option<String>,
}

// ==============================================================================
// VALIDATION SNAPSHOT MODELS
// ==============================================================================
// The validator is pure: it only sees snapshots the caller fetched. Freshness
// of these snapshots is the caller's responsibility; two racing bookings can
// both pass against stale data, so the storage layer remains the authority.

/// One recurring weekly availability window of the selected doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleWindow {
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// The slice of the doctor record scheduling rules depend on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSnapshot {
    pub id: i64,
    pub specialty: String,
    #[serde(default)]
    pub schedules: Vec<ScheduleWindow>,
}

/// An already-booked appointment, reduced to what overlap detection needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedAppointment {
    pub id: i64,
    pub doctor_id: i64,
    pub date: DateTime<Utc>,
}

/// Everything the validator consults besides the candidate itself.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    /// `None` means the doctor could not be resolved; validation is skipped
    /// (cannot yet validate, not invalid).
    pub doctor: Option<&'a DoctorSnapshot>,
    pub existing_appointments: &'a [BookedAppointment],
    /// Set by the edit flow to the id of the record being edited.
    pub exclude_appointment_id: Option<i64>,
}

// ==============================================================================
// VIOLATIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    PastDate,
    DayUnavailable,
    TimeOutsideWindow,
    SlotConflict,
}

/// A scheduling rule finding, attached to the form field it should be
/// displayed next to. All findings are user-correctable; none are faults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleViolation {
    pub kind: ViolationKind,
    pub field: String,
    pub message: String,
}

impl ScheduleViolation {
    pub fn new(kind: ViolationKind, field: &str, message: &str) -> Self {
        Self {
            kind,
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<ScheduleViolation> for FieldError {
    fn from(violation: ScheduleViolation) -> Self {
        FieldError::new(violation.field, violation.message)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Scheduling rejected with {} violation(s)", .0.len())]
    SchedulingRejected(Vec<ScheduleViolation>),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
