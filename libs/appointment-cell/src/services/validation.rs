use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use tracing::debug;

use crate::models::{
    SaveAppointmentRequest, ScheduleViolation, ValidationContext, ViolationKind,
};

/// Every appointment occupies exactly this many minutes starting at its date.
pub const APPOINTMENT_DURATION_MINUTES: i64 = 30;

/// Which specialties may double-book. General practitioners historically may;
/// kept as a policy value rather than a hardcoded comparison so the rule can
/// be revisited without code changes.
#[derive(Debug, Clone)]
pub struct OverbookPolicy {
    exempt_specialties: Vec<String>,
}

impl Default for OverbookPolicy {
    fn default() -> Self {
        Self {
            exempt_specialties: vec!["GENERAL".to_string()],
        }
    }
}

impl OverbookPolicy {
    pub fn new(exempt_specialties: Vec<String>) -> Self {
        Self { exempt_specialties }
    }

    pub fn allows_double_booking(&self, specialty: &str) -> bool {
        self.exempt_specialties.iter().any(|s| s == specialty)
    }
}

/// Pure rule engine deciding whether a candidate appointment is admissible
/// against the selected doctor's weekly windows and existing bookings.
///
/// The validator performs no I/O and holds no state across calls: identical
/// candidate/context/instant always produce the identical verdict. Because it
/// judges snapshots, the authoritative conflict guarantee stays with the
/// storage layer.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityValidator {
    policy: OverbookPolicy,
}

impl AvailabilityValidator {
    pub fn new(policy: OverbookPolicy) -> Self {
        Self { policy }
    }

    /// Validate against the current wall clock. The past-date rule is
    /// time-dependent, so verdicts must never be memoized.
    pub fn validate(
        &self,
        candidate: &SaveAppointmentRequest,
        context: &ValidationContext<'_>,
    ) -> Vec<ScheduleViolation> {
        self.validate_at(candidate, context, Utc::now())
    }

    /// Validate as of an explicit instant. Empty result means admissible.
    pub fn validate_at(
        &self,
        candidate: &SaveAppointmentRequest,
        context: &ValidationContext<'_>,
        now: DateTime<Utc>,
    ) -> Vec<ScheduleViolation> {
        // No doctor selected yet: nothing to validate against.
        if candidate.doctor_id <= 0 {
            return Vec::new();
        }

        // Doctor unresolvable: cannot yet validate, not invalid.
        let Some(doctor) = context.doctor else {
            debug!(
                "Skipping schedule validation, doctor {} not resolvable",
                candidate.doctor_id
            );
            return Vec::new();
        };

        let mut violations = Vec::new();

        if candidate.date < now {
            violations.push(ScheduleViolation::new(
                ViolationKind::PastDate,
                "date",
                "appointment date cannot be in the past",
            ));
        }

        let day_of_week = day_of_week_index(candidate.date);
        let day_windows: Vec<_> = doctor
            .schedules
            .iter()
            .filter(|w| w.day_of_week == day_of_week)
            .collect();

        if day_windows.is_empty() {
            violations.push(ScheduleViolation::new(
                ViolationKind::DayUnavailable,
                "date",
                "doctor does not see patients this day",
            ));
            // No window to test the time against, and overlap detection is
            // meaningless outside the doctor's week.
            return violations;
        }

        // A doctor may run several windows on the same day (morning and
        // afternoon clinics); the candidate is in range if any window
        // contains it, bounds inclusive.
        let date = candidate.date.date_naive();
        let within_some_window = day_windows.iter().any(|window| {
            let window_start = date.and_time(window.start_time).and_utc();
            let window_end = date.and_time(window.end_time).and_utc();
            candidate.date >= window_start && candidate.date <= window_end
        });

        if !within_some_window {
            violations.push(ScheduleViolation::new(
                ViolationKind::TimeOutsideWindow,
                "date",
                "selected time is outside the doctor's availability window",
            ));
            return violations;
        }

        if self.policy.allows_double_booking(&doctor.specialty) {
            return violations;
        }

        let start = candidate.date;
        let end = start + Duration::minutes(APPOINTMENT_DURATION_MINUTES);

        for existing in context.existing_appointments {
            if existing.doctor_id != candidate.doctor_id {
                continue;
            }
            if context.exclude_appointment_id == Some(existing.id) {
                continue;
            }

            let existing_start = existing.date;
            let existing_end = existing_start + Duration::minutes(APPOINTMENT_DURATION_MINUTES);

            let overlaps = (start >= existing_start && start < existing_end)
                || (end > existing_start && end <= existing_end)
                || (start <= existing_start && end >= existing_end);

            if overlaps {
                debug!(
                    "Slot conflict for doctor {} at {}: existing appointment {}",
                    candidate.doctor_id, candidate.date, existing.id
                );
                violations.push(ScheduleViolation::new(
                    ViolationKind::SlotConflict,
                    "date",
                    "an appointment is already scheduled for this time slot",
                ));
                // One conflict is enough to block the slot.
                break;
            }
        }

        violations
    }
}

/// 0 = Sunday .. 6 = Saturday, matching how schedule windows are stored.
fn day_of_week_index(date: DateTime<Utc>) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}
