use chrono::{Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::postgrest::{return_representation, PostgrestClient};

use crate::models::{
    AppointmentDetail, AppointmentError, BookedAppointment, DoctorSnapshot,
    SaveAppointmentRequest, ValidationContext,
};
use crate::services::validation::AvailabilityValidator;

pub struct AppointmentService {
    db: PostgrestClient,
    validator: AvailabilityValidator,
}

const DETAIL_SELECT: &str = "*,patient:patients(id,name),doctor:doctors(id,name,specialty)";

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
            validator: AvailabilityValidator::default(),
        }
    }

    /// All appointments, newest first, with patient and doctor embedded.
    pub async fn list_appointments(&self) -> Result<Vec<AppointmentDetail>, AppointmentError> {
        debug!("Fetching all appointments");

        let path = format!("/appointments?select={}&order=date.desc", DETAIL_SELECT);
        self.fetch_details(&path).await
    }

    /// Appointments from the start of today through the next seven days,
    /// soonest first, capped at ten for the dashboard feed.
    pub async fn upcoming_appointments(&self) -> Result<Vec<AppointmentDetail>, AppointmentError> {
        debug!("Fetching upcoming appointments");

        let start_of_day = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let next_week = start_of_day + Duration::days(7);

        let path = format!(
            "/appointments?select={}&date=gte.{}&date=lt.{}&order=date.asc&limit=10",
            DETAIL_SELECT,
            start_of_day.to_rfc3339(),
            next_week.to_rfc3339()
        );
        self.fetch_details(&path).await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
    ) -> Result<AppointmentDetail, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!(
            "/appointments?id=eq.{}&select={}",
            appointment_id, DETAIL_SELECT
        );
        let mut details = self.fetch_details(&path).await?;

        if details.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(details.remove(0))
    }

    /// Booking flow: validate the candidate against the doctor's schedule and
    /// sibling bookings, then persist. Violations block the write.
    pub async fn create_appointment(
        &self,
        request: SaveAppointmentRequest,
    ) -> Result<AppointmentDetail, AppointmentError> {
        debug!(
            "Booking appointment for patient {} with doctor {} at {}",
            request.patient_id, request.doctor_id, request.date
        );

        self.check_schedule(&request, None).await?;

        let appointment_data = appointment_row(&request);
        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/appointments",
                Some(appointment_data),
                Some(return_representation()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let id = result
            .first()
            .and_then(|row| row["id"].as_i64())
            .ok_or_else(|| {
                AppointmentError::DatabaseError("Failed to create appointment".to_string())
            })?;

        debug!("Appointment created with ID: {}", id);
        self.get_appointment(id).await
    }

    /// Edit flow: the record being edited is excluded from the overlap set so
    /// an unchanged slot does not conflict with itself.
    pub async fn update_appointment(
        &self,
        appointment_id: i64,
        request: SaveAppointmentRequest,
    ) -> Result<AppointmentDetail, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        self.get_appointment(appointment_id).await?;
        self.check_schedule(&request, Some(appointment_id)).await?;

        let path = format!("/appointments?id=eq.{}", appointment_id);
        let _: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(appointment_row(&request)),
                Some(return_representation()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        self.get_appointment(appointment_id).await
    }

    pub async fn delete_appointment(&self, appointment_id: i64) -> Result<(), AppointmentError> {
        debug!("Deleting appointment: {}", appointment_id);

        self.get_appointment(appointment_id).await?;

        let path = format!("/appointments?id=eq.{}", appointment_id);
        let _: Vec<Value> = self
            .db
            .request(Method::DELETE, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Assemble the validation snapshots and run the availability rules.
    async fn check_schedule(
        &self,
        request: &SaveAppointmentRequest,
        exclude_appointment_id: Option<i64>,
    ) -> Result<(), AppointmentError> {
        let doctor = self.get_doctor_snapshot(request.doctor_id).await?;
        let existing = if doctor.is_some() {
            self.get_doctor_bookings(request.doctor_id).await?
        } else {
            vec![]
        };

        let context = ValidationContext {
            doctor: doctor.as_ref(),
            existing_appointments: &existing,
            exclude_appointment_id,
        };

        let violations = self.validator.validate(request, &context);
        if !violations.is_empty() {
            warn!(
                "Scheduling rejected for doctor {}: {} violation(s)",
                request.doctor_id,
                violations.len()
            );
            return Err(AppointmentError::SchedulingRejected(violations));
        }

        Ok(())
    }

    /// Doctor-lookup collaborator: specialty plus weekly windows, or `None`
    /// when the doctor does not exist (validation is then skipped).
    async fn get_doctor_snapshot(
        &self,
        doctor_id: i64,
    ) -> Result<Option<DoctorSnapshot>, AppointmentError> {
        if doctor_id <= 0 {
            return Ok(None);
        }

        let path = format!(
            "/doctors?id=eq.{}&select=id,specialty,schedules:weekly_schedules(day_of_week,start_time,end_time)",
            doctor_id
        );
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            return Ok(None);
        };

        let snapshot: DoctorSnapshot = serde_json::from_value(row).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse doctor: {}", e))
        })?;

        Ok(Some(snapshot))
    }

    /// Appointment-lookup collaborator: the doctor's current bookings used as
    /// the overlap-detection set. This is a snapshot; freshness is ours only
    /// at fetch time.
    async fn get_doctor_bookings(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<BookedAppointment>, AppointmentError> {
        let path = format!(
            "/appointments?doctor_id=eq.{}&select=id,doctor_id,date&order=date.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let bookings = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedAppointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })?;

        Ok(bookings)
    }

    async fn fetch_details(&self, path: &str) -> Result<Vec<AppointmentDetail>, AppointmentError> {
        let result: Vec<Value> = self
            .db
            .request(Method::GET, path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let details = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AppointmentDetail>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })?;

        Ok(details)
    }
}

fn appointment_row(request: &SaveAppointmentRequest) -> Value {
    json!({
        "patient_id": request.patient_id,
        "doctor_id": request.doctor_id,
        "date": request.date.to_rfc3339(),
        "type": request.appointment_type,
        "status": request.status,
        // Optional free text is stored as empty string when absent.
        "description": request.description.clone().unwrap_or_default(),
        "notes": request.notes.clone().unwrap_or_default(),
    })
}
