use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::postgrest::{return_representation, PostgrestClient};

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorError, UpdateDoctorRequest, WeeklySchedule,
    WeeklyScheduleInput,
};

pub struct DoctorService {
    db: PostgrestClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// List all doctors with their weekly schedule windows embedded.
    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Fetching all doctors");

        let path = "/doctors?select=*,schedules:weekly_schedules(*)&order=name.asc";
        let result: Vec<Value> = self
            .db
            .request(Method::GET, path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!(
            "/doctors?id=eq.{}&select=*,schedules:weekly_schedules(*)",
            doctor_id
        );
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let first = result.into_iter().next().ok_or(DoctorError::NotFound)?;
        let doctor: Doctor = serde_json::from_value(first)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor: {}", request.email);

        validate_doctor_fields(
            &request.name,
            &request.email,
            &request.phone,
            &request.license,
            &request.specialty,
        )?;
        validate_schedule_windows(&request.schedules)?;

        if self.email_exists(&request.email, None).await? {
            return Err(DoctorError::EmailTaken);
        }

        let doctor_data = json!({
            "name": request.name,
            "email": request.email,
            "phone": request.phone,
            "license": request.license,
            "specialty": request.specialty,
        });

        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/doctors",
                Some(doctor_data),
                Some(return_representation()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let first = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor".to_string()))?;
        let mut doctor: Doctor = serde_json::from_value(first)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        doctor.schedules = self
            .replace_schedules(doctor.id, &request.schedules)
            .await?;

        debug!("Doctor created with ID: {}", doctor.id);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: i64,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor: {}", doctor_id);

        let existing = self.get_doctor(doctor_id).await?;

        if let Some(ref schedules) = request.schedules {
            validate_schedule_windows(schedules)?;
        }

        // Reject an email change that collides with another doctor.
        if let Some(ref email) = request.email {
            if *email != existing.email && self.email_exists(email, Some(doctor_id)).await? {
                return Err(DoctorError::EmailTaken);
            }
        }

        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(license) = request.license {
            update_data.insert("license".to_string(), json!(license));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }

        let mut doctor = if update_data.is_empty() {
            existing
        } else {
            let path = format!("/doctors?id=eq.{}", doctor_id);
            let result: Vec<Value> = self
                .db
                .request_with_headers(
                    Method::PATCH,
                    &path,
                    Some(Value::Object(update_data)),
                    Some(return_representation()),
                )
                .await
                .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

            let first = result.into_iter().next().ok_or(DoctorError::NotFound)?;
            serde_json::from_value(first)
                .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?
        };

        if let Some(schedules) = request.schedules {
            doctor.schedules = self.replace_schedules(doctor_id, &schedules).await?;
        } else {
            doctor.schedules = self.get_schedules(doctor_id).await?;
        }

        Ok(doctor)
    }

    pub async fn delete_doctor(&self, doctor_id: i64) -> Result<(), DoctorError> {
        debug!("Deleting doctor: {}", doctor_id);

        // Confirm existence first so callers get a 404 rather than a silent no-op.
        self.get_doctor(doctor_id).await?;

        let schedules_path = format!("/weekly_schedules?doctor_id=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .db
            .request(Method::DELETE, &schedules_path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let path = format!("/doctors?id=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .db
            .request(Method::DELETE, &path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Fetch the doctor's recurring windows, ordered for stable display.
    pub async fn get_schedules(&self, doctor_id: i64) -> Result<Vec<WeeklySchedule>, DoctorError> {
        let path = format!(
            "/weekly_schedules?doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let schedules = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<WeeklySchedule>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse schedules: {}", e)))?;

        Ok(schedules)
    }

    /// Replace-then-recreate: delete every window the doctor owns, then insert
    /// the new set. Contradictory windows within the set are the caller's
    /// responsibility.
    async fn replace_schedules(
        &self,
        doctor_id: i64,
        schedules: &[WeeklyScheduleInput],
    ) -> Result<Vec<WeeklySchedule>, DoctorError> {
        let delete_path = format!("/weekly_schedules?doctor_id=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .db
            .request(Method::DELETE, &delete_path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if schedules.is_empty() {
            return Ok(vec![]);
        }

        let rows: Vec<Value> = schedules
            .iter()
            .map(|s| {
                json!({
                    "doctor_id": doctor_id,
                    "day_of_week": s.day_of_week,
                    "start_time": s.start_time.format("%H:%M:%S").to_string(),
                    "end_time": s.end_time.format("%H:%M:%S").to_string(),
                })
            })
            .collect();

        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/weekly_schedules",
                Some(Value::Array(rows)),
                Some(return_representation()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let created = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<WeeklySchedule>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse schedules: {}", e)))?;

        Ok(created)
    }

    async fn email_exists(
        &self,
        email: &str,
        exclude_doctor_id: Option<i64>,
    ) -> Result<bool, DoctorError> {
        let mut path = format!("/doctors?email=eq.{}&select=id", email);
        if let Some(id) = exclude_doctor_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }
}

fn validate_doctor_fields(
    name: &str,
    email: &str,
    phone: &str,
    license: &str,
    specialty: &str,
) -> Result<(), DoctorError> {
    if name.trim().is_empty() {
        return Err(DoctorError::ValidationError("Name is required".to_string()));
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(DoctorError::ValidationError(
            "A valid email is required".to_string(),
        ));
    }
    if phone.trim().is_empty() {
        return Err(DoctorError::ValidationError(
            "Phone is required".to_string(),
        ));
    }
    if license.trim().is_empty() {
        return Err(DoctorError::ValidationError(
            "License is required".to_string(),
        ));
    }
    if specialty.trim().is_empty() {
        return Err(DoctorError::ValidationError(
            "Specialty is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_schedule_windows(schedules: &[WeeklyScheduleInput]) -> Result<(), DoctorError> {
    for window in schedules {
        if window.day_of_week < 0 || window.day_of_week > 6 {
            return Err(DoctorError::ValidationError(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if window.start_time >= window.end_time {
            return Err(DoctorError::ValidationError(
                "End time must be after start time".to_string(),
            ));
        }
    }
    Ok(())
}
