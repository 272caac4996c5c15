use chrono::{Datelike, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::postgrest::{return_representation, PostgrestClient};

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

/// Admissions rule carried over from the clinic's intake policy: this is a
/// geriatric practice, patients must be at least 60.
const MINIMUM_PATIENT_AGE: i32 = 60;

pub struct PatientService {
    db: PostgrestClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        debug!("Fetching all patients");

        let result: Vec<Value> = self
            .db
            .request(Method::GET, "/patients?order=name.asc", None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let patients = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Patient>, _>>()
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patients: {}", e)))?;

        Ok(patients)
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let first = result.into_iter().next().ok_or(PatientError::NotFound)?;
        let patient: Patient = serde_json::from_value(first)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))?;

        Ok(patient)
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient: {}", request.email);

        validate_patient_fields(&request.name, &request.email, &request.phone)?;
        validate_date_of_birth(request.date_of_birth)?;

        let patient_data = json!({
            "name": request.name,
            "email": request.email,
            "phone": request.phone,
            "license": request.license,
            "date_of_birth": request.date_of_birth,
            "address": request.address,
            "blood_type": request.blood_type,
            "allergies": request.allergies,
            "medical_history": request.medical_history,
        });

        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/patients",
                Some(patient_data),
                Some(return_representation()),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let first = result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient".to_string()))?;
        let patient: Patient = serde_json::from_value(first)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))?;

        debug!("Patient created with ID: {}", patient.id);
        Ok(patient)
    }

    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient: {}", patient_id);

        // Existence check so a missing record surfaces as 404.
        self.get_patient(patient_id).await?;

        if let Some(dob) = request.date_of_birth {
            validate_date_of_birth(dob)?;
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
        if let Some(dob) = request.date_of_birth {
            update_data.insert("date_of_birth".to_string(), json!(dob));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(blood_type) = request.blood_type {
            update_data.insert("blood_type".to_string(), json!(blood_type));
        }
        if let Some(allergies) = request.allergies {
            update_data.insert("allergies".to_string(), json!(allergies));
        }
        if let Some(history) = request.medical_history {
            update_data.insert("medical_history".to_string(), json!(history));
        }

        let path = format!("/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update_data)),
                Some(return_representation()),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let first = result.into_iter().next().ok_or(PatientError::NotFound)?;
        let patient: Patient = serde_json::from_value(first)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))?;

        Ok(patient)
    }

    pub async fn delete_patient(&self, patient_id: i64) -> Result<(), PatientError> {
        debug!("Deleting patient: {}", patient_id);

        self.get_patient(patient_id).await?;

        let path = format!("/patients?id=eq.{}", patient_id);
        let _: Vec<Value> = self
            .db
            .request(Method::DELETE, &path, None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

fn validate_patient_fields(name: &str, email: &str, phone: &str) -> Result<(), PatientError> {
    if name.trim().is_empty() {
        return Err(PatientError::ValidationError(
            "Name is required".to_string(),
        ));
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(PatientError::ValidationError(
            "A valid email is required".to_string(),
        ));
    }
    if phone.trim().is_empty() {
        return Err(PatientError::ValidationError(
            "Phone is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_date_of_birth(date_of_birth: NaiveDate) -> Result<(), PatientError> {
    let today = Utc::now().date_naive();

    if date_of_birth > today {
        return Err(PatientError::ValidationError(
            "Date of birth cannot be in the future".to_string(),
        ));
    }

    if age_on(date_of_birth, today) < MINIMUM_PATIENT_AGE {
        return Err(PatientError::ValidationError(format!(
            "Patient must be at least {} years old",
            MINIMUM_PATIENT_AGE
        )));
    }

    Ok(())
}

fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}
