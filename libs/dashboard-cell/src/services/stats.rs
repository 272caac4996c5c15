use chrono::{Duration, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{DashboardError, DashboardStats};

pub struct DashboardService {
    db: PostgrestClient,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn get_stats(&self) -> Result<DashboardStats, DashboardError> {
        debug!("Computing dashboard counters");

        let start_of_day = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let tomorrow = start_of_day + Duration::days(1);

        let total_doctors = self.count_rows("/doctors?select=id").await?;
        let total_patients = self.count_rows("/patients?select=id").await?;
        let new_appointments = self
            .count_rows(&format!(
                "/appointments?select=id&created_at=gte.{}&created_at=lt.{}",
                start_of_day.to_rfc3339(),
                tomorrow.to_rfc3339()
            ))
            .await?;
        let today_appointments = self
            .count_rows(&format!(
                "/appointments?select=id&date=gte.{}&date=lt.{}",
                start_of_day.to_rfc3339(),
                tomorrow.to_rfc3339()
            ))
            .await?;

        Ok(DashboardStats {
            total_doctors,
            total_patients,
            new_appointments,
            today_appointments,
        })
    }

    async fn count_rows(&self, path: &str) -> Result<i64, DashboardError> {
        let result: Vec<Value> = self
            .db
            .request(Method::GET, path, None)
            .await
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))?;

        Ok(result.len() as i64)
    }
}
