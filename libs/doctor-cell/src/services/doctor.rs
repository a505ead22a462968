use std::sync::Arc;

use tracing::debug;

use shared_database::{CollectionPath, Condition, DocumentStore};

use crate::error::DoctorError;
use crate::models::Doctor;

/// Read-only view over the doctor directory.
pub struct DoctorService {
    store: Arc<dyn DocumentStore>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_doctor(&self, doctor_id: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let document = self
            .store
            .get(&CollectionPath::doctors(), doctor_id)
            .await?
            .ok_or_else(|| DoctorError::NotFound(format!("Doctor {} not found", doctor_id)))?;

        Ok(serde_json::from_value(document)?)
    }

    /// Doctors sorted by name, optionally narrowed to one department.
    pub async fn list_doctors(&self, department: Option<&str>) -> Result<Vec<Doctor>, DoctorError> {
        let filter: Vec<Condition> = department
            .map(|d| vec![Condition::eq("department", d)])
            .unwrap_or_default();

        let mut doctors = self
            .store
            .list(&CollectionPath::doctors(), &filter)
            .await?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()?;

        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }
}
