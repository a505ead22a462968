use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_database::{CollectionPath, Condition, DatabaseError, DocumentStore};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, NewAppointment, ParticipantRole};
use crate::services::validation::validate_appointment_input;

/// CRUD and status updates over the flat appointment collection. Knows
/// nothing about slots.
pub struct AppointmentService {
    store: Arc<dyn DocumentStore>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let document = self
            .store
            .get(&CollectionPath::appointments(), appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {} not found", appointment_id)))?;

        Ok(serde_json::from_value(document)?)
    }

    /// Every appointment of one participant, most recent `(date, time)` first.
    pub async fn list_for(&self, participant_id: &str, role: ParticipantRole) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for {:?} {}", role, participant_id);

        let filter = [Condition::eq(role.field(), participant_id)];
        let mut appointments = self
            .store
            .list(&CollectionPath::appointments(), &filter)
            .await?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()?;

        sort_appointments(&mut appointments);
        Ok(appointments)
    }

    pub async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let details = validate_appointment_input(&new.input)?;
        let now = Utc::now().to_rfc3339();

        let appointment_data = json!({
            "doctorId": new.doctor_id,
            "patientId": new.patient_id,
            "doctorName": new.doctor_name,
            "patientName": details.patient_name,
            "patientEmail": details.patient_email,
            "patientPhone": details.patient_phone,
            "department": new.department,
            "date": new.date,
            "time": new.time,
            "slotId": new.slot_id,
            "reason": details.reason,
            "status": AppointmentStatus::Pending,
            "createdAt": now,
            "updatedAt": now
        });

        let appointment_id = self
            .store
            .create(&CollectionPath::appointments(), appointment_data)
            .await?;

        info!(
            "Appointment {} created for patient {} with doctor {}",
            appointment_id, new.patient_id, new.doctor_id
        );
        self.get(&appointment_id).await
    }

    /// Set the status, but only while the stored status is still `expected`.
    /// A lost race surfaces as `DatabaseError::PreconditionFailed`. Transition
    /// rules live with the caller.
    pub async fn update_status(
        &self,
        appointment_id: &str,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        match self
            .store
            .update_if(
                &CollectionPath::appointments(),
                appointment_id,
                &[status_guard(expected)],
                status_patch(status),
            )
            .await
        {
            Ok(()) => {
                info!("Appointment {} status set to {}", appointment_id, status);
                Ok(())
            }
            Err(DatabaseError::NotFound { .. }) => Err(AppointmentError::NotFound(format!(
                "Appointment {} not found",
                appointment_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the record. Does not touch the slot it booked.
    pub async fn delete(&self, appointment_id: &str) -> Result<(), AppointmentError> {
        match self.store.delete(&CollectionPath::appointments(), appointment_id).await {
            Ok(()) => {
                info!("Appointment {} deleted", appointment_id);
                Ok(())
            }
            Err(DatabaseError::NotFound { .. }) => Err(AppointmentError::NotFound(format!(
                "Appointment {} not found",
                appointment_id
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

pub(crate) fn status_guard(status: AppointmentStatus) -> Condition {
    Condition::eq("status", status.to_string())
}

pub(crate) fn status_patch(status: AppointmentStatus) -> Value {
    json!({
        "status": status,
        "updatedAt": Utc::now().to_rfc3339()
    })
}

/// Descending by `(date, time)`.
pub fn sort_appointments(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| (&b.date, &b.time).cmp(&(&a.date, &a.time)));
}
