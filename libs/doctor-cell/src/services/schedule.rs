use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_database::{CollectionPath, Condition, DatabaseError, DocumentStore, WriteOp};

use crate::error::DoctorError;
use crate::models::{CreateSlotRequest, Slot, SlotStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Owns a doctor's availability slots and their available/booked lifecycle.
pub struct ScheduleService {
    store: Arc<dyn DocumentStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_slot(&self, doctor_id: &str, slot_id: &str) -> Result<Slot, DoctorError> {
        let collection = CollectionPath::doctor_slots(doctor_id);
        let document = self
            .store
            .get(&collection, slot_id)
            .await?
            .ok_or_else(|| DoctorError::NotFound(format!("Slot {} not found for doctor {}", slot_id, doctor_id)))?;

        decode_slot(doctor_id, document)
    }

    /// Slots dated today or later, earliest first.
    pub async fn list_upcoming(&self, doctor_id: &str) -> Result<Vec<Slot>, DoctorError> {
        self.list_upcoming_from(doctor_id, Utc::now().date_naive()).await
    }

    pub async fn list_upcoming_from(&self, doctor_id: &str, today: NaiveDate) -> Result<Vec<Slot>, DoctorError> {
        debug!("Fetching upcoming slots for doctor {} from {}", doctor_id, today);

        let filter = [Condition::gte("date", today.format(DATE_FORMAT).to_string())];
        self.list_sorted(doctor_id, &filter).await
    }

    /// Full schedule including past slots, earliest first.
    pub async fn list_all(&self, doctor_id: &str) -> Result<Vec<Slot>, DoctorError> {
        self.list_sorted(doctor_id, &[]).await
    }

    pub async fn create_slot(&self, doctor_id: &str, request: CreateSlotRequest) -> Result<Slot, DoctorError> {
        debug!("Creating slot for doctor: {}", doctor_id);

        let (date, start_time, end_time) = validate_slot_request(&request)?;

        let slot_data = json!({
            "doctorId": doctor_id,
            "date": date,
            "startTime": start_time,
            "endTime": end_time,
            "notes": request.notes,
            "status": SlotStatus::Available,
            "bookedBy": null,
            "bookedAt": null,
            "appointmentId": null,
            "createdAt": Utc::now().to_rfc3339()
        });

        let collection = CollectionPath::doctor_slots(doctor_id);
        let slot_id = self.store.create(&collection, slot_data).await?;

        info!("Slot {} created for doctor {} on {} {}-{}", slot_id, doctor_id, date, start_time, end_time);
        self.get_slot(doctor_id, &slot_id).await
    }

    /// Remove an available slot. The booked-check runs inside the store's
    /// conditional delete, against the latest stored state.
    pub async fn delete_slot(&self, doctor_id: &str, slot_id: &str) -> Result<(), DoctorError> {
        debug!("Deleting slot {} for doctor {}", slot_id, doctor_id);

        let collection = CollectionPath::doctor_slots(doctor_id);
        let guard = [Condition::eq("status", SlotStatus::Available.to_string())];

        match self.store.delete_if(&collection, slot_id, &guard).await {
            Ok(()) => {
                info!("Slot {} deleted for doctor {}", slot_id, doctor_id);
                Ok(())
            }
            Err(DatabaseError::PreconditionFailed { .. }) => {
                warn!("Refused to delete booked slot {} for doctor {}", slot_id, doctor_id);
                Err(DoctorError::Conflict(
                    "Cannot delete a booked slot; cancel the appointment first".to_string(),
                ))
            }
            Err(DatabaseError::NotFound { .. }) => Err(DoctorError::NotFound(format!(
                "Slot {} not found for doctor {}",
                slot_id, doctor_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Claim an available slot for an appointment. Compare-and-swap on
    /// `status`, so of two racing claims exactly one wins.
    pub async fn mark_booked(
        &self,
        doctor_id: &str,
        slot_id: &str,
        patient_id: &str,
        appointment_id: &str,
    ) -> Result<(), DoctorError> {
        debug!("Marking slot {} booked for appointment {}", slot_id, appointment_id);

        let collection = CollectionPath::doctor_slots(doctor_id);
        let guard = [Condition::eq("status", SlotStatus::Available.to_string())];
        let booking = json!({
            "status": SlotStatus::Booked,
            "bookedBy": patient_id,
            "bookedAt": Utc::now().to_rfc3339(),
            "appointmentId": appointment_id
        });

        match self.store.update_if(&collection, slot_id, &guard, booking).await {
            Ok(()) => {
                info!("Slot {} booked by patient {} (appointment {})", slot_id, patient_id, appointment_id);
                Ok(())
            }
            Err(DatabaseError::PreconditionFailed { .. }) => Err(DoctorError::Conflict(format!(
                "Slot {} is no longer available",
                slot_id
            ))),
            Err(DatabaseError::NotFound { .. }) => Err(DoctorError::NotFound(format!(
                "Slot {} not found for doctor {}",
                slot_id, doctor_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Unconditionally return a slot to `available`. A slot that is already
    /// available or no longer exists is fine.
    pub async fn mark_available(&self, doctor_id: &str, slot_id: &str) -> Result<(), DoctorError> {
        let collection = CollectionPath::doctor_slots(doctor_id);

        match self.store.update(&collection, slot_id, available_patch()).await {
            Ok(()) => {
                info!("Slot {} released for doctor {}", slot_id, doctor_id);
                Ok(())
            }
            Err(DatabaseError::NotFound { .. }) => {
                debug!("Slot {} already gone, nothing to release", slot_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Batch op releasing a slot only while it still points at
    /// `appointment_id`, for use inside an atomic commit.
    pub fn release_op(doctor_id: &str, slot_id: &str, appointment_id: &str) -> WriteOp {
        WriteOp::Patch {
            collection: CollectionPath::doctor_slots(doctor_id),
            id: slot_id.to_string(),
            data: available_patch(),
            when: vec![Condition::eq("appointmentId", appointment_id)],
        }
    }

    async fn list_sorted(&self, doctor_id: &str, filter: &[Condition]) -> Result<Vec<Slot>, DoctorError> {
        let collection = CollectionPath::doctor_slots(doctor_id);
        let documents = self.store.list(&collection, filter).await?;

        let mut slots = documents
            .into_iter()
            .map(|document| decode_slot(doctor_id, document))
            .collect::<Result<Vec<Slot>, DoctorError>>()?;

        sort_slots(&mut slots);
        Ok(slots)
    }
}

fn available_patch() -> Value {
    json!({
        "status": SlotStatus::Available,
        "bookedBy": null,
        "bookedAt": null,
        "appointmentId": null
    })
}

fn decode_slot(doctor_id: &str, document: Value) -> Result<Slot, DoctorError> {
    let mut slot: Slot = serde_json::from_value(document)?;
    if slot.doctor_id.is_empty() {
        slot.doctor_id = doctor_id.to_string();
    }
    Ok(slot)
}

/// Ascending by `(date, startTime)`. Both are fixed-width strings, so
/// lexical order is chronological.
pub fn sort_slots(slots: &mut [Slot]) {
    slots.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, DoctorError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DoctorError::Validation(format!("{} is required", field))),
    }
}

fn validate_slot_request(request: &CreateSlotRequest) -> Result<(String, String, String), DoctorError> {
    let date = required(&request.date, "date")?;
    let start_time = required(&request.start_time, "startTime")?;
    let end_time = required(&request.end_time, "endTime")?;

    let parsed_date = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| DoctorError::Validation(format!("date must be YYYY-MM-DD, got '{}'", date)))?;
    let start = parse_time(start_time, "startTime")?;
    let end = parse_time(end_time, "endTime")?;

    if end <= start {
        return Err(DoctorError::Validation("End time must be after start time".to_string()));
    }

    // Re-format so stored values are always the canonical fixed-width form.
    Ok((
        parsed_date.format(DATE_FORMAT).to_string(),
        start.format(TIME_FORMAT).to_string(),
        end.format(TIME_FORMAT).to_string(),
    ))
}

fn parse_time(value: &str, field: &str) -> Result<NaiveTime, DoctorError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|_| DoctorError::Validation(format!("{} must be HH:MM (24h), got '{}'", field, value)))
}
