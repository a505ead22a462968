use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "available"),
            SlotStatus::Booked => write!(f, "booked"),
        }
    }
}

/// A window of a doctor's time that patients can book.
///
/// `booked_by`, `booked_at` and `appointment_id` are set exactly when the
/// slot is booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    #[serde(default)]
    pub doctor_id: String,
    pub date: String,       // YYYY-MM-DD
    pub start_time: String, // HH:MM, 24h
    pub end_time: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: SlotStatus,
    #[serde(default)]
    pub booked_by: Option<String>,
    #[serde(default)]
    pub booked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Slot {
    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }

    /// Booking fields agree with the status.
    pub fn is_consistent(&self) -> bool {
        let fields = [
            self.booked_by.is_some(),
            self.booked_at.is_some(),
            self.appointment_id.is_some(),
        ];
        match self.status {
            SlotStatus::Booked => fields.iter().all(|set| *set),
            SlotStatus::Available => fields.iter().all(|set| !*set),
        }
    }
}

/// Fields a doctor supplies when publishing a slot. Everything is optional
/// on the wire so missing values surface as validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
}

impl CreateSlotRequest {
    pub fn new(date: &str, start_time: &str, end_time: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            start_time: Some(start_time.to_string()),
            end_time: Some(end_time.to_string()),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}

// ==============================================================================
// DOCTOR DIRECTORY (read-only)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    #[serde(alias = "fullName")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorQuery {
    pub department: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slot_uses_stored_field_names() {
        let slot: Slot = serde_json::from_value(json!({
            "id": "s1",
            "doctorId": "d1",
            "date": "2025-06-01",
            "startTime": "09:00",
            "endTime": "09:30",
            "status": "booked",
            "bookedBy": "p1",
            "bookedAt": "2025-05-01T10:00:00Z",
            "appointmentId": "a1"
        }))
        .unwrap();

        assert_eq!(slot.status, SlotStatus::Booked);
        assert_eq!(slot.appointment_id.as_deref(), Some("a1"));
        assert!(slot.is_consistent());

        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["startTime"], "09:00");
        assert_eq!(value["bookedBy"], "p1");
    }

    #[test]
    fn test_half_booked_slot_is_inconsistent() {
        let slot = Slot {
            id: "s1".into(),
            doctor_id: "d1".into(),
            date: "2025-06-01".into(),
            start_time: "09:00".into(),
            end_time: "09:30".into(),
            notes: None,
            status: SlotStatus::Available,
            booked_by: Some("p1".into()),
            booked_at: None,
            appointment_id: None,
            created_at: None,
        };
        assert!(!slot.is_consistent());
    }
}
