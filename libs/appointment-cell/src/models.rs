use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use doctor_cell::{DoctorError, Slot};
use shared_database::DatabaseError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A patient's claim on one slot. `date` and `time` are copied from the
/// booking and never re-derived from the slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: String,
    #[serde(default)]
    pub department: Option<String>,
    pub date: String,
    #[serde(alias = "startTime")]
    pub time: String,
    pub slot_id: String,
    #[serde(default)]
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Which side of an appointment a participant id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Doctor,
    Patient,
}

impl ParticipantRole {
    /// Stored field holding this participant's id.
    pub fn field(&self) -> &'static str {
        match self {
            ParticipantRole::Doctor => "doctorId",
            ParticipantRole::Patient => "patientId",
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Patient-supplied booking form. All fields are optional on the wire so
/// that missing values come back as validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub reason: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

/// Booking form after validation, trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDetails {
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub reason: String,
    pub date: String,
    pub time: String,
}

/// Everything the appointment store needs to persist a new appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor_id: String,
    pub patient_id: String,
    pub slot_id: String,
    pub doctor_name: Option<String>,
    pub department: Option<String>,
    /// Copied from the slot, not the form.
    pub date: String,
    pub time: String,
    pub input: AppointmentInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub slot_id: String,
    #[serde(flatten)]
    pub input: AppointmentInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub appointment_id: String,
    pub patient_id: String,
}

// ==============================================================================
// DASHBOARD MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDashboard {
    pub doctor_id: String,
    pub slots: Vec<Slot>,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDashboard {
    pub patient_id: String,
    pub appointments: Vec<Appointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Slot {0} is no longer available")]
    SlotUnavailable(String),

    #[error("Appointment {appointment_id} was created but its slot could not be reserved")]
    PartialFailure { appointment_id: String },

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Schedule error: {0}")]
    Schedule(#[from] DoctorError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<serde_json::Error> for AppointmentError {
    fn from(e: serde_json::Error) -> Self {
        AppointmentError::Database(DatabaseError::Serialization(e))
    }
}
