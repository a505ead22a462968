use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use tracing::debug;

use crate::models::{AppointmentDetails, AppointmentError, AppointmentInput};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

static PHONE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$|^\+?\d{1,4}[\s\-\.\(\)]*\d{1,14}$").ok());

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_PATTERN.as_ref().is_some_and(|re| re.is_match(email))
}

pub fn validate_phone(phone: &str) -> bool {
    PHONE_PATTERN.as_ref().is_some_and(|re| re.is_match(phone))
}

fn required(value: &Option<String>, field: &str) -> Result<String, AppointmentError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppointmentError::Validation(format!("{} is required", field))),
    }
}

/// Check a booking form. Reports the first problem found.
pub fn validate_appointment_input(input: &AppointmentInput) -> Result<AppointmentDetails, AppointmentError> {
    debug!("Validating appointment input");

    let patient_name = required(&input.patient_name, "patientName")?;
    let patient_email = required(&input.patient_email, "patientEmail")?;
    let patient_phone = required(&input.patient_phone, "patientPhone")?;
    let reason = required(&input.reason, "reason")?;
    let date = required(&input.date, "date")?;
    let time = required(&input.time, "time")?;

    if !validate_email(&patient_email) {
        return Err(AppointmentError::Validation(format!(
            "patientEmail is not a valid email address: '{}'",
            patient_email
        )));
    }
    if !validate_phone(&patient_phone) {
        return Err(AppointmentError::Validation(format!(
            "patientPhone is not a valid phone number: '{}'",
            patient_phone
        )));
    }
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|_| AppointmentError::Validation(format!("date must be YYYY-MM-DD, got '{}'", date)))?
        .format(DATE_FORMAT)
        .to_string();
    let time = NaiveTime::parse_from_str(&time, TIME_FORMAT)
        .map_err(|_| AppointmentError::Validation(format!("time must be HH:MM (24h), got '{}'", time)))?
        .format(TIME_FORMAT)
        .to_string();

    Ok(AppointmentDetails {
        patient_name,
        patient_email,
        patient_phone,
        reason,
        date,
        time,
    })
}
