use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DocumentStore, MemoryDocumentStore};
use shared_models::auth::User;

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub store_url: String,
    pub store_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            store_url: String::new(),
            store_api_key: String::new(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_api_key: self.store_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    /// State over a fresh in-memory store.
    pub fn to_state(&self) -> Arc<AppState> {
        self.to_state_with_store(Arc::new(MemoryDocumentStore::new()))
    }

    pub fn to_state_with_store(&self, store: Arc<dyn DocumentStore>) -> Arc<AppState> {
        Arc::new(AppState::new(self.to_app_config(), store))
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Stored-document fixtures using the persisted field names.
pub struct MockDocuments;

impl MockDocuments {
    pub fn doctor(doctor_id: &str, name: &str, department: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "name": name,
            "email": format!("{}@clinic.example", doctor_id),
            "department": department,
            "specialization": department,
            "createdAt": "2024-01-01T00:00:00Z"
        })
    }

    pub fn available_slot(doctor_id: &str, date: &str, start_time: &str, end_time: &str) -> serde_json::Value {
        json!({
            "doctorId": doctor_id,
            "date": date,
            "startTime": start_time,
            "endTime": end_time,
            "notes": null,
            "status": "available",
            "bookedBy": null,
            "bookedAt": null,
            "appointmentId": null
        })
    }

    pub fn booked_slot(
        doctor_id: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
        patient_id: &str,
        appointment_id: &str,
    ) -> serde_json::Value {
        json!({
            "doctorId": doctor_id,
            "date": date,
            "startTime": start_time,
            "endTime": end_time,
            "notes": null,
            "status": "booked",
            "bookedBy": patient_id,
            "bookedAt": "2024-01-01T00:00:00Z",
            "appointmentId": appointment_id
        })
    }

    pub fn appointment(
        doctor_id: &str,
        patient_id: &str,
        slot_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "doctorId": doctor_id,
            "patientId": patient_id,
            "doctorName": "Dr. Test",
            "patientName": "Test Patient",
            "patientEmail": "patient@example.com",
            "patientPhone": "555-0100",
            "department": "General Practice",
            "date": date,
            "time": time,
            "slotId": slot_id,
            "reason": "checkup",
            "status": status,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }
}
