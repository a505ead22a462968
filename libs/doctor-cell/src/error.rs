use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<serde_json::Error> for DoctorError {
    fn from(e: serde_json::Error) -> Self {
        DoctorError::Database(DatabaseError::Serialization(e))
    }
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::NotFound(msg) => AppError::NotFound(msg),
            DoctorError::Conflict(msg) => AppError::Conflict(msg),
            DoctorError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
