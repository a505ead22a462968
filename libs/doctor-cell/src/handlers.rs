use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{CreateSlotRequest, DoctorQuery};
use crate::services::{DoctorService, ScheduleService};

fn ensure_schedule_owner(user: &User, doctor_id: &str) -> Result<(), AppError> {
    if user.acts_as(Role::Doctor, doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the doctor can manage this schedule".to_string()))
    }
}

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(state.store.clone());
    let doctors = doctor_service.list_doctors(query.department.as_deref()).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(state.store.clone());
    let doctor = doctor_service.get_doctor(&doctor_id).await?;

    Ok(Json(json!(doctor)))
}

// ==============================================================================
// SLOT MANAGEMENT
// ==============================================================================

pub async fn get_upcoming_slots(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(state.store.clone());
    let slots = schedule_service.list_upcoming(&doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_schedule_owner(&user, &doctor_id)?;

    let schedule_service = ScheduleService::new(state.store.clone());
    let slot = schedule_service.create_slot(&doctor_id, request).await?;

    Ok((StatusCode::CREATED, Json(json!(slot))))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Path((doctor_id, slot_id)): Path<(String, String)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_schedule_owner(&user, &doctor_id)?;

    let schedule_service = ScheduleService::new(state.store.clone());
    schedule_service.delete_slot(&doctor_id, &slot_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot deleted"
    })))
}
