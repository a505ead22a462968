use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    Appointment, AppointmentError, BookAppointmentRequest, ParticipantRole, UpdateStatusRequest,
};
use crate::services::{AppointmentService, BookingCoordinator, DashboardService};

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound(msg) => AppError::NotFound(msg),
            AppointmentError::SlotUnavailable(_) => {
                AppError::Conflict("This slot is no longer available, please choose another".to_string())
            }
            AppointmentError::PartialFailure { appointment_id } => {
                warn!("Booking left orphan appointment {}", appointment_id);
                AppError::PartialFailure {
                    message: "Booking may not be reserved - please verify your booking".to_string(),
                    appointment_id,
                }
            }
            AppointmentError::InvalidStatusTransition(status) => AppError::Conflict(format!(
                "Appointment cannot be modified in current status: {}",
                status
            )),
            AppointmentError::Schedule(e) => e.into(),
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

fn coordinator(state: &AppState) -> BookingCoordinator {
    BookingCoordinator::new(state.store.clone(), &state.config)
}

fn ensure_participant(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if user.acts_as(Role::Doctor, &appointment.doctor_id) || user.acts_as(Role::Patient, &appointment.patient_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not a participant of this appointment".to_string()))
    }
}

fn require_role(user: &User, role: Role) -> Result<(), AppError> {
    if user.role() == Some(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Only a {} can do this", role)))
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, Role::Patient)?;

    let receipt = coordinator(&state)
        .book(&request.doctor_id, &request.slot_id, &user.id, request.input)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(receipt))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment_service = AppointmentService::new(state.store.clone());
    let appointment = appointment_service.get(&appointment_id).await?;
    ensure_participant(&user, &appointment)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment_service = AppointmentService::new(state.store.clone());
    let appointment = appointment_service.get(&appointment_id).await?;

    if !user.acts_as(Role::Doctor, &appointment.doctor_id) {
        return Err(AppError::Forbidden(
            "Only the appointment's doctor can change its status".to_string(),
        ));
    }

    let updated = coordinator(&state)
        .update_status(&appointment_id, request.status)
        .await?;

    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment_service = AppointmentService::new(state.store.clone());
    let appointment = appointment_service.get(&appointment_id).await?;
    ensure_participant(&user, &appointment)?;

    coordinator(&state)
        .cancel_and_release(&appointment.id, &appointment.doctor_id, &appointment.slot_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled and slot released"
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

pub async fn get_doctor_appointments(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.acts_as(Role::Doctor, &doctor_id) {
        return Err(AppError::Forbidden("Cannot view another doctor's appointments".to_string()));
    }

    let appointment_service = AppointmentService::new(state.store.clone());
    let appointments = appointment_service.list_for(&doctor_id, ParticipantRole::Doctor).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_patient_appointments(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.acts_as(Role::Patient, &patient_id) {
        return Err(AppError::Forbidden("Cannot view another patient's appointments".to_string()));
    }

    let appointment_service = AppointmentService::new(state.store.clone());
    let appointments = appointment_service.list_for(&patient_id, ParticipantRole::Patient).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

// ==============================================================================
// DASHBOARDS
// ==============================================================================

pub async fn doctor_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Doctor)?;

    let view = DashboardService::new(state.store.clone())
        .doctor_dashboard_view(&user.id)
        .await?;

    Ok(Json(json!(view)))
}

pub async fn patient_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;

    let view = DashboardService::new(state.store.clone())
        .patient_dashboard_view(&user.id)
        .await?;

    Ok(Json(json!(view)))
}
