use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use doctor_cell::services::{DoctorService, ScheduleService};
use doctor_cell::DoctorError;
use shared_config::AppConfig;
use shared_database::{CollectionPath, DatabaseError, DocumentStore, WriteOp};

use crate::models::{
    Appointment, AppointmentError, AppointmentInput, AppointmentStatus, BookingReceipt, NewAppointment,
};
use crate::services::appointment::{status_guard, status_patch, AppointmentService};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::validation::validate_appointment_input;

/// Ties a slot and its appointment together: booking, cancellation and
/// status changes that may touch both.
pub struct BookingCoordinator {
    store: Arc<dyn DocumentStore>,
    schedule_service: ScheduleService,
    appointment_service: AppointmentService,
    doctor_service: DoctorService,
    lifecycle_service: AppointmentLifecycleService,
    compensate_orphans: bool,
}

impl BookingCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        Self {
            schedule_service: ScheduleService::new(Arc::clone(&store)),
            appointment_service: AppointmentService::new(Arc::clone(&store)),
            doctor_service: DoctorService::new(Arc::clone(&store)),
            lifecycle_service: AppointmentLifecycleService::new(config.slot_release_policy),
            compensate_orphans: config.compensate_orphans,
            store,
        }
    }

    /// Book `slot_id` for `patient_id`.
    ///
    /// The slot claim is a compare-and-swap on its status, so two racing
    /// bookings cannot both win. The loser's appointment is deleted again
    /// before the error is returned. `PartialFailure` means that cleanup
    /// did not happen and the named appointment is orphaned.
    #[instrument(skip(self, input))]
    pub async fn book(
        &self,
        doctor_id: &str,
        slot_id: &str,
        patient_id: &str,
        input: AppointmentInput,
    ) -> Result<BookingReceipt, AppointmentError> {
        let slot = match self.schedule_service.get_slot(doctor_id, slot_id).await {
            Ok(slot) => slot,
            Err(DoctorError::NotFound(_)) => return Err(AppointmentError::SlotUnavailable(slot_id.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !slot.is_available() {
            warn!("Slot {} already booked, rejecting booking for patient {}", slot_id, patient_id);
            return Err(AppointmentError::SlotUnavailable(slot_id.to_string()));
        }

        let details = validate_appointment_input(&input)?;
        if (details.date.as_str(), details.time.as_str()) != (slot.date.as_str(), slot.start_time.as_str()) {
            debug!(
                "Form date/time {} {} differs from slot {} ({} {}), using the slot's",
                details.date, details.time, slot_id, slot.date, slot.start_time
            );
        }

        let doctor = match self.doctor_service.get_doctor(doctor_id).await {
            Ok(doctor) => doctor,
            Err(DoctorError::NotFound(msg)) => return Err(AppointmentError::NotFound(msg)),
            Err(e) => return Err(e.into()),
        };

        let appointment = self
            .appointment_service
            .create(NewAppointment {
                doctor_id: doctor_id.to_string(),
                patient_id: patient_id.to_string(),
                slot_id: slot_id.to_string(),
                doctor_name: Some(doctor.name),
                department: doctor.department,
                date: slot.date,
                time: slot.start_time,
                input,
            })
            .await?;

        match self
            .schedule_service
            .mark_booked(doctor_id, slot_id, patient_id, &appointment.id)
            .await
        {
            Ok(()) => {
                info!("Appointment {} booked slot {} for patient {}", appointment.id, slot_id, patient_id);
                Ok(BookingReceipt {
                    appointment_id: appointment.id,
                    patient_id: patient_id.to_string(),
                })
            }
            Err(cause) => Err(self.settle_orphan(&appointment.id, slot_id, cause).await),
        }
    }

    async fn settle_orphan(&self, appointment_id: &str, slot_id: &str, cause: DoctorError) -> AppointmentError {
        if !self.compensate_orphans {
            warn!(
                "Slot {} could not be reserved for appointment {}: {}; leaving appointment in place",
                slot_id, appointment_id, cause
            );
            return AppointmentError::PartialFailure {
                appointment_id: appointment_id.to_string(),
            };
        }

        match self.appointment_service.delete(appointment_id).await {
            Ok(()) => {
                info!("Removed orphan appointment {} after failing to reserve slot {}", appointment_id, slot_id);
                match cause {
                    DoctorError::Conflict(_) | DoctorError::NotFound(_) => {
                        AppointmentError::SlotUnavailable(slot_id.to_string())
                    }
                    other => other.into(),
                }
            }
            Err(e) => {
                warn!(
                    "Orphan appointment {} could not be removed ({}); slot {} not reserved: {}",
                    appointment_id, e, slot_id, cause
                );
                AppointmentError::PartialFailure {
                    appointment_id: appointment_id.to_string(),
                }
            }
        }
    }

    /// Delete an appointment and free its slot in one atomic batch. The
    /// slot is only freed while it still points at this appointment, and
    /// documents that are already gone are skipped, so repeating the call
    /// is harmless.
    #[instrument(skip(self))]
    pub async fn cancel_and_release(
        &self,
        appointment_id: &str,
        doctor_id: &str,
        slot_id: &str,
    ) -> Result<(), AppointmentError> {
        self.store
            .commit(vec![
                WriteOp::Delete {
                    collection: CollectionPath::appointments(),
                    id: appointment_id.to_string(),
                },
                ScheduleService::release_op(doctor_id, slot_id, appointment_id),
            ])
            .await?;

        info!("Appointment {} cancelled, slot {} released", appointment_id, slot_id);
        Ok(())
    }

    /// Change an appointment's status. A completed appointment is frozen.
    /// Under the on-completion release policy, completing also frees the slot
    /// in the same batch. Every write is guarded on the status it was
    /// validated against; a concurrent change restarts the check.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        appointment_id: &str,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        loop {
            let appointment = self.appointment_service.get(appointment_id).await?;
            self.lifecycle_service
                .validate_status_transition(appointment.status, new_status)?;

            let written = if self.lifecycle_service.releases_slot(new_status) {
                self.complete_and_release(&appointment, new_status).await
            } else {
                self.appointment_service
                    .update_status(appointment_id, appointment.status, new_status)
                    .await
            };

            match written {
                Ok(()) => break,
                Err(AppointmentError::Database(
                    DatabaseError::PreconditionFailed { .. } | DatabaseError::NotFound { .. },
                )) => {
                    debug!(
                        "Appointment {} changed since it was read as {}, re-checking",
                        appointment_id, appointment.status
                    );
                }
                Err(e) => return Err(e),
            }
        }

        self.appointment_service.get(appointment_id).await
    }

    async fn complete_and_release(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        self.store
            .commit(vec![
                WriteOp::Require {
                    collection: CollectionPath::appointments(),
                    id: appointment.id.clone(),
                    when: vec![status_guard(appointment.status)],
                },
                WriteOp::Patch {
                    collection: CollectionPath::appointments(),
                    id: appointment.id.clone(),
                    data: status_patch(new_status),
                    when: vec![],
                },
                ScheduleService::release_op(&appointment.doctor_id, &appointment.slot_id, &appointment.id),
            ])
            .await?;

        info!(
            "Appointment {} set to {}, slot {} released",
            appointment.id, new_status, appointment.slot_id
        );
        Ok(())
    }
}
