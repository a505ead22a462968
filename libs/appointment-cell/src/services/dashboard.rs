use std::sync::Arc;

use futures::try_join;
use tracing::debug;

use doctor_cell::services::ScheduleService;
use shared_database::DocumentStore;

use crate::models::{AppointmentError, DoctorDashboard, ParticipantRole, PatientDashboard};
use crate::services::appointment::AppointmentService;

/// Read-only views, re-queried on every call.
pub struct DashboardService {
    schedule_service: ScheduleService,
    appointment_service: AppointmentService,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            schedule_service: ScheduleService::new(Arc::clone(&store)),
            appointment_service: AppointmentService::new(store),
        }
    }

    pub async fn doctor_dashboard_view(&self, doctor_id: &str) -> Result<DoctorDashboard, AppointmentError> {
        debug!("Building dashboard for doctor {}", doctor_id);

        let (slots, appointments) = try_join!(
            async { self.schedule_service.list_upcoming(doctor_id).await.map_err(AppointmentError::from) },
            self.appointment_service.list_for(doctor_id, ParticipantRole::Doctor),
        )?;

        Ok(DoctorDashboard {
            doctor_id: doctor_id.to_string(),
            slots,
            appointments,
        })
    }

    pub async fn patient_dashboard_view(&self, patient_id: &str) -> Result<PatientDashboard, AppointmentError> {
        debug!("Building dashboard for patient {}", patient_id);

        let appointments = self
            .appointment_service
            .list_for(patient_id, ParticipantRole::Patient)
            .await?;

        Ok(PatientDashboard {
            patient_id: patient_id.to_string(),
            appointments,
        })
    }
}
