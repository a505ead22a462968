use tracing::{debug, warn};

use shared_config::SlotReleasePolicy;

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService {
    release_policy: SlotReleasePolicy,
}

impl AppointmentLifecycleService {
    pub fn new(release_policy: SlotReleasePolicy) -> Self {
        Self { release_policy }
    }

    /// Any status may follow any other, except that a completed
    /// appointment is frozen.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if current_status == AppointmentStatus::Completed {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition(current_status));
        }

        Ok(())
    }

    /// Whether moving to `new_status` also frees the booked slot.
    pub fn releases_slot(&self, new_status: AppointmentStatus) -> bool {
        match self.release_policy {
            SlotReleasePolicy::OnDeletion => false,
            SlotReleasePolicy::OnCompletion => new_status == AppointmentStatus::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_completed_is_frozen() {
        let lifecycle = AppointmentLifecycleService::new(SlotReleasePolicy::OnDeletion);

        for next in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ] {
            assert_matches!(
                lifecycle.validate_status_transition(AppointmentStatus::Completed, next),
                Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Completed))
            );
        }
    }

    #[test]
    fn test_open_statuses_move_freely() {
        let lifecycle = AppointmentLifecycleService::new(SlotReleasePolicy::OnDeletion);

        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Cancelled, AppointmentStatus::Pending)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Confirmed, AppointmentStatus::Completed)
            .is_ok());
    }

    #[test]
    fn test_release_policy() {
        let keep = AppointmentLifecycleService::new(SlotReleasePolicy::OnDeletion);
        assert!(!keep.releases_slot(AppointmentStatus::Completed));

        let free = AppointmentLifecycleService::new(SlotReleasePolicy::OnCompletion);
        assert!(free.releases_slot(AppointmentStatus::Completed));
        assert!(!free.releases_slot(AppointmentStatus::Cancelled));
    }
}
