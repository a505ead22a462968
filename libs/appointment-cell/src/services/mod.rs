pub mod appointment;
pub mod booking;
pub mod dashboard;
pub mod lifecycle;
pub mod validation;

pub use appointment::AppointmentService;
pub use booking::BookingCoordinator;
pub use dashboard::DashboardService;
pub use lifecycle::AppointmentLifecycleService;
