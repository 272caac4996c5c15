pub mod appointment;
pub mod validation;

pub use appointment::AppointmentService;
pub use validation::{AvailabilityValidator, OverbookPolicy};
