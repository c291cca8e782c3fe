// Motor control module for the two-wheel base
//
// Provides:
// - Proportional differential steering (target pixel -> wheel speeds)
// - Motor actuator collaborator trait and stand-in implementations
// - High-level motor driver API

mod actuator;
mod driver;
pub mod steering;

pub use actuator::{LogActuator, MotorActuator, RecordingActuator};
pub use driver::MotorDriver;
pub use steering::{SteeringOutput, compute_speeds, compute_speeds_with_params};
