// Wheel steering runtime for the lower-level controller
//
// Receives $TARGET / $SERVO lines from the vision module over serial,
// frames and parses them, and steers a two-wheel base toward the target.

pub mod clock;
pub mod config;
pub mod error;
pub mod messages;
pub mod motor;
pub mod protocol;
pub mod runtime;
pub mod serial;

pub use error::{InitError, RuntimeError};
pub use messages::Command;
pub use runtime::{RxHandle, Shutdown, WheelRuntime};
