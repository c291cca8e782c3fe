// PWM/motor actuator collaborator
//
// Accepts two 0-255 magnitudes. Direction and speed-to-PWM calibration
// belong to the hardware driver behind this trait.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::ActuatorError;

pub trait MotorActuator: Send {
    fn set_speeds(&mut self, left: u8, right: u8) -> Result<(), ActuatorError>;
}

/// Logs every command instead of driving hardware
#[derive(Debug, Default)]
pub struct LogActuator;

impl MotorActuator for LogActuator {
    fn set_speeds(&mut self, left: u8, right: u8) -> Result<(), ActuatorError> {
        info!("Motor control: left={}, right={}", left, right);
        Ok(())
    }
}

/// Records every command into a shared list. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    commands: Arc<Mutex<Vec<(u8, u8)>>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands so far, oldest first
    pub fn commands(&self) -> Vec<(u8, u8)> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<(u8, u8)> {
        self.commands().last().copied()
    }
}

impl MotorActuator for RecordingActuator {
    fn set_speeds(&mut self, left: u8, right: u8) -> Result<(), ActuatorError> {
        let mut commands = self.commands.lock().map_err(|_| ActuatorError::Rejected {
            reason: "command record poisoned".to_string(),
        })?;
        commands.push((left, right));
        Ok(())
    }
}
