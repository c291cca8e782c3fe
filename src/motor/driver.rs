// High-level motor driver for the two-wheel base
//
// Wraps the actuator collaborator, remembers the last applied speeds
// and stops the wheels when dropped.

use tracing::{debug, info, warn};

use super::actuator::MotorActuator;
use super::steering::SteeringOutput;
use crate::error::ActuatorError;

pub struct MotorDriver {
    actuator: Box<dyn MotorActuator>,
    last: Option<SteeringOutput>,
}

impl MotorDriver {
    pub fn new(actuator: Box<dyn MotorActuator>) -> Self {
        Self {
            actuator,
            last: None,
        }
    }

    /// Send wheel speeds to the actuator
    pub fn apply(&mut self, speeds: SteeringOutput) -> Result<(), ActuatorError> {
        debug!(
            "Setting wheel speeds: left={}, right={}",
            speeds.left_speed, speeds.right_speed
        );
        self.actuator
            .set_speeds(speeds.left_speed, speeds.right_speed)?;
        self.last = Some(speeds);
        Ok(())
    }

    /// Stop both wheels
    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        info!("Stopping both wheels");
        self.apply(SteeringOutput::stop())
    }

    /// Last speeds accepted by the actuator
    pub fn last_applied(&self) -> Option<SteeringOutput> {
        self.last
    }
}

impl Drop for MotorDriver {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::RecordingActuator;

    #[test]
    fn test_apply_records_last() {
        let recorder = RecordingActuator::new();
        let mut driver = MotorDriver::new(Box::new(recorder.clone()));
        assert_eq!(driver.last_applied(), None);

        driver.apply(SteeringOutput::new(127, 95)).unwrap();
        assert_eq!(driver.last_applied(), Some(SteeringOutput::new(127, 95)));
        assert_eq!(recorder.commands(), vec![(127, 95)]);
    }

    #[test]
    fn test_drop_stops_motors() {
        let recorder = RecordingActuator::new();
        {
            let mut driver = MotorDriver::new(Box::new(recorder.clone()));
            driver.apply(SteeringOutput::new(127, 127)).unwrap();
        }
        assert_eq!(recorder.commands(), vec![(127, 127), (0, 0)]);
    }

    struct FailingActuator;

    impl MotorActuator for FailingActuator {
        fn set_speeds(&mut self, _left: u8, _right: u8) -> Result<(), ActuatorError> {
            Err(ActuatorError::Disconnected)
        }
    }

    #[test]
    fn test_failed_apply_keeps_previous() {
        let mut driver = MotorDriver::new(Box::new(FailingActuator));
        assert!(matches!(
            driver.apply(SteeringOutput::new(1, 2)),
            Err(ActuatorError::Disconnected)
        ));
        assert_eq!(driver.last_applied(), None);
    }
}
