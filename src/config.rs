// Loop cadence, frame geometry, steering gains, serial settings
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// Main loop delay between poll cycles
pub const LOOP_DELAY_MS: u64 = 100;

// Accepted by read_command for compatibility; never enforced
pub const READ_TIMEOUT_MS: u64 = 50;

// Camera frame reported by the vision module (portrait)
pub const SCREEN_WIDTH: i32 = 480;
pub const SCREEN_HEIGHT: i32 = 800;

// Upper bound of a wheel speed command
pub const MAX_SPEED: u8 = 255;

// Steering law: |offset_x| <= DEADBAND keeps both wheels at base speed
pub const DEADBAND: i32 = 50;
// Wheel reduction = |offset_x| / GAIN_DIVISOR
pub const GAIN_DIVISOR: i32 = 5;

// Receive buffer; one byte stays reserved so len <= capacity - 1
pub const RX_CAPACITY: usize = 256;
// Parser working string; lines longer than LINE_CAPACITY - 1 are truncated
pub const LINE_CAPACITY: usize = 256;

// Serial link to the vision module
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Gains of the proportional differential steering law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringParams {
    pub deadband: i32,
    pub gain_divisor: i32,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            deadband: DEADBAND,
            gain_divisor: GAIN_DIVISOR,
        }
    }
}

/// Runtime configuration, loadable from JSON. Missing fields take the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub port: String,
    pub baudrate: u32,
    pub loop_delay_ms: u64,
    pub read_timeout_ms: u64,
    pub screen_width: i32,
    pub screen_height: i32,
    pub max_speed: u8,
    pub rx_capacity: usize,
    /// Lines consumed per poll cycle
    pub lines_per_tick: usize,
    /// Stop the wheels when no byte arrived for this long. `None` disables the check.
    pub command_timeout_ms: Option<u64>,
    pub steering: SteeringParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baudrate: DEFAULT_BAUDRATE,
            loop_delay_ms: LOOP_DELAY_MS,
            read_timeout_ms: READ_TIMEOUT_MS,
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            max_speed: MAX_SPEED,
            rx_capacity: RX_CAPACITY,
            lines_per_tick: 1,
            command_timeout_ms: None,
            steering: SteeringParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rx_capacity < 2 {
            return Err(ConfigError::Invalid {
                field: "rx_capacity",
                reason: format!("must be at least 2, got {}", self.rx_capacity),
            });
        }
        if self.loop_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "loop_delay_ms",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.lines_per_tick == 0 {
            return Err(ConfigError::Invalid {
                field: "lines_per_tick",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.steering.gain_divisor <= 0 {
            return Err(ConfigError::Invalid {
                field: "steering.gain_divisor",
                reason: format!("must be positive, got {}", self.steering.gain_divisor),
            });
        }
        Ok(())
    }

    pub fn loop_delay(&self) -> Duration {
        Duration::from_millis(self.loop_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
