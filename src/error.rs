// Error types for setup, actuation and the serial byte source
//
// Malformed lines and bytes arriving into a full buffer are not errors:
// they are absorbed and counted in RuntimeStatus.

/// Configuration loading / validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Fatal construction-time failures
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to allocate receive buffer of {capacity} bytes")]
    AllocationFailure { capacity: usize },

    #[error("Missing required collaborator: {collaborator}")]
    InvalidHandle { collaborator: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Motor actuator failures
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Motor actuator disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Actuator rejected command: {reason}")]
    Rejected { reason: String },
}

/// Serial byte source failures
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that ends the control loop
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Initialization failed: {0}")]
    Init(#[from] InitError),

    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    #[error("Failed to serialize status: {0}")]
    Status(#[from] serde_json::Error),

    #[error("Serial reader thread panicked")]
    IngressPanicked,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
