// Command types carried by the serial line protocol
//
// $TARGET,<x>,<y>,<valid>\n   target pixel from the vision module
// $SERVO,<pan>,<tilt>\n       gimbal angles in degrees

use std::fmt;

use serde::{Deserialize, Serialize};

pub const TARGET_PREFIX: &[u8] = b"$TARGET,";
pub const SERVO_PREFIX: &[u8] = b"$SERVO,";

/// Target report from the vision module. Coordinates are not range checked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    pub x: i32,
    pub y: i32,
    pub valid: bool,
}

/// Pan/tilt gimbal angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoAngles {
    pub pan: i32,
    pub tilt: i32,
}

/// One parsed line. `None` covers empty, unknown and malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    None,
    Target(TargetReport),
    ServoAngles(ServoAngles),
}

impl Command {
    pub fn target(x: i32, y: i32, valid: bool) -> Self {
        Command::Target(TargetReport { x, y, valid })
    }

    pub fn servo(pan: i32, tilt: i32) -> Self {
        Command::ServoAngles(ServoAngles { pan, tilt })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Command::None)
    }

    /// Wire form including the trailing newline, as the vision module sends it.
    /// `Command::None` has no wire form and encodes to an empty string.
    pub fn encode_line(&self) -> String {
        match self {
            Command::None => String::new(),
            _ => format!("{}\n", self),
        }
    }
}

/// Wire form without the newline
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::None => Ok(()),
            Command::Target(t) => write!(f, "$TARGET,{},{},{}", t.x, t.y, u8::from(t.valid)),
            Command::ServoAngles(s) => write!(f, "$SERVO,{},{}", s.pan, s.tilt),
        }
    }
}
