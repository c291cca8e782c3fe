// Proportional differential steering for a two-wheel base
// Maps the horizontal offset of a target pixel from frame center to left/right wheel speeds.

use tracing::trace;

use crate::config::SteeringParams;

/// Wheel speed magnitudes, both within [0, max_speed]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SteeringOutput {
    pub left_speed: u8,
    pub right_speed: u8,
}

impl SteeringOutput {
    pub fn new(left_speed: u8, right_speed: u8) -> Self {
        Self {
            left_speed,
            right_speed,
        }
    }

    pub fn stop() -> Self {
        Self::default()
    }

    pub fn as_tuple(&self) -> (u8, u8) {
        (self.left_speed, self.right_speed)
    }
}

/// Compute wheel speeds with the default deadband (50) and gain divisor (5)
///
/// # Arguments
/// * `target_x`, `target_y` - Target pixel; 0 on either axis means "no target"
/// * `screen_width`, `screen_height` - Frame size in pixels
/// * `max_speed` - Base speed is `max_speed / 2`
pub fn compute_speeds(
    target_x: i32,
    target_y: i32,
    screen_width: i32,
    screen_height: i32,
    max_speed: u8,
) -> SteeringOutput {
    compute_speeds_with_params(
        target_x,
        target_y,
        screen_width,
        screen_height,
        max_speed,
        SteeringParams::default(),
    )
}

/// Compute wheel speeds with custom steering parameters
///
/// Both wheels start at `max_speed / 2`. A target right of center beyond the
/// deadband slows the right wheel by `offset_x / gain_divisor`, a target left of
/// center slows the left wheel. The reduced wheel floors at 0; speeds never rise.
/// The vertical offset does not take part.
pub fn compute_speeds_with_params(
    target_x: i32,
    target_y: i32,
    screen_width: i32,
    screen_height: i32,
    max_speed: u8,
    params: SteeringParams,
) -> SteeringOutput {
    if target_x == 0 || target_y == 0 {
        return SteeringOutput::stop();
    }

    // i64 so extreme coordinates cannot overflow
    let cx = i64::from(screen_width / 2);
    let cy = i64::from(screen_height / 2);
    let offset_x = i64::from(target_x) - cx;
    let offset_y = i64::from(target_y) - cy;

    let base = i64::from(max_speed / 2);
    let deadband = i64::from(params.deadband);
    let divisor = i64::from(params.gain_divisor.max(1));

    let mut left = base;
    let mut right = base;

    if offset_x > deadband {
        // Target to the right: slow the right wheel
        right = (base - offset_x / divisor).max(0);
    } else if offset_x < -deadband {
        // Target to the left: slow the left wheel
        left = (base - (-offset_x) / divisor).max(0);
    }

    trace!(offset_x, offset_y, left, right, "Steering computed");

    // Both stay within [0, base]
    SteeringOutput::new(left as u8, right as u8)
}
