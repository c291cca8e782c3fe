// Vision module emulator: A/D move the target, W/S move it vertically,
// V toggles target valid, P sends a gimbal report, R/F step size, Q quit
//
// Usage: cargo run --example target_sender -- [port]
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io::Write;
use std::time::Duration;
use tracing::info;

use wheel_steering_runtime::Command;
use wheel_steering_runtime::config::{DEFAULT_BAUDRATE, DEFAULT_PORT, SCREEN_HEIGHT, SCREEN_WIDTH};
use wheel_steering_runtime::motor::compute_speeds;

const STEPS: [i32; 3] = [5, 20, 60]; // pixels per key press
const SEND_INTERVAL_MS: u64 = 50; // vision module frame period

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let port_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    info!("Opening {} at {} baud", port_name, DEFAULT_BAUDRATE);
    let mut port = serialport::new(&port_name, DEFAULT_BAUDRATE)
        .timeout(Duration::from_millis(100))
        .open()?;

    info!("Controls: A/D=x, W/S=y, V=toggle valid, P=gimbal report, R/F=step, Q=quit");

    enable_raw_mode()?;
    let result = run_sender(&mut port);
    disable_raw_mode()?;

    result
}

fn run_sender(
    port: &mut Box<dyn serialport::SerialPort>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut step_idx: usize = 0;
    let mut x = SCREEN_WIDTH / 2;
    let mut y = SCREEN_HEIGHT / 2;
    let mut valid = true;

    loop {
        if event::poll(Duration::from_millis(SEND_INTERVAL_MS))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('a') if pressed => x = (x - STEPS[step_idx]).max(1),
                    KeyCode::Char('d') if pressed => x = (x + STEPS[step_idx]).min(SCREEN_WIDTH),
                    KeyCode::Char('w') if pressed => y = (y - STEPS[step_idx]).max(1),
                    KeyCode::Char('s') if pressed => y = (y + STEPS[step_idx]).min(SCREEN_HEIGHT),

                    KeyCode::Char('v') if pressed => {
                        valid = !valid;
                        info!("Target {}", if valid { "visible" } else { "lost" });
                    }

                    KeyCode::Char('p') if pressed => {
                        // Rough gimbal angles for the current pixel
                        let pan = (x - SCREEN_WIDTH / 2) * 90 / (SCREEN_WIDTH / 2);
                        let tilt = (SCREEN_HEIGHT / 2 - y) * 90 / (SCREEN_HEIGHT / 2);
                        port.write_all(Command::servo(pan, tilt).encode_line().as_bytes())?;
                    }

                    KeyCode::Char('r') if pressed => step_idx = (step_idx + 1).min(2),
                    KeyCode::Char('f') if pressed => step_idx = step_idx.saturating_sub(1),

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Send every frame, like the camera loop does
        let line = Command::target(x, y, valid).encode_line();
        port.write_all(line.as_bytes())?;

        if valid {
            let expected = compute_speeds(x, y, SCREEN_WIDTH, SCREEN_HEIGHT, 255);
            info!(
                "Sent target ({}, {}); expect left={}, right={}\r",
                x, y, expected.left_speed, expected.right_speed
            );
        }
    }

    Ok(())
}
