// Poll loop: frame lines, parse commands, steer the wheels
//
// Bytes arrive through RxHandle (the interrupt-style ingress) from another
// thread. The loop below is the only consumer: every `loop_delay` it extracts
// up to `lines_per_tick` lines, drives the motion state machine and applies
// wheel speeds. Both sides share the receive buffer behind one mutex.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::error::{ActuatorError, InitError, RuntimeError};
use crate::messages::{Command, ServoAngles, TargetReport};
use crate::motor::{MotorActuator, MotorDriver, SteeringOutput, compute_speeds_with_params};
use crate::protocol::{AppendOutcome, FrameAccumulator, parse_command};

/// Motion state of the base. `Idle` behaves like `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Idle,
    Tracking,
    Stopped,
}

/// Command freshness as seen by the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

/// Snapshot of the runtime, logged as JSON whenever it changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub state: MotionState,
    pub health: RuntimeHealth,
    pub speeds: Option<SteeringOutput>,
    pub last_target: Option<TargetReport>,
    pub last_servo: Option<ServoAngles>,
    pub lines_parsed: u64,
    pub lines_ignored: u64,
    pub actuator_failures: u64,
    pub bytes_dropped: u64,
    pub buffered: usize,
}

fn lock_frame(frame: &Mutex<FrameAccumulator>) -> MutexGuard<'_, FrameAccumulator> {
    // A panic while holding the lock cannot leave len out of bounds
    frame.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ingress side of the receive buffer. Cheap to clone, safe to move to a reader thread.
#[derive(Clone)]
pub struct RxHandle {
    frame: Arc<Mutex<FrameAccumulator>>,
    clock: Arc<dyn Clock>,
}

impl RxHandle {
    /// Deliver one byte. Never blocks beyond the buffer lock, never parses.
    pub fn on_byte(&self, byte: u8) -> AppendOutcome {
        let now = self.clock.now_ms();
        lock_frame(&self.frame).append(byte, now)
    }

    /// Deliver a batch under a single lock. Returns how many bytes were stored.
    pub fn on_bytes(&self, bytes: &[u8]) -> usize {
        let now = self.clock.now_ms();
        lock_frame(&self.frame).append_slice(bytes, now)
    }

    pub fn last_activity_ms(&self) -> u64 {
        lock_frame(&self.frame).last_activity_ms()
    }
}

/// Stop signal for the poll loop and the serial reader
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// True once triggered, or once the `Shutdown` is gone
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    pub async fn triggered(&mut self) {
        // Err means the sender was dropped, which also ends the loop
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

#[derive(Default)]
pub struct WheelRuntimeBuilder {
    config: RuntimeConfig,
    clock: Option<Arc<dyn Clock>>,
    actuator: Option<Box<dyn MotorActuator>>,
}

impl WheelRuntimeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn actuator(mut self, actuator: impl MotorActuator + 'static) -> Self {
        self.actuator = Some(Box::new(actuator));
        self
    }

    /// Allocate the receive buffer and wire up the collaborators
    pub fn build(self) -> Result<(WheelRuntime, RxHandle), InitError> {
        self.config.validate()?;
        let clock = self.clock.ok_or(InitError::InvalidHandle {
            collaborator: "clock",
        })?;
        let actuator = self.actuator.ok_or(InitError::InvalidHandle {
            collaborator: "motor actuator",
        })?;

        let frame = FrameAccumulator::with_capacity(self.config.rx_capacity, clock.now_ms())?;
        let frame = Arc::new(Mutex::new(frame));

        let rx = RxHandle {
            frame: Arc::clone(&frame),
            clock: Arc::clone(&clock),
        };
        let runtime = WheelRuntime {
            config: self.config,
            clock,
            frame,
            motors: MotorDriver::new(actuator),
            state: MotionState::Idle,
            health: RuntimeHealth::CmdStale, // Stale until the first command
            last_target: None,
            last_servo: None,
            lines_parsed: 0,
            lines_ignored: 0,
            actuator_failures: 0,
            starvation_reported: false,
            last_status: None,
        };

        info!("Wheel controller initialized");
        Ok((runtime, rx))
    }
}

pub struct WheelRuntime {
    config: RuntimeConfig,
    clock: Arc<dyn Clock>,
    frame: Arc<Mutex<FrameAccumulator>>,
    motors: MotorDriver,
    state: MotionState,
    health: RuntimeHealth,
    last_target: Option<TargetReport>,
    last_servo: Option<ServoAngles>,
    lines_parsed: u64,
    lines_ignored: u64,
    actuator_failures: u64,
    starvation_reported: bool,
    last_status: Option<RuntimeStatus>,
}

impl WheelRuntime {
    pub fn builder() -> WheelRuntimeBuilder {
        WheelRuntimeBuilder::default()
    }

    /// Take the next complete line out of the receive buffer and parse it.
    /// `None` means no complete line is buffered yet.
    pub fn read_command(&mut self) -> Option<Command> {
        let (cmd, full) = {
            let mut frame = lock_frame(&self.frame);
            let cmd = frame.extract_line_with(parse_command);
            (cmd, frame.is_full())
        };

        match cmd {
            Some(Command::None) => {
                self.lines_ignored += 1;
                debug!("Ignoring unrecognized line");
            }
            Some(_) => self.lines_parsed += 1,
            None if full && !self.starvation_reported => {
                warn!("Receive buffer full without a newline; incoming bytes are dropped");
                self.starvation_reported = true;
            }
            None => {}
        }
        if cmd.is_some() {
            self.starvation_reported = false;
        }
        cmd
    }

    /// Drive the motion state machine with one command
    pub fn handle_command(&mut self, cmd: Command) -> Result<(), ActuatorError> {
        match cmd {
            Command::Target(target) => {
                self.last_target = Some(target);
                self.health = RuntimeHealth::Ok;

                if target.valid {
                    let speeds = compute_speeds_with_params(
                        target.x,
                        target.y,
                        self.config.screen_width,
                        self.config.screen_height,
                        self.config.max_speed,
                        self.config.steering,
                    );
                    self.motors.apply(speeds)?;
                    self.set_state(MotionState::Tracking);
                    info!("Tracking target: ({}, {})", target.x, target.y);
                } else {
                    self.motors.apply(SteeringOutput::stop())?;
                    self.set_state(MotionState::Stopped);
                    info!("Target lost, stopping");
                }
            }
            Command::ServoAngles(servo) => {
                self.last_servo = Some(servo);
                self.health = RuntimeHealth::Ok;
                info!("Gimbal position: pan={}deg, tilt={}deg", servo.pan, servo.tilt);
            }
            Command::None => {}
        }
        Ok(())
    }

    /// One poll cycle: consume up to `lines_per_tick` lines, then run the watchdog.
    /// Actuator failures are logged and counted; the loop keeps going.
    pub fn tick(&mut self) -> Result<(), RuntimeError> {
        for _ in 0..self.config.lines_per_tick {
            let Some(cmd) = self.read_command() else {
                break;
            };
            if let Err(e) = self.handle_command(cmd) {
                self.actuator_failures += 1;
                warn!("Failed to apply {:?}: {}", cmd, e);
            }
        }

        if let Err(e) = self.check_watchdog() {
            self.actuator_failures += 1;
            warn!("Watchdog failed to stop wheels: {}", e);
        }

        let status = self.status();
        if self.last_status.as_ref() != Some(&status) {
            let json = serde_json::to_string(&status)?;
            debug!(status = %json, "Runtime status");
            self.last_status = Some(status);
        }
        Ok(())
    }

    /// Poll until `shutdown` fires, then stop the wheels
    pub async fn run(&mut self, mut shutdown: ShutdownListener) -> Result<(), RuntimeError> {
        let mut ticker = interval(self.config.loop_delay());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Wheel control loop started: {}ms poll delay, watchdog {}",
            self.config.loop_delay_ms,
            match self.config.command_timeout_ms {
                Some(ms) => format!("{}ms", ms),
                None => "disabled".to_string(),
            }
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => self.tick()?,
            }
        }

        info!("Wheel control loop stopping");
        self.motors.stop()?;
        self.set_state(MotionState::Stopped);
        Ok(())
    }

    fn check_watchdog(&mut self) -> Result<(), ActuatorError> {
        let Some(timeout) = self.config.command_timeout_ms else {
            return Ok(());
        };
        if self.state != MotionState::Tracking {
            return Ok(());
        }

        let last = lock_frame(&self.frame).last_activity_ms();
        let age = self.clock.now_ms().saturating_sub(last);
        if age > timeout {
            warn!("Command stale ({}ms old), stopping wheels", age);
            self.health = RuntimeHealth::CmdStale;
            // Stays Tracking on failure so the next tick retries
            self.motors.stop()?;
            self.set_state(MotionState::Stopped);
        }
        Ok(())
    }

    fn set_state(&mut self, next: MotionState) {
        if self.state != next {
            info!("Motion state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Discard everything in the receive buffer, e.g. after a noise burst
    /// filled it without a newline. Returns the number of bytes discarded.
    pub fn reset_rx(&mut self) -> usize {
        let mut frame = lock_frame(&self.frame);
        let discarded = frame.len();
        frame.clear();
        self.starvation_reported = false;
        if discarded > 0 {
            info!("Receive buffer reset, {} bytes discarded", discarded);
        }
        discarded
    }

    pub fn status(&self) -> RuntimeStatus {
        let frame = lock_frame(&self.frame);
        RuntimeStatus {
            state: self.state,
            health: self.health,
            speeds: self.motors.last_applied(),
            last_target: self.last_target,
            last_servo: self.last_servo,
            lines_parsed: self.lines_parsed,
            lines_ignored: self.lines_ignored,
            actuator_failures: self.actuator_failures,
            bytes_dropped: frame.dropped(),
            buffered: frame.len(),
        }
    }
}
