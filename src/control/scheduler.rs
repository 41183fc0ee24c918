//! Duty-cycle scheduler for continuous-mode axes.
//!
//! A single tokio task ticks at a fixed frequency and runs one
//! Pressed/Released phase machine per continuous axis. Phase durations are
//! proportional to the current magnitude, so over a full duty-cycle window the
//! consumer sees the virtual key held for roughly `magnitude` of the time.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Ticking ──► Stopped
//!                     │
//!                 (shutdown, flushes outstanding releases)
//! ```

use crate::control::{Axis, AxisState, Command, ControlError, Direction, StateStore};
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Timing settings for the scheduler task.
#[derive(Clone, Debug)]
pub struct SchedulerSettings {
    /// Tick frequency in Hz.
    pub tick_hz: u32,

    /// Duty-cycle window in milliseconds. At constant magnitude `m` the key is
    /// held Pressed for `m * cycle_ms` and Released for the remainder, so the
    /// window should span many ticks for a usable resolution.
    pub cycle_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            cycle_ms: 500,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pressed,
    Released,
}

/// Per-axis phase bookkeeping, owned exclusively by the scheduler task.
///
/// `held` records the direction at time of press; the matching Release always
/// names that key even if the stored direction has changed since.
#[derive(Debug)]
pub(crate) struct DutyCycle {
    axis: Axis,
    phase: Phase,
    timer: f32,
    held: Direction,
    cycle_secs: f32,
}

impl DutyCycle {
    pub(crate) fn new(axis: Axis, cycle_secs: f32) -> Self {
        Self {
            axis,
            phase: Phase::Released,
            timer: 0.0,
            held: Direction::Neutral,
            cycle_secs,
        }
    }

    pub(crate) fn is_pressed(&self) -> bool {
        self.phase == Phase::Pressed
    }

    /// Advances the phase machine by one tick against an atomic snapshot of
    /// the axis state. Appends any commands owed this tick in emit order.
    pub(crate) fn tick(&mut self, snapshot: AxisState, dt: f32, out: &mut Vec<Command>) {
        if snapshot.direction == Direction::Neutral || snapshot.magnitude <= 0.0 {
            if self.phase == Phase::Pressed {
                out.extend(Command::release(self.axis, self.held));
                self.reset();
            }
            return;
        }

        // Direction reversed while the old key is held: release it first, then
        // fall through so the new press can fire this same tick.
        if self.phase == Phase::Pressed && self.held != snapshot.direction {
            out.extend(Command::release(self.axis, self.held));
            self.reset();
        }

        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }

        // Magnitude is resampled here, at the flip, never mid-phase.
        match self.phase {
            Phase::Pressed => {
                // Saturated input: the released phase would be empty, so keep
                // the key held and restart the pressed window instead.
                if snapshot.magnitude >= 1.0 {
                    self.timer = self.cycle_secs;
                    return;
                }
                out.extend(Command::release(self.axis, self.held));
                self.phase = Phase::Released;
                self.held = Direction::Neutral;
                self.timer = (1.0 - snapshot.magnitude) * self.cycle_secs;
            }
            Phase::Released => {
                out.extend(Command::press(self.axis, snapshot.direction));
                self.phase = Phase::Pressed;
                self.held = snapshot.direction;
                self.timer = snapshot.magnitude * self.cycle_secs;
            }
        }
    }

    /// Releases the key if one is still held. Used on shutdown so the consumer
    /// is never left with a permanently held key.
    pub(crate) fn flush(&mut self, out: &mut Vec<Command>) {
        if self.phase == Phase::Pressed {
            out.extend(Command::release(self.axis, self.held));
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Released;
        self.timer = 0.0;
        self.held = Direction::Neutral;
    }
}

/// Scheduler lifecycle states.
#[state]
#[derive(Debug, Clone)]
pub enum SchedulerState {
    Initializing,
    Ticking,
    Stopped,
}

/// Fixed-frequency duty-cycle scheduler with compile-time state safety.
#[machine]
pub struct DutyCycleScheduler<S: SchedulerState> {
    store: Arc<StateStore>,
    command_sender: mpsc::Sender<Command>,
    settings: SchedulerSettings,
    axes: Vec<DutyCycle>,
}

impl DutyCycleScheduler<Initializing> {
    /// Creates a scheduler managing the given continuous-mode axes.
    pub fn create(
        store: Arc<StateStore>,
        command_sender: mpsc::Sender<Command>,
        settings: SchedulerSettings,
        axes: &[Axis],
    ) -> Result<Self, ControlError> {
        if settings.tick_hz == 0 {
            return Err(ControlError::ConfigError(
                "tick frequency must be at least 1 Hz".to_string(),
            ));
        }
        if settings.cycle_ms == 0 {
            return Err(ControlError::ConfigError(
                "duty-cycle window must be non-empty".to_string(),
            ));
        }

        let cycle_secs = settings.cycle_ms as f32 / 1000.0;
        let duty_cycles = axes
            .iter()
            .map(|axis| DutyCycle::new(*axis, cycle_secs))
            .collect();

        info!(
            "Creating duty-cycle scheduler: {} Hz, {} ms window, axes {:?}",
            settings.tick_hz, settings.cycle_ms, axes
        );
        Ok(Self::new(store, command_sender, settings, duty_cycles))
    }

    pub fn activate(self) -> DutyCycleScheduler<Ticking> {
        info!("Activating duty-cycle scheduler");
        self.transition()
    }
}

impl DutyCycleScheduler<Ticking> {
    /// Runs one tick over all managed axes and forwards the resulting
    /// commands. Emission is non-blocking; a full channel drops the command.
    fn tick(&mut self, dt: f32, buffer: &mut Vec<Command>) {
        buffer.clear();
        for duty_cycle in &mut self.axes {
            let snapshot = self.store.snapshot(duty_cycle.axis);
            duty_cycle.tick(snapshot, dt, buffer);
        }

        for command in buffer.drain(..) {
            debug!("Scheduler emitting {}", command);
            if let Err(e) = self.command_sender.try_send(command) {
                warn!("Dropping scheduler command {}: {}", command, e);
            }
        }
    }

    /// Main tick loop with graceful shutdown support.
    ///
    /// The stop signal is observed at each tick boundary, so shutdown latency
    /// is bounded by one tick period. Any key still Pressed is released before
    /// the task ends.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> DutyCycleScheduler<Stopped> {
        let dt = 1.0 / self.settings.tick_hz as f32;
        let period = Duration::from_secs_f64(1.0 / self.settings.tick_hz as f64);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut buffer = Vec::new();

        info!("Starting scheduler tick loop ({:?} period)", period);
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received by scheduler");
                    break;
                }
                _ = interval.tick() => {
                    self.tick(dt, &mut buffer);
                }
            }
        }

        // Outstanding releases must go out before the transport closes.
        buffer.clear();
        for duty_cycle in &mut self.axes {
            duty_cycle.flush(&mut buffer);
        }
        for command in buffer.drain(..) {
            info!("Flushing {} on shutdown", command);
            if let Err(e) = self.command_sender.try_send(command) {
                warn!("Failed to flush {} on shutdown: {}", command, e);
            }
        }

        info!("Scheduler stopped");
        self.transition()
    }
}

/// Handle for the scheduler task: spawn, then join via [`SchedulerHandle::shutdown`].
#[derive(Debug)]
pub struct SchedulerHandle {
    task_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SchedulerHandle {
    /// Creates the scheduler and spawns its tick loop in a tokio task.
    pub fn start(
        store: Arc<StateStore>,
        command_sender: mpsc::Sender<Command>,
        settings: SchedulerSettings,
        axes: &[Axis],
    ) -> Result<Self, ControlError> {
        let scheduler = DutyCycleScheduler::create(store, command_sender, settings, axes)?;
        let active = scheduler.activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task_handle = tokio::spawn(async move {
            let _ = active.run_until_shutdown(shutdown_rx).await;
        });

        Ok(Self {
            task_handle: Some(task_handle),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Signals the tick loop to stop and waits for it to flush and finish.
    pub async fn shutdown(&mut self) -> Result<(), ControlError> {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Scheduler task already terminated");
            }
        }

        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|e| {
                error!("Scheduler task panicked: {}", e);
                ControlError::TaskError(format!("Scheduler task panicked: {}", e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1/64 s: exactly representable, so phase lengths come out in whole ticks.
    const DT: f32 = 0.015625;

    fn positive(magnitude: f32) -> AxisState {
        AxisState::new(Direction::Positive, magnitude)
    }

    #[test]
    fn first_press_fires_within_one_tick() {
        let mut dc = DutyCycle::new(Axis::Steering, 0.5);
        let mut out = Vec::new();

        dc.tick(positive(0.75), DT, &mut out);
        assert_eq!(out, vec![Command::PressRight]);
        assert!(dc.is_pressed());
    }

    #[test]
    fn pressed_share_matches_magnitude_exactly_for_aligned_window() {
        // m = 0.75, window 0.5 s, dt = 1/64 s: 24 pressed + 8 released ticks
        // per cycle, all dyadic so the f32 timer hits zero exactly.
        let mut dc = DutyCycle::new(Axis::Steering, 0.5);
        let mut out = Vec::new();

        let total = 64;
        let mut pressed_ticks = 0;
        for _ in 0..total {
            dc.tick(positive(0.75), DT, &mut out);
            if dc.is_pressed() {
                pressed_ticks += 1;
            }
        }
        assert_eq!(pressed_ticks, 48); // 0.75 * 64
    }

    #[test]
    fn pressed_share_converges_for_unaligned_magnitude() {
        let dt = 1.0 / 60.0;
        let mut dc = DutyCycle::new(Axis::Acceleration, 0.5);
        let mut out = Vec::new();

        let total = 600;
        let mut pressed_ticks = 0;
        for _ in 0..total {
            dc.tick(positive(0.6), dt, &mut out);
            if dc.is_pressed() {
                pressed_ticks += 1;
            }
        }
        let share = pressed_ticks as f32 / total as f32;
        assert!(
            (share - 0.6).abs() < 0.05,
            "pressed share {} too far from 0.6",
            share
        );
    }

    #[test]
    fn zero_magnitude_forces_release_within_one_tick() {
        let mut dc = DutyCycle::new(Axis::Steering, 0.5);
        let mut out = Vec::new();
        dc.tick(positive(0.75), DT, &mut out);
        assert!(dc.is_pressed());

        out.clear();
        dc.tick(AxisState::default(), DT, &mut out);
        assert_eq!(out, vec![Command::ReleaseRight]);
        assert!(!dc.is_pressed());

        // Staying neutral emits nothing further.
        out.clear();
        dc.tick(AxisState::default(), DT, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn reversal_while_pressed_releases_old_key_first() {
        let mut dc = DutyCycle::new(Axis::Steering, 0.5);
        let mut out = Vec::new();
        dc.tick(positive(0.75), DT, &mut out);
        assert_eq!(out, vec![Command::PressRight]);

        out.clear();
        dc.tick(AxisState::new(Direction::Negative, 0.5), DT, &mut out);
        assert_eq!(out, vec![Command::ReleaseRight, Command::PressLeft]);
        assert!(dc.is_pressed());
    }

    #[test]
    fn flush_releases_held_key() {
        let mut dc = DutyCycle::new(Axis::Acceleration, 0.5);
        let mut out = Vec::new();
        dc.tick(positive(0.9), DT, &mut out);
        assert_eq!(out, vec![Command::PressUp]);

        out.clear();
        dc.flush(&mut out);
        assert_eq!(out, vec![Command::ReleaseUp]);

        out.clear();
        dc.flush(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn magnitude_change_reshapes_cycle_at_next_flip_only() {
        let mut dc = DutyCycle::new(Axis::Steering, 0.5);
        let mut out = Vec::new();

        // Enter Pressed at m = 0.5 (16 ticks), then raise the magnitude.
        dc.tick(positive(0.5), DT, &mut out);
        assert!(dc.is_pressed());

        // The running phase keeps its original duration despite the change.
        for _ in 0..15 {
            out.clear();
            dc.tick(positive(0.75), DT, &mut out);
            assert!(out.is_empty(), "phase flipped early");
        }
        out.clear();
        dc.tick(positive(0.75), DT, &mut out);
        assert_eq!(out, vec![Command::ReleaseRight]);
    }

    #[test]
    fn saturated_magnitude_holds_key_continuously() {
        // m = 1.0 leaves no room for a released phase: the key is pressed once
        // and never let go, instead of blipping up for one tick per window.
        let mut dc = DutyCycle::new(Axis::Steering, 0.5);
        let mut out = Vec::new();

        // 128 ticks = four full windows.
        for _ in 0..128 {
            dc.tick(positive(1.0), DT, &mut out);
            assert!(dc.is_pressed());
        }
        assert_eq!(out, vec![Command::PressRight]);

        // Dropping below saturation resumes normal cycling at the next flip.
        out.clear();
        for _ in 0..32 {
            dc.tick(positive(0.5), DT, &mut out);
        }
        assert_eq!(out, vec![Command::ReleaseRight, Command::PressRight]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_press_flushes_release() {
        let store = Arc::new(StateStore::new());
        store.replace(Axis::Steering, positive(0.9));

        let (command_tx, mut command_rx) = mpsc::channel(100);
        let mut handle = SchedulerHandle::start(
            store,
            command_tx,
            SchedulerSettings::default(),
            &[Axis::Steering],
        )
        .unwrap();

        // Let a few ticks pass so the axis is mid-Pressed, then stop.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await.unwrap();

        let mut commands = Vec::new();
        while let Ok(command) = command_rx.try_recv() {
            commands.push(command);
        }

        assert_eq!(commands.first(), Some(&Command::PressRight));
        assert_eq!(commands.last(), Some(&Command::ReleaseRight));
        let presses = commands.iter().filter(|c| **c == Command::PressRight).count();
        let releases = commands
            .iter()
            .filter(|c| **c == Command::ReleaseRight)
            .count();
        assert_eq!(presses, releases, "every press must have its release");
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let store = Arc::new(StateStore::new());
        let (command_tx, _command_rx) = mpsc::channel(1);
        let result = DutyCycleScheduler::create(
            store,
            command_tx,
            SchedulerSettings {
                tick_hz: 0,
                cycle_ms: 500,
            },
            &[Axis::Steering],
        );
        assert!(matches!(result, Err(ControlError::ConfigError(_))));
    }
}
