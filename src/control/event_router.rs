//! Event router: feeds raw sensor events through the configured adapters.
//!
//! Every event is offered to every adapter; whichever adapter recognizes it
//! produces either a normalized input (stored, and classified when the axis is
//! discrete) or a one-shot command (forwarded as-is).

use crate::control::classifier;
use crate::control::{Axis, AxisState, Command, ControlError, StateStore};
use crate::sensor::{AdapterOutput, RawSensorEvent, SensorAdapter};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How commands are produced for one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisMode {
    /// Edge classifier fires on each direction transition.
    Discrete,
    /// The duty-cycle scheduler owns emission; the router only stores state.
    Continuous,
}

/// Per-axis mode selection.
#[derive(Clone, Copy, Debug)]
pub struct AxisModes {
    pub steering: AxisMode,
    pub acceleration: AxisMode,
}

impl AxisModes {
    pub fn mode(&self, axis: Axis) -> AxisMode {
        match axis {
            Axis::Steering => self.steering,
            Axis::Acceleration => self.acceleration,
        }
    }

    /// Axes the duty-cycle scheduler must manage.
    pub fn continuous_axes(&self) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|axis| self.mode(*axis) == AxisMode::Continuous)
            .collect()
    }
}

pub struct EventRouter {
    event_receiver: mpsc::Receiver<RawSensorEvent>,
    adapters: Vec<Box<dyn SensorAdapter>>,
    store: Arc<StateStore>,
    command_sender: mpsc::Sender<Command>,
    modes: AxisModes,
}

impl EventRouter {
    pub fn new(
        event_receiver: mpsc::Receiver<RawSensorEvent>,
        adapters: Vec<Box<dyn SensorAdapter>>,
        store: Arc<StateStore>,
        command_sender: mpsc::Sender<Command>,
        modes: AxisModes,
    ) -> Self {
        info!(
            "Creating event router with {} adapters, modes {:?}",
            adapters.len(),
            modes
        );
        Self {
            event_receiver,
            adapters,
            store,
            command_sender,
            modes,
        }
    }

    /// Receive loop with graceful shutdown support. Also ends when the sensor
    /// source closes its side of the channel.
    pub async fn run_until_shutdown(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        info!("Starting event router loop");
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received by event router");
                    break;
                }
                received = self.event_receiver.recv() => {
                    match received {
                        Some(event) => self.dispatch(&event),
                        None => {
                            info!("Sensor event channel closed, router stopping");
                            break;
                        }
                    }
                }
            }
        }
        info!("Event router stopped");
    }

    fn dispatch(&mut self, event: &RawSensorEvent) {
        for index in 0..self.adapters.len() {
            let adapter = &mut self.adapters[index];
            let Some(output) = adapter.translate(event) else {
                continue;
            };
            debug!("Adapter {} produced {:?}", adapter.name(), output);
            match output {
                AdapterOutput::Input(input) => {
                    let previous = self.store.replace(
                        input.axis,
                        AxisState::new(input.direction, input.magnitude),
                    );
                    if self.modes.mode(input.axis) == AxisMode::Discrete {
                        for command in
                            classifier::classify(input.axis, previous.direction, input.direction)
                        {
                            self.emit(command);
                        }
                    }
                }
                AdapterOutput::OneShot(command) => self.emit(command),
            }
        }
    }

    fn emit(&self, command: Command) {
        debug!("Router emitting {}", command);
        if let Err(e) = self.command_sender.try_send(command) {
            warn!("Dropping router command {}: {}", command, e);
        }
    }
}

/// Handle for the router task.
#[derive(Debug)]
pub struct RouterHandle {
    task_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RouterHandle {
    pub fn start(router: EventRouter) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task_handle = tokio::spawn(router.run_until_shutdown(shutdown_rx));
        Self {
            task_handle: Some(task_handle),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), ControlError> {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Router task already terminated");
            }
        }
        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|e| {
                error!("Router task panicked: {}", e);
                ControlError::TaskError(format!("Router task panicked: {}", e))
            })?;
        }
        Ok(())
    }
}
