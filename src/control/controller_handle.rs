//! Controller handle - unified lifecycle for the translation core.
//!
//! Spawns the event router and, when any axis runs in continuous mode, the
//! duty-cycle scheduler, sharing one [`StateStore`] between them. Shutdown
//! ordering is structural: the router is joined first (no more state writes),
//! then the scheduler (which flushes outstanding releases). Only after both
//! have been joined are all command senders gone, so the emitter drains and
//! the transport can close behind it.

use crate::control::event_router::{AxisModes, EventRouter, RouterHandle};
use crate::control::scheduler::{SchedulerHandle, SchedulerSettings};
use crate::control::{Command, ControlError, StateStore};
use crate::sensor::{RawSensorEvent, SensorAdapter};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Configuration for the complete translation core.
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    pub modes: AxisModes,
    pub scheduler: SchedulerSettings,
}

/// Handle for the router and scheduler tasks.
pub struct ControllerHandle {
    router: RouterHandle,
    scheduler: Option<SchedulerHandle>,
}

impl ControllerHandle {
    /// Spawns the translation core.
    ///
    /// The command sender is moved into the spawned tasks; when both have been
    /// joined, the receiving side observes the channel closing.
    pub fn spawn(
        settings: ControllerSettings,
        adapters: Vec<Box<dyn SensorAdapter>>,
        event_receiver: mpsc::Receiver<RawSensorEvent>,
        command_sender: mpsc::Sender<Command>,
    ) -> Result<Self, ControlError> {
        info!("Initializing controller with settings: {:?}", settings);

        let store = Arc::new(StateStore::new());

        let continuous_axes = settings.modes.continuous_axes();
        let scheduler = if continuous_axes.is_empty() {
            debug!("No continuous axes, scheduler not spawned");
            None
        } else {
            Some(SchedulerHandle::start(
                store.clone(),
                command_sender.clone(),
                settings.scheduler,
                &continuous_axes,
            )?)
        };

        let router = RouterHandle::start(EventRouter::new(
            event_receiver,
            adapters,
            store,
            command_sender,
            settings.modes,
        ));

        info!("Controller initialized");
        Ok(Self { router, scheduler })
    }

    /// Stops the router, then the scheduler (flushing releases), joining both.
    pub async fn shutdown(&mut self) -> Result<(), ControlError> {
        info!("Shutting down controller");
        self.router.shutdown().await?;
        if let Some(scheduler) = &mut self.scheduler {
            scheduler.shutdown().await?;
        }
        info!("Controller shut down");
        Ok(())
    }
}
