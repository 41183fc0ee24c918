//! OSC listener: decodes inbound datagrams and routes them by address.
//!
//! The sensor app addresses every channel under `/multisense/...`. Unknown
//! addresses are dumped at debug level, matching the default handler of the
//! original server.

use crate::sensor::{OrientationAngle, PadAxis, RawSensorEvent};
use chrono::{DateTime, Local};
use rosc::{decoder, OscMessage, OscPacket, OscType};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const ADDR_PAD_X: &str = "/multisense/pad/x";
const ADDR_PAD_Y: &str = "/multisense/pad/y";
const ADDR_PAD_TOUCH_UP: &str = "/multisense/pad/touchUP";
const ADDR_PAD_DOUBLE_TAP: &str = "/multisense/pad/doubletap";
const ADDR_ORIENTATION_YAW: &str = "/multisense/orientation/yaw";
const ADDR_ORIENTATION_ROLL: &str = "/multisense/orientation/roll";
const ADDR_ORIENTATION_PITCH: &str = "/multisense/orientation/pitch";
const ADDR_SHAKE: &str = "/multisense/shake";

/// Listener configuration.
#[derive(Clone, Debug)]
pub struct ListenerSettings {
    /// Local address the OSC socket binds to.
    pub bind_addr: String,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Errors from the OSC listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind OSC socket: {0}")]
    BindError(#[from] std::io::Error),
}

struct OscListener {
    socket: UdpSocket,
    event_sender: mpsc::Sender<RawSensorEvent>,
}

impl OscListener {
    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut buf = vec![0u8; rosc::decoder::MTU];
        let mut events = Vec::new();

        info!("OSC listener running");
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received by OSC listener");
                    break;
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, source) = match received {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("OSC receive failed: {}", e);
                            continue;
                        }
                    };

                    match decoder::decode_udp(&buf[..len]) {
                        Ok((_, packet)) => {
                            events.clear();
                            route_packet(packet, Local::now(), &mut events);
                            for event in events.drain(..) {
                                if let Err(e) = self.event_sender.try_send(event) {
                                    warn!("Dropping sensor event: {}", e);
                                }
                            }
                        }
                        Err(e) => {
                            debug!("Undecodable datagram from {}: {}", source, e);
                        }
                    }
                }
            }
        }
        info!("OSC listener stopped");
    }
}

/// Flattens bundles and maps every recognized message into a raw event.
fn route_packet(packet: OscPacket, now: DateTime<Local>, out: &mut Vec<RawSensorEvent>) {
    match packet {
        OscPacket::Message(message) => {
            if let Some(event) = map_message(&message, now) {
                out.push(event);
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                route_packet(inner, now, out);
            }
        }
    }
}

fn map_message(message: &OscMessage, now: DateTime<Local>) -> Option<RawSensorEvent> {
    match message.addr.as_str() {
        ADDR_PAD_X => Some(RawSensorEvent::PadAxis {
            pad: PadAxis::X,
            value: float_arg(&message.args, 0)?,
            timestamp: now,
        }),
        ADDR_PAD_Y => Some(RawSensorEvent::PadAxis {
            pad: PadAxis::Y,
            value: float_arg(&message.args, 0)?,
            timestamp: now,
        }),
        ADDR_PAD_TOUCH_UP => Some(RawSensorEvent::PadTouchRelease { timestamp: now }),
        ADDR_PAD_DOUBLE_TAP => Some(RawSensorEvent::Tap { timestamp: now }),
        ADDR_ORIENTATION_YAW => Some(RawSensorEvent::Orientation {
            angle: OrientationAngle::Yaw,
            degrees: float_arg(&message.args, 0)?,
            timestamp: now,
        }),
        ADDR_ORIENTATION_ROLL => Some(RawSensorEvent::Orientation {
            angle: OrientationAngle::Roll,
            degrees: float_arg(&message.args, 0)?,
            timestamp: now,
        }),
        ADDR_ORIENTATION_PITCH => {
            debug!("Ignoring pitch sample");
            None
        }
        ADDR_SHAKE => Some(RawSensorEvent::Shake {
            vector: [
                float_arg(&message.args, 0)?,
                float_arg(&message.args, 1)?,
                float_arg(&message.args, 2)?,
            ],
            timestamp: now,
        }),
        other => {
            debug!("Unbound OSC address {}: {:?}", other, message.args);
            None
        }
    }
}

fn float_arg(args: &[OscType], index: usize) -> Option<f32> {
    match args.get(index)? {
        OscType::Float(value) => Some(*value),
        OscType::Double(value) => Some(*value as f32),
        OscType::Int(value) => Some(*value as f32),
        other => {
            debug!("Unexpected OSC argument type: {:?}", other);
            None
        }
    }
}

/// Handle for the listener task.
#[derive(Debug)]
pub struct ListenerHandle {
    task_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ListenerHandle {
    /// Binds the OSC socket and spawns the receive loop.
    pub async fn spawn(
        settings: ListenerSettings,
        event_sender: mpsc::Sender<RawSensorEvent>,
    ) -> Result<Self, ListenerError> {
        let socket = UdpSocket::bind(&settings.bind_addr).await?;
        info!("OSC listener bound to {}", settings.bind_addr);

        let listener = OscListener {
            socket,
            event_sender,
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task_handle = tokio::spawn(listener.run(shutdown_rx));

        Ok(Self {
            task_handle: Some(task_handle),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Stops the receive loop and waits for it to finish. Dropping the
    /// listener also drops its event sender, which lets the router drain out.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("OSC listener task already terminated");
            }
        }
        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                error!("OSC listener task panicked: {}", e);
            }
        }
    }
}
