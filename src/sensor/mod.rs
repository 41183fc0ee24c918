//! Inbound sensor boundary: OSC listening and raw-event translation.
//!
//! The phone app pushes addressed OSC messages at an arbitrary rate. The
//! listener decodes them into [`RawSensorEvent`]s; the adapters in
//! [`adapter`] turn those into the normalized per-axis inputs the control
//! core understands.

pub mod adapter;
pub mod osc_listener;

pub use adapter::{AdapterOutput, SensorAdapter};
pub use osc_listener::{ListenerError, ListenerHandle, ListenerSettings};

use chrono::{DateTime, Local};

/// Which pad axis a raw sample belongs to.
///
/// Wiring follows the sensor app: pad X drives acceleration, pad Y drives
/// steering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadAxis {
    X,
    Y,
}

/// Which orientation angle a raw sample carries. Pitch is received but unused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationAngle {
    Yaw,
    Roll,
}

/// Raw sensor event with a precise chrono timestamp, one per OSC message.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSensorEvent {
    /// Pad axis sample in roughly [-1, 1].
    PadAxis {
        pad: PadAxis,
        value: f32,
        timestamp: DateTime<Local>,
    },
    /// Finger lifted off the pad; both pad-driven axes return to rest.
    PadTouchRelease { timestamp: DateTime<Local> },
    /// Device orientation angle in degrees.
    Orientation {
        angle: OrientationAngle,
        degrees: f32,
        timestamp: DateTime<Local>,
    },
    /// Accelerometer shake sample as a 3-vector.
    Shake {
        vector: [f32; 3],
        timestamp: DateTime<Local>,
    },
    /// A single qualifying tap on the pad.
    Tap { timestamp: DateTime<Local> },
}
