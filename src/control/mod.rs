//! Translation core: turns normalized sensor input into discrete key commands.
//!
//! Two paths produce commands from the shared [`StateStore`]:
//! - discrete mode: the edge classifier fires once per direction transition
//! - continuous mode: the duty-cycle scheduler approximates the magnitude as a
//!   press/release timing pattern
//!
//! ```text
//! RawSensorEvent ──► EventRouter ──► StateStore ──► DutyCycleScheduler ──► Command
//!                         │                                                  ▲
//!                         └── EdgeClassifier (discrete axes) ────────────────┘
//! ```

pub mod classifier;
pub mod controller_handle;
pub mod error;
pub mod event_router;
pub mod scheduler;
pub mod state;

pub use controller_handle::{ControllerHandle, ControllerSettings};
pub use error::ControlError;
pub use state::{AxisState, StateStore};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One independent control channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Steering,
    Acceleration,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Steering, Axis::Acceleration];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Steering => write!(f, "steering"),
            Axis::Acceleration => write!(f, "acceleration"),
        }
    }
}

/// Discrete sign of an axis's current intent.
///
/// Negative reads as Left/Down and Positive as Right/Up depending on the axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    Negative,
    #[default]
    Neutral,
    Positive,
}

/// Adapter output for one axis: direction plus magnitude in `[0, 1]`.
///
/// Invariant: `direction == Neutral` exactly when `magnitude == 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedInput {
    pub axis: Axis,
    pub magnitude: f32,
    pub direction: Direction,
}

impl NormalizedInput {
    pub fn neutral(axis: Axis) -> Self {
        Self {
            axis,
            magnitude: 0.0,
            direction: Direction::Neutral,
        }
    }
}

/// Fixed ASCII tokens understood by the downstream consumer.
///
/// Commands carry no payload beyond the token itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    PressLeft,
    ReleaseLeft,
    PressRight,
    ReleaseRight,
    PressUp,
    ReleaseUp,
    PressDown,
    ReleaseDown,
    Fire,
    Rescue,
}

impl Command {
    /// Wire token, sent verbatim as the datagram payload.
    pub fn token(&self) -> &'static str {
        match self {
            Command::PressLeft => "P_LEFT",
            Command::ReleaseLeft => "R_LEFT",
            Command::PressRight => "P_RIGHT",
            Command::ReleaseRight => "R_RIGHT",
            Command::PressUp => "P_UP",
            Command::ReleaseUp => "R_UP",
            Command::PressDown => "P_DOWN",
            Command::ReleaseDown => "R_DOWN",
            Command::Fire => "FIRE",
            Command::Rescue => "RESCUE",
        }
    }

    /// Press command for a non-neutral direction on the given axis.
    pub fn press(axis: Axis, direction: Direction) -> Option<Command> {
        match (axis, direction) {
            (Axis::Steering, Direction::Negative) => Some(Command::PressLeft),
            (Axis::Steering, Direction::Positive) => Some(Command::PressRight),
            (Axis::Acceleration, Direction::Positive) => Some(Command::PressUp),
            (Axis::Acceleration, Direction::Negative) => Some(Command::PressDown),
            (_, Direction::Neutral) => None,
        }
    }

    /// Release command matching [`Command::press`].
    pub fn release(axis: Axis, direction: Direction) -> Option<Command> {
        match (axis, direction) {
            (Axis::Steering, Direction::Negative) => Some(Command::ReleaseLeft),
            (Axis::Steering, Direction::Positive) => Some(Command::ReleaseRight),
            (Axis::Acceleration, Direction::Positive) => Some(Command::ReleaseUp),
            (Axis::Acceleration, Direction::Negative) => Some(Command::ReleaseDown),
            (_, Direction::Neutral) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_match_wire_protocol() {
        assert_eq!(Command::PressLeft.token(), "P_LEFT");
        assert_eq!(Command::ReleaseRight.token(), "R_RIGHT");
        assert_eq!(Command::PressUp.token(), "P_UP");
        assert_eq!(Command::ReleaseDown.token(), "R_DOWN");
        assert_eq!(Command::Fire.token(), "FIRE");
        assert_eq!(Command::Rescue.token(), "RESCUE");
    }

    #[test]
    fn press_release_pairs_line_up() {
        for axis in Axis::ALL {
            for direction in [Direction::Negative, Direction::Positive] {
                let press = Command::press(axis, direction).unwrap();
                let release = Command::release(axis, direction).unwrap();
                assert_eq!(press.token().replace("P_", "R_"), release.token());
            }
            assert_eq!(Command::press(axis, Direction::Neutral), None);
            assert_eq!(Command::release(axis, Direction::Neutral), None);
        }
    }

    #[test]
    fn steering_maps_to_left_right() {
        assert_eq!(
            Command::press(Axis::Steering, Direction::Negative),
            Some(Command::PressLeft)
        );
        assert_eq!(
            Command::press(Axis::Steering, Direction::Positive),
            Some(Command::PressRight)
        );
    }
}
