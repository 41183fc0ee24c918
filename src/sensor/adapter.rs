//! Sensor adapters: raw samples to normalized per-axis input.
//!
//! One trait with four implementations replaces the per-source callback
//! variants of the original scripts. Each adapter is a pure function of its
//! input plus adapter-local thresholds; none of them touches the state store.

use crate::control::{Axis, Command, Direction, NormalizedInput};
use crate::sensor::{OrientationAngle, PadAxis, RawSensorEvent};
use chrono::{DateTime, Duration, Local};
use tracing::debug;

/// What an adapter produced for one raw event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AdapterOutput {
    /// Sustained per-axis input for the state store.
    Input(NormalizedInput),
    /// One-shot command bypassing the state machinery entirely.
    OneShot(Command),
}

/// Translates raw sensor events into normalized input or one-shot commands.
///
/// Adapters ignore events that are not theirs and return `None`; the router
/// offers every event to every configured adapter.
pub trait SensorAdapter: Send + 'static {
    fn translate(&mut self, event: &RawSensorEvent) -> Option<AdapterOutput>;

    fn name(&self) -> &'static str;
}

/// Maps a pad axis sample onto one control axis via a symmetric threshold.
///
/// Also answers the touch-release event with a neutral input so the stored
/// state resets when the finger lifts off.
pub struct PadAxisAdapter {
    axis: Axis,
    pad: PadAxis,
    threshold: f32,
}

impl PadAxisAdapter {
    pub fn new(axis: Axis, pad: PadAxis, threshold: f32) -> Self {
        Self {
            axis,
            pad,
            threshold,
        }
    }
}

impl SensorAdapter for PadAxisAdapter {
    fn translate(&mut self, event: &RawSensorEvent) -> Option<AdapterOutput> {
        match event {
            RawSensorEvent::PadAxis { pad, value, .. } if *pad == self.pad => {
                let direction = if *value > self.threshold {
                    Direction::Positive
                } else if *value < -self.threshold {
                    Direction::Negative
                } else {
                    Direction::Neutral
                };
                let magnitude = if direction == Direction::Neutral {
                    0.0
                } else {
                    value.abs().min(1.0)
                };
                Some(AdapterOutput::Input(NormalizedInput {
                    axis: self.axis,
                    magnitude,
                    direction,
                }))
            }
            RawSensorEvent::PadTouchRelease { .. } => {
                Some(AdapterOutput::Input(NormalizedInput::neutral(self.axis)))
            }
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        "pad-axis"
    }
}

/// Maps an orientation angle onto one control axis via a threshold band
/// centered on a configurable offset.
///
/// Magnitude is not derived from the angle; it is pinned to 1.0 while
/// non-neutral so the `Neutral <=> magnitude 0` invariant holds. Orientation
/// axes run in discrete mode only.
pub struct OrientationAdapter {
    axis: Axis,
    angle: OrientationAngle,
    threshold: f32,
    offset: f32,
    /// Angles above the band map to Negative instead of Positive (tilting the
    /// device right yields a positive yaw but steers left).
    inverted: bool,
}

impl OrientationAdapter {
    pub fn new(
        axis: Axis,
        angle: OrientationAngle,
        threshold: f32,
        offset: f32,
        inverted: bool,
    ) -> Self {
        Self {
            axis,
            angle,
            threshold,
            offset,
            inverted,
        }
    }
}

impl SensorAdapter for OrientationAdapter {
    fn translate(&mut self, event: &RawSensorEvent) -> Option<AdapterOutput> {
        match event {
            RawSensorEvent::Orientation { angle, degrees, .. } if *angle == self.angle => {
                let mut direction = if *degrees > self.offset + self.threshold {
                    Direction::Positive
                } else if *degrees < self.offset - self.threshold {
                    Direction::Negative
                } else {
                    Direction::Neutral
                };
                if self.inverted {
                    direction = match direction {
                        Direction::Positive => Direction::Negative,
                        Direction::Negative => Direction::Positive,
                        Direction::Neutral => Direction::Neutral,
                    };
                }
                let magnitude = if direction == Direction::Neutral {
                    0.0
                } else {
                    1.0
                };
                Some(AdapterOutput::Input(NormalizedInput {
                    axis: self.axis,
                    magnitude,
                    direction,
                }))
            }
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        "orientation"
    }
}

/// Emits RESCUE once per threshold crossing of the shake vector magnitude.
///
/// Edge-triggered: the adapter re-arms only after the magnitude drops back
/// below the threshold, so a sustained shake fires once.
pub struct ShakeAdapter {
    threshold: f32,
    above: bool,
}

impl ShakeAdapter {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            above: false,
        }
    }
}

impl SensorAdapter for ShakeAdapter {
    fn translate(&mut self, event: &RawSensorEvent) -> Option<AdapterOutput> {
        match event {
            RawSensorEvent::Shake { vector, .. } => {
                let magnitude =
                    (vector[0].powi(2) + vector[1].powi(2) + vector[2].powi(2)).sqrt();
                let was_above = self.above;
                self.above = magnitude > self.threshold;
                if self.above && !was_above {
                    debug!("Shake detected (|v| = {:.3})", magnitude);
                    Some(AdapterOutput::OneShot(Command::Rescue))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        "shake"
    }
}

/// Emits FIRE when a second tap arrives within the window.
///
/// A tap outside the window restarts the count; a qualifying double tap
/// resets it so a third tap starts over.
pub struct DoubleTapAdapter {
    window: Duration,
    last_tap: Option<DateTime<Local>>,
}

impl DoubleTapAdapter {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::milliseconds(window_ms as i64),
            last_tap: None,
        }
    }
}

impl SensorAdapter for DoubleTapAdapter {
    fn translate(&mut self, event: &RawSensorEvent) -> Option<AdapterOutput> {
        match event {
            RawSensorEvent::Tap { timestamp } => {
                if let Some(last) = self.last_tap {
                    if *timestamp - last <= self.window {
                        debug!("Double tap within {} ms", self.window.num_milliseconds());
                        self.last_tap = None;
                        return Some(AdapterOutput::OneShot(Command::Fire));
                    }
                }
                self.last_tap = Some(*timestamp);
                None
            }
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        "double-tap"
    }
}
