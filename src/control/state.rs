//! Shared per-axis state between the event router and the scheduler.
//!
//! Each axis keeps its `(direction, magnitude)` pair behind one mutex so the
//! scheduler can never observe a direction paired with a stale magnitude.

use crate::control::{Axis, Direction};
use std::sync::Mutex;

/// Last normalized input for one axis, always read and written as a pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisState {
    pub direction: Direction,
    pub magnitude: f32,
}

impl AxisState {
    pub fn new(direction: Direction, magnitude: f32) -> Self {
        Self {
            direction,
            magnitude,
        }
    }
}

/// Authoritative record of the current discrete direction and continuous
/// magnitude per axis. Written by the event router at whatever rate the sensor
/// source pushes, read once per tick by the scheduler.
#[derive(Debug, Default)]
pub struct StateStore {
    steering: Mutex<AxisState>,
    acceleration: Mutex<AxisState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, axis: Axis) -> &Mutex<AxisState> {
        match axis {
            Axis::Steering => &self.steering,
            Axis::Acceleration => &self.acceleration,
        }
    }

    /// Atomic snapshot of the pair.
    pub fn snapshot(&self, axis: Axis) -> AxisState {
        match self.slot(axis).lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Swaps in the new pair and returns the previous one, so callers can
    /// classify the edge they just caused.
    pub fn replace(&self, axis: Axis, next: AxisState) -> AxisState {
        let mut guard = match self.slot(axis).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn replace_returns_previous_pair() {
        let store = StateStore::new();
        let first = AxisState::new(Direction::Positive, 0.6);
        let old = store.replace(Axis::Steering, first);
        assert_eq!(old, AxisState::default());
        assert_eq!(store.snapshot(Axis::Steering), first);

        let old = store.replace(Axis::Steering, AxisState::default());
        assert_eq!(old, first);
    }

    #[test]
    fn axes_are_independent() {
        let store = StateStore::new();
        store.replace(Axis::Steering, AxisState::new(Direction::Negative, 0.3));
        store.replace(Axis::Acceleration, AxisState::new(Direction::Positive, 0.8));

        assert_eq!(store.snapshot(Axis::Steering).direction, Direction::Negative);
        assert_eq!(
            store.snapshot(Axis::Acceleration).direction,
            Direction::Positive
        );
    }

    /// Writers only ever store correlated pairs; any mixed observation would
    /// mean the pair was torn between direction and magnitude.
    #[test]
    fn no_torn_reads_under_concurrent_writes() {
        let store = Arc::new(StateStore::new());
        let writer_store = store.clone();

        let writer = thread::spawn(move || {
            for i in 0..10_000 {
                let state = if i % 2 == 0 {
                    AxisState::new(Direction::Positive, 0.8)
                } else {
                    AxisState::new(Direction::Negative, 0.3)
                };
                writer_store.replace(Axis::Steering, state);
            }
        });

        for _ in 0..10_000 {
            let snap = store.snapshot(Axis::Steering);
            match snap.direction {
                Direction::Positive => assert_eq!(snap.magnitude, 0.8),
                Direction::Negative => assert_eq!(snap.magnitude, 0.3),
                Direction::Neutral => assert_eq!(snap.magnitude, 0.0),
            }
        }

        writer.join().unwrap();
    }
}
