//! Edge-triggered classification for discrete-mode axes.
//!
//! A command fires only on a direction transition, never while the direction
//! is unchanged. A direct reversal (Negative to Positive without an
//! intervening Neutral sample) releases the old key before pressing the new
//! one, so the consumer is never left with a stuck virtual key.

use crate::control::{Axis, Command, Direction};

/// Commands owed for the transition `old -> new` on one axis.
///
/// Returns zero, one, or (on a reversal) two commands in emit order.
pub fn classify(axis: Axis, old: Direction, new: Direction) -> Vec<Command> {
    if old == new {
        return Vec::new();
    }

    let mut commands = Vec::with_capacity(2);
    commands.extend(Command::release(axis, old));
    commands.extend(Command::press(axis, new));
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_to_positive_presses_once() {
        let commands = classify(Axis::Steering, Direction::Neutral, Direction::Positive);
        assert_eq!(commands, vec![Command::PressRight]);
    }

    #[test]
    fn positive_to_neutral_releases_once() {
        let commands = classify(Axis::Steering, Direction::Positive, Direction::Neutral);
        assert_eq!(commands, vec![Command::ReleaseRight]);
    }

    #[test]
    fn unchanged_direction_is_silent() {
        for direction in [Direction::Negative, Direction::Neutral, Direction::Positive] {
            assert!(classify(Axis::Acceleration, direction, direction).is_empty());
        }
    }

    #[test]
    fn reversal_releases_old_before_pressing_new() {
        let commands = classify(Axis::Steering, Direction::Positive, Direction::Negative);
        assert_eq!(commands, vec![Command::ReleaseRight, Command::PressLeft]);

        let commands = classify(Axis::Acceleration, Direction::Negative, Direction::Positive);
        assert_eq!(commands, vec![Command::ReleaseDown, Command::PressUp]);
    }

    /// Threshold oscillation (0.39 / 0.41 around 0.4) becomes an alternating
    /// Neutral / Positive direction sequence; the classifier must answer with
    /// alternating Press/Release and never two identical commands in a row.
    #[test]
    fn oscillation_alternates_press_release() {
        let directions = [
            Direction::Neutral,
            Direction::Positive,
            Direction::Neutral,
            Direction::Positive,
            Direction::Neutral,
        ];

        let mut emitted = Vec::new();
        for pair in directions.windows(2) {
            emitted.extend(classify(Axis::Acceleration, pair[0], pair[1]));
        }

        assert_eq!(
            emitted,
            vec![
                Command::PressUp,
                Command::ReleaseUp,
                Command::PressUp,
                Command::ReleaseUp,
            ]
        );
        for pair in emitted.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
