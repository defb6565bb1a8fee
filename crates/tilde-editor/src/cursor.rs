//! Cursor motions on the visible grid.
//!
//! A [`Motion`] moves a [`Position`] within a screen [`Size`]. Every motion
//! clamps at the edges: moving left from column 0 stays at column 0, it
//! never wraps to the previous row.

use tilde_term::geometry::{Position, Size};
use tilde_term::input::Key;

/// A cursor movement triggered by a navigation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Up,
    Down,
    Left,
    Right,
    /// First column.
    LineStart,
    /// Last column.
    LineEnd,
    /// One screen up (lands on the top row).
    PageUp,
    /// One screen down (lands on the bottom row).
    PageDown,
}

impl Motion {
    /// The motion bound to `key`, if any.
    #[must_use]
    pub const fn from_key(key: Key) -> Option<Self> {
        Some(match key {
            Key::ArrowUp => Self::Up,
            Key::ArrowDown => Self::Down,
            Key::ArrowLeft => Self::Left,
            Key::ArrowRight => Self::Right,
            Key::Home => Self::LineStart,
            Key::End => Self::LineEnd,
            Key::PageUp => Self::PageUp,
            Key::PageDown => Self::PageDown,
            Key::Byte(_) | Key::Delete | Key::Escape => return None,
        })
    }

    /// Apply the motion to `pos`, staying inside `size`.
    ///
    /// The input position is clamped first, so a stale position from a
    /// larger screen can't escape the grid either.
    #[must_use]
    pub fn apply(self, pos: Position, size: Size) -> Position {
        let Position { x, y } = pos.clamp_to(size);
        let last_col = size.cols.saturating_sub(1);
        let last_row = size.rows.saturating_sub(1);

        match self {
            Self::Up => Position::new(x, y.saturating_sub(1)),
            Self::Down => Position::new(x, (y + 1).min(last_row)),
            Self::Left => Position::new(x.saturating_sub(1), y),
            Self::Right => Position::new((x + 1).min(last_col), y),
            Self::LineStart => Position::new(0, y),
            Self::LineEnd => Position::new(last_col, y),
            Self::PageUp => Position::new(x, y.saturating_sub(size.rows)),
            Self::PageDown => Position::new(x, y.saturating_add(size.rows).min(last_row)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const SIZE: Size = Size::new(24, 80);

    fn at(x: u16, y: u16) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn arrows_move_by_one() {
        assert_eq!(Motion::Up.apply(at(5, 5), SIZE), at(5, 4));
        assert_eq!(Motion::Down.apply(at(5, 5), SIZE), at(5, 6));
        assert_eq!(Motion::Left.apply(at(5, 5), SIZE), at(4, 5));
        assert_eq!(Motion::Right.apply(at(5, 5), SIZE), at(6, 5));
    }

    #[test]
    fn edges_clamp_instead_of_wrapping() {
        assert_eq!(Motion::Up.apply(at(3, 0), SIZE), at(3, 0));
        assert_eq!(Motion::Left.apply(at(0, 7), SIZE), at(0, 7));
        assert_eq!(Motion::Down.apply(at(3, 23), SIZE), at(3, 23));
        assert_eq!(Motion::Right.apply(at(79, 7), SIZE), at(79, 7));
    }

    #[test]
    fn home_and_end() {
        assert_eq!(Motion::LineStart.apply(at(42, 9), SIZE), at(0, 9));
        assert_eq!(Motion::LineEnd.apply(at(42, 9), SIZE), at(79, 9));
    }

    #[test]
    fn paging_lands_on_screen_edges() {
        assert_eq!(Motion::PageUp.apply(at(10, 12), SIZE), at(10, 0));
        assert_eq!(Motion::PageDown.apply(at(10, 12), SIZE), at(10, 23));
    }

    #[test]
    fn stale_position_is_clamped_first() {
        assert_eq!(Motion::Left.apply(at(500, 500), SIZE), at(78, 23));
    }

    #[test]
    fn key_bindings() {
        assert_eq!(Motion::from_key(Key::ArrowUp), Some(Motion::Up));
        assert_eq!(Motion::from_key(Key::Home), Some(Motion::LineStart));
        assert_eq!(Motion::from_key(Key::PageDown), Some(Motion::PageDown));
        assert_eq!(Motion::from_key(Key::Delete), None);
        assert_eq!(Motion::from_key(Key::Escape), None);
        assert_eq!(Motion::from_key(Key::Byte(b'h')), None);
    }

    fn motion() -> impl Strategy<Value = Motion> {
        prop_oneof![
            Just(Motion::Up),
            Just(Motion::Down),
            Just(Motion::Left),
            Just(Motion::Right),
            Just(Motion::LineStart),
            Just(Motion::LineEnd),
            Just(Motion::PageUp),
            Just(Motion::PageDown),
        ]
    }

    proptest! {
        #[test]
        fn motions_stay_on_screen(
            rows in 1u16..=500,
            cols in 1u16..=500,
            x in any::<u16>(),
            y in any::<u16>(),
            moves in proptest::collection::vec(motion(), 0..64),
        ) {
            let size = Size::new(rows, cols);
            let mut pos = Position::new(x, y).clamp_to(size);
            for m in moves {
                pos = m.apply(pos, size);
                prop_assert!(pos.is_within(size), "{pos:?} escaped {size:?} after {m:?}");
            }
        }

        #[test]
        fn single_steps_change_one_axis_by_at_most_one(
            x in 0u16..80,
            y in 0u16..24,
            m in prop_oneof![
                Just(Motion::Up),
                Just(Motion::Down),
                Just(Motion::Left),
                Just(Motion::Right),
            ],
        ) {
            let next = m.apply(Position::new(x, y), SIZE);
            let dx = x.abs_diff(next.x);
            let dy = y.abs_diff(next.y);
            prop_assert!(dx + dy <= 1);
        }
    }
}
