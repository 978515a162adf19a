//! Abstract controller state.
//!
//! The host samples its devices once per tick and feeds the result into a
//! `Gamepad`; states only ever see button edges and a directional axis. No
//! raw device codes reach the engine.

use crate::board::Board;
use crate::grid::{Direction, Point};
use crate::region::RegionMap;
use std::sync::Arc;

/// Logical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Confirm
    A,
    /// Cancel / inspect
    B,
    /// Field menu
    Start,
}

impl Button {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            Button::A => 0,
            Button::B => 1,
            Button::Start => 2,
        }
    }
}

/// One button sampled across two consecutive ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    held: bool,
    was_held: bool,
}

impl ButtonState {
    /// Went down this tick
    pub fn pressed(self) -> bool {
        self.held && !self.was_held
    }

    /// Is held
    pub fn down(self) -> bool {
        self.held
    }

    /// Came up this tick
    pub fn released(self) -> bool {
        !self.held && self.was_held
    }

    /// Is not held
    pub fn up(self) -> bool {
        !self.held
    }
}

/// Per-tick controller snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gamepad {
    buttons: [ButtonState; Button::COUNT],
    axis: Point,
    last_axis: Point,
}

impl Gamepad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this tick's held buttons and axis vector (each component -1..=1)
    pub fn poll(&mut self, held: &[Button], axis: Point) {
        for (i, state) in self.buttons.iter_mut().enumerate() {
            state.was_held = state.held;
            state.held = held.iter().any(|b| b.index() == i);
        }
        self.last_axis = self.axis;
        self.axis = Point::new(axis.x.signum(), axis.y.signum());
    }

    pub fn button(&self, button: Button) -> ButtonState {
        self.buttons[button.index()]
    }

    /// Current axis vector
    pub fn axis(&self) -> Point {
        self.axis
    }

    /// The direction pushed this tick, if the axis just left neutral or
    /// changed direction. Diagonals favour the horizontal component.
    pub fn axis_pressed(&self) -> Option<Direction> {
        if self.axis == self.last_axis {
            return None;
        }
        if self.axis.x != 0 {
            Direction::from_delta(Point::new(self.axis.x, 0))
        } else {
            Direction::from_delta(Point::new(0, self.axis.y))
        }
    }
}

/// The board cursor
#[derive(Debug, Clone, Default)]
pub struct MapCursor {
    pos: Point,
    /// Shape drawn around the cursor, e.g. a blast radius preview
    pub area: Option<Arc<RegionMap>>,
}

impl MapCursor {
    pub fn new(pos: Point) -> Self {
        Self { pos, area: None }
    }

    pub fn pos(&self) -> Point {
        self.pos
    }

    /// Jump straight to `p`, clamped to the board
    pub fn teleport(&mut self, p: Point, board: &Board) {
        self.pos = Point::new(
            p.x.clamp(0, (board.width() - 1).max(0)),
            p.y.clamp(0, (board.height() - 1).max(0)),
        );
    }

    /// Step one tile; returns false at the board edge
    pub fn step(&mut self, dir: Direction, board: &Board) -> bool {
        let next = self.pos.step(dir);
        if !board.contains(next) {
            return false;
        }
        self.pos = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_edges() {
        let mut pad = Gamepad::new();
        pad.poll(&[Button::A], Point::default());
        assert!(pad.button(Button::A).pressed());
        assert!(pad.button(Button::A).down());
        assert!(pad.button(Button::B).up());

        pad.poll(&[Button::A], Point::default());
        assert!(!pad.button(Button::A).pressed());
        assert!(pad.button(Button::A).down());

        pad.poll(&[], Point::default());
        assert!(pad.button(Button::A).released());
        assert!(pad.button(Button::A).up());
    }

    #[test]
    fn test_axis_is_edge_triggered() {
        let mut pad = Gamepad::new();
        pad.poll(&[], Point::new(0, 5));
        assert_eq!(pad.axis_pressed(), Some(Direction::South));

        pad.poll(&[], Point::new(0, 1));
        assert_eq!(pad.axis_pressed(), None);

        pad.poll(&[], Point::new(-1, 1));
        assert_eq!(pad.axis_pressed(), Some(Direction::West));

        pad.poll(&[], Point::default());
        assert_eq!(pad.axis_pressed(), None);
    }

    #[test]
    fn test_cursor_clamps_to_board() {
        let board = Board::new(3, 3);
        let mut cursor = MapCursor::new(Point::new(0, 0));
        assert!(!cursor.step(Direction::North, &board));
        assert!(cursor.step(Direction::East, &board));
        cursor.teleport(Point::new(9, -4), &board);
        assert_eq!(cursor.pos(), Point::new(2, 0));
    }
}
