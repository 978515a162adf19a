//! Square grid coordinates.
//!
//! The battlefield is an orthogonal grid. This module provides:
//! - `Point`: a tile coordinate (x grows east, y grows south)
//! - `Direction`: the four orthogonal step directions
//!
//! Paths are stored as direction lists rather than point lists so they stay
//! compact on the wire and can be replayed from any starting tile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// One orthogonal step on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward y - 1
    North,
    /// Toward x + 1
    East,
    /// Toward y + 1
    South,
    /// Toward x - 1
    West,
}

impl Direction {
    /// All directions in clockwise order starting from North
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// The unit vector for this direction
    pub const fn unit(self) -> Point {
        match self {
            Direction::North => Point::new(0, -1),
            Direction::East => Point::new(1, 0),
            Direction::South => Point::new(0, 1),
            Direction::West => Point::new(-1, 0),
        }
    }

    /// The direction pointing the other way
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// The direction of a unit delta, if the delta is exactly one orthogonal step
    pub fn from_delta(delta: Point) -> Option<Direction> {
        match (delta.x, delta.y) {
            (0, -1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }
}

/// A tile coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Point {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring point one step in `dir`
    pub fn step(self, dir: Direction) -> Point {
        self + dir.unit()
    }

    /// The four orthogonal neighbours in `Direction::ALL` order
    pub fn neighbors(self) -> [Point; 4] {
        Direction::ALL.map(|dir| self.step(dir))
    }

    /// Manhattan (taxicab) distance to another point
    pub fn manhattan_distance(self, other: Point) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The point reached by walking every step of `path` from here
    pub fn follow(self, path: &[Direction]) -> Point {
        path.iter().fold(self, |p, &dir| p.step(dir))
    }

    /// Every point visited while walking `path`, excluding the start
    pub fn trail(self, path: &[Direction]) -> Vec<Point> {
        let mut current = self;
        path.iter()
            .map(|&dir| {
                current = current.step(dir);
                current
            })
            .collect()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}
