//! Region maps: boolean occupancy shapes queried relative to an origin.
//!
//! A `RegionMap` describes a shape on an unbounded grid, such as a unit's
//! attack range or a missile's blast area. The backing grid only covers the
//! shape's bounding box; every query outside it answers "not a member".
//!
//! Range shapes are a closed set derived from unit stats, so they are built
//! once and memoized in a `RangeSieve`.

use crate::grid::{Direction, Point};
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable occupancy grid with an origin offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMap {
    /// Column-major cells: `cells[x][y]`
    cells: Vec<Vec<bool>>,
    /// Grid position of the logical center
    origin: Point,
}

impl RegionMap {
    /// Build a region from column-major cells and the grid position of its center.
    ///
    /// Ragged columns are padded with non-members up to the tallest column.
    pub fn new(mut cells: Vec<Vec<bool>>, origin: Point) -> Self {
        let height = cells.iter().map(Vec::len).max().unwrap_or(0);
        for column in &mut cells {
            column.resize(height, false);
        }
        Self { cells, origin }
    }

    /// A region with no members
    pub fn empty() -> Self {
        Self {
            cells: Vec::new(),
            origin: Point::default(),
        }
    }

    /// All points whose Manhattan distance from the origin lies in `[min, max]`.
    ///
    /// Negative bounds produce an empty region.
    pub fn range(min: i32, max: i32) -> Self {
        if min < 0 || max < 0 {
            return Self::empty();
        }

        let side = 2 * max + 1;
        let center = Point::new(max, max);
        let cells = (0..side)
            .map(|x| {
                (0..side)
                    .map(|y| {
                        let distance = Point::new(x, y).manhattan_distance(center) as i32;
                        distance >= min && distance <= max
                    })
                    .collect()
            })
            .collect();

        Self {
            cells,
            origin: center,
        }
    }

    /// Width of the backing grid
    pub fn width(&self) -> i32 {
        self.cells.len() as i32
    }

    /// Height of the backing grid
    pub fn height(&self) -> i32 {
        self.cells.first().map_or(0, |c| c.len() as i32)
    }

    /// Grid position of the logical center
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Whether the origin-relative point `p` is a member
    pub fn get(&self, p: Point) -> bool {
        let q = p + self.origin;
        if q.x < 0 || q.y < 0 {
            return false;
        }
        self.cells
            .get(q.x as usize)
            .and_then(|column| column.get(q.y as usize))
            .copied()
            .unwrap_or(false)
    }

    /// True when `p` is a member with at least one orthogonal non-member neighbour
    pub fn extremity(&self, p: Point) -> bool {
        self.get(p) && Direction::ALL.iter().any(|&dir| !self.get(p.step(dir)))
    }

    /// Member points, relative to the origin
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::new();
        for (x, column) in self.cells.iter().enumerate() {
            for (y, &member) in column.iter().enumerate() {
                if member {
                    points.push(Point::new(x as i32, y as i32) - self.origin);
                }
            }
        }
        points
    }

    /// Member points translated so the origin sits at `center`
    pub fn points_around(&self, center: Point) -> Vec<Point> {
        self.points().into_iter().map(|p| p + center).collect()
    }

    /// Whether the region has no members at all
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|column| column.iter().all(|&m| !m))
    }

    /// Mirror across the vertical axis through the origin
    pub fn flip_horz(&self) -> Self {
        let w = self.width();
        let cells = self.cells.iter().rev().cloned().collect();
        Self {
            cells,
            origin: Point::new(w - 1 - self.origin.x, self.origin.y),
        }
    }

    /// Mirror across the horizontal axis through the origin
    pub fn flip_vert(&self) -> Self {
        let h = self.height();
        let cells = self
            .cells
            .iter()
            .map(|column| column.iter().rev().copied().collect())
            .collect();
        Self {
            cells,
            origin: Point::new(self.origin.x, h - 1 - self.origin.y),
        }
    }

    /// Rotate clockwise by `turns` quarter turns. Any integer is accepted;
    /// it is normalized into `0..4` first.
    pub fn rotate90(&self, turns: i32) -> Self {
        let mut region = self.clone();
        for _ in 0..turns.rem_euclid(4) {
            region = region.rotate_once();
        }
        region
    }

    /// One clockwise quarter turn: relative (x, y) becomes (-y, x)
    fn rotate_once(&self) -> Self {
        let w = self.width() as usize;
        let h = self.height() as usize;
        let mut cells = vec![vec![false; w]; h];
        for (x, column) in self.cells.iter().enumerate() {
            for (y, &member) in column.iter().enumerate() {
                cells[h - 1 - y][x] = member;
            }
        }
        Self {
            cells,
            origin: Point::new(h as i32 - 1 - self.origin.y, self.origin.x),
        }
    }
}

/// Memoized range shapes keyed by `(min, max)`.
///
/// Bounds below -1 are clamped to -1 so every empty shape shares one entry.
#[derive(Debug, Default, Clone)]
pub struct RangeSieve {
    shapes: HashMap<(i32, i32), Arc<RegionMap>>,
}

impl RangeSieve {
    pub fn new() -> Self {
        Self::default()
    }

    /// The range shape for `(min, max)`, built on first request
    pub fn get(&mut self, min: i32, max: i32) -> Arc<RegionMap> {
        let key = (min.max(-1), max.max(-1));
        Arc::clone(
            self.shapes
                .entry(key)
                .or_insert_with(|| Arc::new(RegionMap::range(key.0, key.1))),
        )
    }

    /// Number of distinct shapes built so far
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
