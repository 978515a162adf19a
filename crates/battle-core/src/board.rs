//! Battlefield representation.
//!
//! This module contains:
//! - `Terrain`: tile kinds and their movement costs
//! - `Square`: one tile, with its occupant and display overlay flags
//! - `Board`: the grid, unit placement, and movement/attack range queries

use crate::grid::{Direction, Point};
use crate::region::RegionMap;
use crate::unit::{MoveType, Unit, UnitClass, UnitId, UnitType};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;

/// Player identifier (seat index)
pub type PlayerId = u8;

/// Capture points of an unoccupied building
pub const CAPTURE_POINTS: u32 = 20;

/// Tile kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Plain,
    Road,
    Wood,
    Mountain,
    River,
    Shoal,
    Sea,
    City,
    Factory,
    Airport,
    Port,
    HQ,
    /// Missile silo that can still be launched
    Silo,
    /// Missile silo that has been fired
    UsedSilo,
}

impl Terrain {
    /// Map glyph used by `Board::parse`
    pub fn glyph(self) -> char {
        match self {
            Terrain::Plain => '.',
            Terrain::Road => '=',
            Terrain::Wood => 'T',
            Terrain::Mountain => '^',
            Terrain::River => 'r',
            Terrain::Shoal => ',',
            Terrain::Sea => '~',
            Terrain::City => 'C',
            Terrain::Factory => 'F',
            Terrain::Airport => 'A',
            Terrain::Port => 'P',
            Terrain::HQ => 'H',
            Terrain::Silo => 'S',
            Terrain::UsedSilo => 's',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Terrain> {
        let terrain = match glyph {
            '.' => Terrain::Plain,
            '=' => Terrain::Road,
            'T' => Terrain::Wood,
            '^' => Terrain::Mountain,
            'r' => Terrain::River,
            ',' => Terrain::Shoal,
            '~' => Terrain::Sea,
            'C' => Terrain::City,
            'F' => Terrain::Factory,
            'A' => Terrain::Airport,
            'P' => Terrain::Port,
            'H' => Terrain::HQ,
            'S' => Terrain::Silo,
            's' => Terrain::UsedSilo,
            _ => return None,
        };
        Some(terrain)
    }

    /// Buildings can be owned, captured, and pay income
    pub fn is_property(self) -> bool {
        matches!(
            self,
            Terrain::City | Terrain::Factory | Terrain::Airport | Terrain::Port | Terrain::HQ
        )
    }

    /// The unit class this building deploys, if any
    pub fn deploys(self) -> Option<UnitClass> {
        match self {
            Terrain::Factory => Some(UnitClass::Ground),
            Terrain::Airport => Some(UnitClass::Air),
            Terrain::Port => Some(UnitClass::Naval),
            _ => None,
        }
    }

    /// Whether this building repairs and resupplies units of `class`
    pub fn repairs(self, class: UnitClass) -> bool {
        match self {
            Terrain::City | Terrain::Factory | Terrain::HQ => class == UnitClass::Ground,
            Terrain::Airport => class == UnitClass::Air,
            Terrain::Port => class == UnitClass::Naval,
            _ => false,
        }
    }

    /// Movement points needed to enter this terrain, or `None` if impassable
    pub fn move_cost(self, move_type: MoveType) -> Option<u32> {
        use MoveType::*;
        match (self, move_type) {
            (_, Air) => Some(1),
            (Terrain::Sea, Ship) | (Terrain::Shoal, Ship) | (Terrain::Port, Ship) => Some(1),
            (_, Ship) | (Terrain::Sea, _) => None,
            (Terrain::Plain, Tires) => Some(2),
            (Terrain::Wood, Treads) => Some(2),
            (Terrain::Wood, Tires) => Some(3),
            (Terrain::Mountain | Terrain::River, Foot) => Some(2),
            (Terrain::Mountain | Terrain::River, Treads | Tires) => None,
            _ => Some(1),
        }
    }
}

/// Display overlay flags for one square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Overlay {
    /// Reachable by the selected unit
    pub moveable: bool,
    /// Inside the selected unit's attack range
    pub attackable: bool,
    /// Selectable as an order target
    pub targetable: bool,
    /// Lies on the boundary of a highlighted region
    pub outline: bool,
    /// The occupant is drawn elsewhere (e.g. following the cursor)
    pub hide_unit: bool,
}

/// One tile of the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub terrain: Terrain,
    pub owner: Option<PlayerId>,
    /// Remaining capture points for buildings
    pub capture_points: u32,
    pub unit: Option<Unit>,
    #[serde(skip)]
    pub overlay: Overlay,
}

impl Square {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            owner: None,
            capture_points: CAPTURE_POINTS,
            unit: None,
            overlay: Overlay::default(),
        }
    }
}

/// A point together with its in-bounds orthogonal neighbours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbors {
    pub center: Point,
    pub orthogonals: Vec<Point>,
}

/// Board mutation failures
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("{0} is outside the board")]
    OutOfBounds(Point),

    #[error("{0} is already occupied")]
    Occupied(Point),

    #[error("no unit at {0}")]
    Vacant(Point),
}

/// Map text parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map has no rows")]
    Empty,

    #[error("row {row} has {found} tiles, expected {expected}")]
    Ragged {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("unknown map token '{0}'")]
    UnknownToken(String),

    #[error("terrain at {0} cannot be owned")]
    UnownableTerrain(Point),

    #[error("cannot place unit: {0}")]
    Unit(#[from] BoardError),
}

/// Reachable tiles for one unit, with the cheapest cost to each
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementMap {
    pub origin: Point,
    pub budget: u32,
    costs: HashMap<Point, u32>,
    came_from: HashMap<Point, Direction>,
}

impl MovementMap {
    pub fn contains(&self, p: Point) -> bool {
        self.costs.contains_key(&p)
    }

    pub fn cost_to(&self, p: Point) -> Option<u32> {
        self.costs.get(&p).copied()
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.costs.keys().copied()
    }

    /// The cheapest path from the origin to `goal`
    pub fn path_to(&self, goal: Point) -> Option<Vec<Direction>> {
        if !self.contains(goal) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = goal;
        while current != self.origin {
            let dir = *self.came_from.get(&current)?;
            path.push(dir);
            current = current.step(dir.opposite());
        }
        path.reverse();
        Some(path)
    }
}

/// The battlefield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: i32,
    height: i32,
    /// Row-major squares
    squares: Vec<Square>,
    next_unit_id: UnitId,
}

impl Board {
    /// An all-plains board
    pub fn new(width: i32, height: i32) -> Self {
        let count = (width.max(0) * height.max(0)) as usize;
        Self {
            width: width.max(0),
            height: height.max(0),
            squares: vec![Square::new(Terrain::Plain); count],
            next_unit_id: 1,
        }
    }

    /// Parse a board from whitespace-separated tokens, one line per row.
    ///
    /// Each token is a terrain glyph optionally followed by an owner digit,
    /// e.g. `H0` for player 0's headquarters.
    pub fn parse(text: &str) -> Result<Self, MapError> {
        let rows: Vec<Vec<&str>> = text
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect();

        let width = rows.first().ok_or(MapError::Empty)?.len();
        let mut board = Board::new(width as i32, rows.len() as i32);

        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MapError::Ragged {
                    row: y,
                    found: row.len(),
                    expected: width,
                });
            }
            for (x, token) in row.iter().enumerate() {
                let point = Point::new(x as i32, y as i32);
                let mut chars = token.chars();
                let terrain = chars
                    .next()
                    .and_then(Terrain::from_glyph)
                    .ok_or_else(|| MapError::UnknownToken(token.to_string()))?;
                let rest: String = chars.collect();
                let owner = if rest.is_empty() {
                    None
                } else {
                    let id = rest
                        .parse::<PlayerId>()
                        .map_err(|_| MapError::UnknownToken(token.to_string()))?;
                    if !terrain.is_property() {
                        return Err(MapError::UnownableTerrain(point));
                    }
                    Some(id)
                };

                if let Some(square) = board.square_at_mut(point) {
                    square.terrain = terrain;
                    square.owner = owner;
                }
            }
        }

        Ok(board)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    fn index(&self, p: Point) -> Option<usize> {
        self.contains(p)
            .then(|| (p.y * self.width + p.x) as usize)
    }

    /// Every point on the board, row by row
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Point::new(x, y)))
    }

    pub fn square_at(&self, p: Point) -> Option<&Square> {
        self.index(p).map(|i| &self.squares[i])
    }

    pub fn square_at_mut(&mut self, p: Point) -> Option<&mut Square> {
        self.index(p).map(move |i| &mut self.squares[i])
    }

    pub fn neighbors_at(&self, p: Point) -> Neighbors {
        Neighbors {
            center: p,
            orthogonals: p
                .neighbors()
                .into_iter()
                .filter(|&n| self.contains(n))
                .collect(),
        }
    }

    pub fn unit_at(&self, p: Point) -> Option<&Unit> {
        self.square_at(p).and_then(|s| s.unit.as_ref())
    }

    pub fn unit_at_mut(&mut self, p: Point) -> Option<&mut Unit> {
        self.square_at_mut(p).and_then(|s| s.unit.as_mut())
    }

    /// Put `unit` on an empty square
    pub fn place_unit(&mut self, p: Point, unit: Unit) -> Result<(), BoardError> {
        let square = self.square_at_mut(p).ok_or(BoardError::OutOfBounds(p))?;
        if square.unit.is_some() {
            return Err(BoardError::Occupied(p));
        }
        square.unit = Some(unit);
        Ok(())
    }

    /// Create a new unit of `kind` for `owner` at `p`
    pub fn spawn_unit(
        &mut self,
        p: Point,
        kind: UnitType,
        owner: PlayerId,
    ) -> Result<UnitId, BoardError> {
        let id = self.next_unit_id;
        self.place_unit(p, Unit::new(id, kind, owner))?;
        self.next_unit_id += 1;
        Ok(id)
    }

    /// Take the unit off square `p`
    pub fn remove_unit(&mut self, p: Point) -> Result<Unit, BoardError> {
        let square = self.square_at_mut(p).ok_or(BoardError::OutOfBounds(p))?;
        square.unit.take().ok_or(BoardError::Vacant(p))
    }

    /// Relocate the unit at `from` to the empty square `to`
    pub fn move_unit(&mut self, from: Point, to: Point) -> Result<(), BoardError> {
        if from == to {
            return self.unit_at(from).map(|_| ()).ok_or(BoardError::Vacant(from));
        }
        if !self.contains(to) {
            return Err(BoardError::OutOfBounds(to));
        }
        if self.unit_at(to).is_some() {
            return Err(BoardError::Occupied(to));
        }
        let unit = self.remove_unit(from)?;
        self.place_unit(to, unit)
    }

    /// Movement cost of walking `path` from `from`, or `None` if any step is impassable
    pub fn travel_cost_for_path(
        &self,
        from: Point,
        path: &[Direction],
        move_type: MoveType,
    ) -> Option<u32> {
        from.trail(path).into_iter().try_fold(0, |total, p| {
            let cost = self.square_at(p)?.terrain.move_cost(move_type)?;
            Some(total + cost)
        })
    }

    /// Whether `unit` could stand on `p` (in bounds, passable, empty)
    pub fn occupiable(&self, p: Point, unit: &Unit) -> bool {
        self.square_at(p).is_some_and(|s| {
            s.unit.is_none() && s.terrain.move_cost(unit.kind.move_type()).is_some()
        })
    }

    /// Tiles the unit at `from` can reach this turn.
    ///
    /// Enemy units block; allied units may be passed through. The budget is
    /// the lesser of the unit's move points and remaining fuel.
    pub fn reachable(&self, from: Point) -> Option<MovementMap> {
        let unit = self.unit_at(from)?;
        let move_type = unit.kind.move_type();
        let budget = unit.kind.move_points().min(unit.fuel);

        let mut costs = HashMap::from([(from, 0)]);
        let mut came_from = HashMap::new();
        let mut frontier = BinaryHeap::from([Reverse((0u32, from))]);

        while let Some(Reverse((cost, p))) = frontier.pop() {
            if costs.get(&p).is_some_and(|&best| cost > best) {
                continue;
            }
            for dir in Direction::ALL {
                let next = p.step(dir);
                let Some(square) = self.square_at(next) else {
                    continue;
                };
                if square.unit.as_ref().is_some_and(|u| u.owner != unit.owner) {
                    continue;
                }
                let Some(step) = square.terrain.move_cost(move_type) else {
                    continue;
                };
                let total = cost + step;
                if total > budget || costs.get(&next).is_some_and(|&best| best <= total) {
                    continue;
                }
                costs.insert(next, total);
                came_from.insert(next, dir);
                frontier.push(Reverse((total, next)));
            }
        }

        Some(MovementMap {
            origin: from,
            budget,
            costs,
            came_from,
        })
    }

    /// Compute the movement map for the unit at `from` and highlight it
    pub fn generate_movement_map(&mut self, from: Point) -> Option<MovementMap> {
        let map = self.reachable(from)?;
        for p in map.points() {
            if let Some(square) = self.square_at_mut(p) {
                square.overlay.moveable = true;
            }
        }
        Some(map)
    }

    /// Highlight `region` centred on `center` as an attack range.
    ///
    /// Returns the in-bounds member points.
    pub fn generate_attack_range_map(&mut self, center: Point, region: &RegionMap) -> Vec<Point> {
        let mut points = Vec::new();
        for offset in region.points() {
            let p = center + offset;
            let outline = region.extremity(offset);
            if let Some(square) = self.square_at_mut(p) {
                square.overlay.attackable = true;
                square.overlay.outline = outline;
                points.push(p);
            }
        }
        points
    }

    /// Reset every overlay flag on the board
    pub fn clear_tile_overlay(&mut self) {
        for square in &mut self.squares {
            square.overlay = Overlay::default();
        }
    }

    /// Units on the board owned by `owner`
    pub fn units_of(&self, owner: PlayerId) -> impl Iterator<Item = (Point, &Unit)> + '_ {
        self.units().filter(move |(_, u)| u.owner == owner)
    }

    /// All units on the board
    pub fn units(&self) -> impl Iterator<Item = (Point, &Unit)> + '_ {
        self.points()
            .filter_map(move |p| self.unit_at(p).map(|u| (p, u)))
    }

    /// Number of units `owner` fields, counting transported cargo
    pub fn unit_count(&self, owner: PlayerId) -> usize {
        self.units_of(owner).map(|(_, u)| 1 + u.loaded.len()).sum()
    }

    /// Buildings owned by `owner`
    pub fn properties_of(&self, owner: PlayerId) -> Vec<Point> {
        self.points()
            .filter(|&p| {
                self.square_at(p)
                    .is_some_and(|s| s.terrain.is_property() && s.owner == Some(owner))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strip() -> Board {
        Board::parse(
            ". . T ^ .
             = = = = =
             ~ ~ , . H0",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_board() {
        let board = strip();
        assert_eq!(board.width(), 5);
        assert_eq!(board.height(), 3);
        assert_eq!(board.square_at(Point::new(2, 0)).unwrap().terrain, Terrain::Wood);
        let hq = board.square_at(Point::new(4, 2)).unwrap();
        assert_eq!(hq.terrain, Terrain::HQ);
        assert_eq!(hq.owner, Some(0));
        assert!(board.square_at(Point::new(5, 0)).is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Board::parse(""), Err(MapError::Empty));
        assert!(matches!(Board::parse(". .\n."), Err(MapError::Ragged { row: 1, .. })));
        assert_eq!(
            Board::parse(". X"),
            Err(MapError::UnknownToken("X".to_string()))
        );
        assert_eq!(
            Board::parse(".1"),
            Err(MapError::UnownableTerrain(Point::new(0, 0)))
        );
    }

    #[test]
    fn test_neighbors_stay_in_bounds() {
        let board = strip();
        let corner = board.neighbors_at(Point::new(0, 0));
        assert_eq!(corner.orthogonals, vec![Point::new(1, 0), Point::new(0, 1)]);
        assert_eq!(board.neighbors_at(Point::new(2, 1)).orthogonals.len(), 4);
    }

    #[test]
    fn test_place_move_remove() {
        let mut board = strip();
        let a = Point::new(0, 1);
        let b = Point::new(3, 1);
        board.spawn_unit(a, UnitType::Tank, 0).unwrap();

        assert_eq!(
            board.spawn_unit(a, UnitType::Tank, 0),
            Err(BoardError::Occupied(a))
        );
        board.move_unit(a, b).unwrap();
        assert!(board.unit_at(a).is_none());
        assert_eq!(board.unit_at(b).unwrap().kind, UnitType::Tank);
        assert_eq!(board.remove_unit(a), Err(BoardError::Vacant(a)));
        assert!(board.remove_unit(b).is_ok());
    }

    #[test]
    fn test_travel_cost() {
        use Direction::*;
        let board = strip();
        let start = Point::new(0, 0);

        assert_eq!(
            board.travel_cost_for_path(start, &[East, East], MoveType::Treads),
            Some(3)
        );
        assert_eq!(
            board.travel_cost_for_path(start, &[East, East, East], MoveType::Treads),
            None
        );
        assert_eq!(
            board.travel_cost_for_path(start, &[East, East, East], MoveType::Foot),
            Some(4)
        );
        assert_eq!(board.travel_cost_for_path(start, &[North], MoveType::Air), None);
    }

    #[test]
    fn test_movement_map_blocks_on_enemies() {
        let mut board = Board::new(6, 1);
        board.spawn_unit(Point::new(0, 0), UnitType::Infantry, 0).unwrap();
        board.spawn_unit(Point::new(1, 0), UnitType::Infantry, 0).unwrap();
        board.spawn_unit(Point::new(3, 0), UnitType::Infantry, 1).unwrap();

        let map = board.reachable(Point::new(0, 0)).unwrap();
        assert!(map.contains(Point::new(1, 0)));
        assert!(map.contains(Point::new(2, 0)));
        assert!(!map.contains(Point::new(3, 0)));
        assert!(!map.contains(Point::new(4, 0)));
        assert_eq!(map.path_to(Point::new(2, 0)), Some(vec![Direction::East, Direction::East]));
    }

    #[test]
    fn test_movement_budget_is_limited_by_fuel() {
        let mut board = Board::new(10, 1);
        board.spawn_unit(Point::new(0, 0), UnitType::Tank, 0).unwrap();
        board.unit_at_mut(Point::new(0, 0)).unwrap().fuel = 2;

        let map = board.generate_movement_map(Point::new(0, 0)).unwrap();
        assert_eq!(map.budget, 2);
        assert!(map.contains(Point::new(2, 0)));
        assert!(!map.contains(Point::new(3, 0)));
        assert!(board.square_at(Point::new(2, 0)).unwrap().overlay.moveable);

        board.clear_tile_overlay();
        assert!(!board.square_at(Point::new(2, 0)).unwrap().overlay.moveable);
    }

    #[test]
    fn test_attack_range_map_marks_outline() {
        let mut board = Board::new(7, 7);
        let center = Point::new(3, 3);
        let region = RegionMap::range(2, 3);
        let points = board.generate_attack_range_map(center, &region);

        assert_eq!(points.len(), region.points().len());
        let outer = board.square_at(Point::new(3, 0)).unwrap().overlay;
        assert!(outer.attackable && outer.outline);
        assert!(!board.square_at(center).unwrap().overlay.attackable);
    }

    #[test]
    fn test_properties_and_units() {
        let mut board = strip();
        board.spawn_unit(Point::new(0, 0), UnitType::Apc, 0).unwrap();
        board.spawn_unit(Point::new(1, 0), UnitType::Mech, 1).unwrap();
        board.unit_at_mut(Point::new(0, 0)).unwrap().loaded.push(Unit::new(99, UnitType::Infantry, 0));

        assert_eq!(board.properties_of(0), vec![Point::new(4, 2)]);
        assert!(board.properties_of(1).is_empty());
        assert_eq!(board.unit_count(0), 2);
        assert_eq!(board.units_of(1).count(), 1);
    }
}
