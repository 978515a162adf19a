//! Built-in battlefields.

use crate::assets::BattleAssets;
use crate::board::{Board, MapError, PlayerId};
use crate::grid::Point;
use crate::player::Players;
use crate::scenario::Scenario;
use crate::unit::UnitType;

/// A named map: terrain text, starting units, and an opening briefing
#[derive(Debug, Clone, Copy)]
pub struct MapDef {
    pub name: &'static str,
    pub seats: usize,
    pub terrain: &'static str,
    pub units: &'static [(i32, i32, UnitType, PlayerId)],
    pub intro: &'static [&'static str],
}

const DUEL: MapDef = MapDef {
    name: "duel",
    seats: 2,
    terrain: "
        H0 .  .  T  .  .  .  C
        F0 .  =  =  =  =  .  .
        .  .  =  ^  r  .  .  .
        .  .  .  r  ^  =  .  .
        .  .  =  =  =  =  .  F1
        C  .  .  .  T  .  .  H1
    ",
    units: &[
        (1, 0, UnitType::Infantry, 0),
        (1, 1, UnitType::Tank, 0),
        (6, 5, UnitType::Infantry, 1),
        (6, 4, UnitType::Tank, 1),
    ],
    intro: &[],
};

const DEVROOM: MapDef = MapDef {
    name: "devroom",
    seats: 2,
    terrain: "
        H0 F0 .  .  S  .  ~  ~
        .  .  .  .  .  ,  ~  ~
        .  A0 .  =  =  ,  ~  ~
        .  .  .  =  =  ,  P0 ~
        C  .  .  .  .  .  .  F1
        .  .  .  T  .  .  .  H1
    ",
    units: &[
        (3, 0, UnitType::Mech, 0),
        (1, 1, UnitType::Infantry, 0),
        (2, 1, UnitType::Apc, 0),
        (4, 1, UnitType::Artillery, 0),
        (5, 2, UnitType::Lander, 0),
        (5, 4, UnitType::Infantry, 1),
        (6, 4, UnitType::Tank, 1),
        (6, 5, UnitType::Recon, 1),
    ],
    intro: &[
        "Every command has something to do on this field.",
        "The silo north of the road is still loaded.",
    ],
};

/// Every built-in map
pub const MAPS: [MapDef; 2] = [DUEL, DEVROOM];

/// Look up a built-in map by name
pub fn named(name: &str) -> Option<&'static MapDef> {
    MAPS.iter().find(|m| m.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    MAPS.iter().map(|m| m.name)
}

impl MapDef {
    /// Parse the terrain and place the starting units
    pub fn build(&self) -> Result<Board, MapError> {
        let mut board = Board::parse(self.terrain)?;
        for &(x, y, kind, owner) in self.units {
            board.spawn_unit(Point::new(x, y), kind, owner)?;
        }
        Ok(board)
    }

    /// Everything a manager needs to start a game on this map
    pub fn assets(&self, seats: &[&str], scenario: Scenario) -> Result<BattleAssets, MapError> {
        let board = self.build()?;
        let players = Players::new(seats, &board, &scenario);
        let mut assets = BattleAssets::new(board, players, scenario);
        assets.intro = self.intro.iter().map(|line| line.to_string()).collect();
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Terrain;

    #[test]
    fn test_every_map_builds() {
        for map in MAPS {
            let board = map.build().unwrap();
            assert_eq!(board.width(), 8, "{}", map.name);
            for seat in 0..map.seats as PlayerId {
                assert!(board.unit_count(seat) > 0, "{} seat {seat}", map.name);
            }
        }
    }

    #[test]
    fn test_named_lookup() {
        assert_eq!(named("duel").map(|m| m.seats), Some(2));
        assert!(named("nowhere").is_none());
        assert_eq!(names().collect::<Vec<_>>(), vec!["duel", "devroom"]);
    }

    #[test]
    fn test_assets_find_headquarters() {
        let assets = DEVROOM.assets(&["Red", "Blue"], Scenario::default()).unwrap();
        assert_eq!(assets.players.get(0).unwrap().hq, Some(Point::new(0, 0)));
        assert_eq!(assets.players.get(1).unwrap().hq, Some(Point::new(7, 5)));
        assert_eq!(assets.intro.len(), 2);
        assert_eq!(
            assets.board.square_at(Point::new(4, 0)).map(|s| s.terrain),
            Some(Terrain::Silo)
        );
        // Units start asleep until their seat's standby phase
        assert!(assets.board.units().all(|(_, u)| !u.orderable));
    }
}
