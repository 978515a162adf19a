//! Player seats and turn order.
//!
//! This module contains:
//! - `Player`: one seat with funds and standing
//! - `Players`: the seat roster, the current seat, and the day counter

use crate::board::{Board, PlayerId, Terrain};
use crate::grid::Point;
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};

/// One seat at the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub funds: u32,
    pub defeated: bool,
    /// Orders for this seat arrive over the network
    pub remote: bool,
    /// Cursor position when this seat last ended its turn
    pub last_cursor: Option<Point>,
    /// Headquarters location, if the map gave this seat one
    pub hq: Option<Point>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            funds: 0,
            defeated: false,
            remote: false,
            last_cursor: None,
            hq: None,
        }
    }
}

/// Outcome of a standings refresh
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Standing {
    /// Seats that became defeated during this refresh
    pub newly_defeated: Vec<PlayerId>,
    /// The winner, once only one seat remains or the day limit is hit
    pub winner: Option<PlayerId>,
}

/// The seat roster and turn order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    seats: Vec<Player>,
    current: usize,
    /// Day counter, starting at 1
    pub day: u32,
    /// The seat whose point of view is being shown locally
    pub perspective: PlayerId,
}

impl Players {
    /// Create the roster. Every seat starts with `scenario.starting_funds`,
    /// and learns its HQ location from the board.
    pub fn new(names: &[&str], board: &Board, scenario: &Scenario) -> Self {
        let seats = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = i as PlayerId;
                let mut player = Player::new(id, *name);
                player.funds = scenario.starting_funds;
                player.hq = board.properties_of(id).into_iter().find(|&p| {
                    board
                        .square_at(p)
                        .is_some_and(|s| s.terrain == Terrain::HQ)
                });
                player
            })
            .collect();

        Self {
            seats,
            current: 0,
            day: 1,
            perspective: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn all(&self) -> &[Player] {
        &self.seats
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.seats.get(id as usize)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.seats.get_mut(id as usize)
    }

    /// The seat taking its turn
    pub fn current(&self) -> &Player {
        &self.seats[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Player {
        &mut self.seats[self.current]
    }

    pub fn current_id(&self) -> PlayerId {
        self.current as PlayerId
    }

    /// Whether any seat is driven over the network
    pub fn has_remote(&self) -> bool {
        self.seats.iter().any(|p| p.remote)
    }

    /// Pass the turn to the next undefeated seat, advancing the day on wrap-around
    pub fn increment(&mut self) {
        let count = self.seats.len();
        for _ in 0..count {
            self.current += 1;
            if self.current >= count {
                self.current = 0;
                self.day += 1;
            }
            if !self.seats[self.current].defeated {
                return;
            }
        }
    }

    /// Deduct `amount` from the current seat's funds. Returns false and
    /// leaves funds untouched if they are insufficient.
    pub fn expend_funds(&mut self, amount: u32) -> bool {
        let player = self.current_mut();
        if player.funds < amount {
            return false;
        }
        player.funds -= amount;
        true
    }

    /// Credit the current seat with income for every building it owns
    pub fn collect_income(&mut self, board: &Board, scenario: &Scenario) -> u32 {
        let income = board.properties_of(self.current_id()).len() as u32 * scenario.income_per_property;
        self.current_mut().funds += income;
        income
    }

    /// Re-evaluate who is still in the game.
    ///
    /// A seat is defeated when another seat holds its HQ, or when it has no
    /// units and no building able to deploy more. When `scenario.day_limit` has
    /// passed, the seat with the most buildings wins outright.
    pub fn refresh_standing(&mut self, board: &Board, scenario: &Scenario) -> Standing {
        let mut standing = Standing::default();

        for player in self.seats.iter_mut().filter(|p| !p.defeated) {
            let lost_hq = player.hq.is_some_and(|hq| {
                board
                    .square_at(hq)
                    .is_some_and(|s| s.owner != Some(player.id))
            });
            let no_army = board.unit_count(player.id) == 0
                && !board.properties_of(player.id).iter().any(|&p| {
                    board
                        .square_at(p)
                        .is_some_and(|s| s.terrain.deploys().is_some())
                });
            if lost_hq || no_army {
                player.defeated = true;
                standing.newly_defeated.push(player.id);
            }
        }

        standing.winner = self.winner();
        if standing.winner.is_none() && scenario.day_limit.is_some_and(|limit| self.day > limit) {
            standing.winner = self
                .seats
                .iter()
                .filter(|p| !p.defeated)
                .max_by_key(|p| (board.properties_of(p.id).len(), std::cmp::Reverse(p.id)))
                .map(|p| p.id);
        }
        standing
    }

    /// The last seat standing, if only one remains
    pub fn winner(&self) -> Option<PlayerId> {
        let mut remaining = self.seats.iter().filter(|p| !p.defeated);
        match (remaining.next(), remaining.next()) {
            (Some(player), None) => Some(player.id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitType;

    fn duel_board() -> Board {
        Board::parse(
            "H0 . F0
             .  . .
             F1 . H1",
        )
        .unwrap()
    }

    fn duel() -> (Board, Players) {
        let board = duel_board();
        let players = Players::new(&["Red", "Blue"], &board, &Scenario::default());
        (board, players)
    }

    #[test]
    fn test_players_learn_hq() {
        let (_, players) = duel();
        assert_eq!(players.get(0).unwrap().hq, Some(Point::new(0, 0)));
        assert_eq!(players.get(1).unwrap().hq, Some(Point::new(2, 2)));
        assert_eq!(players.current_id(), 0);
        assert_eq!(players.day, 1);
    }

    #[test]
    fn test_increment_wraps_and_advances_day() {
        let (_, mut players) = duel();
        players.increment();
        assert_eq!(players.current_id(), 1);
        assert_eq!(players.day, 1);
        players.increment();
        assert_eq!(players.current_id(), 0);
        assert_eq!(players.day, 2);
    }

    #[test]
    fn test_increment_skips_defeated() {
        let board = Board::new(1, 1);
        let mut players = Players::new(&["A", "B", "C"], &board, &Scenario::default());
        players.get_mut(1).unwrap().defeated = true;
        players.increment();
        assert_eq!(players.current_id(), 2);
    }

    #[test]
    fn test_funds() {
        let (board, mut players) = duel();
        let income = players.collect_income(&board, &Scenario::default());
        assert_eq!(income, 2000);
        assert!(players.expend_funds(1500));
        assert_eq!(players.current().funds, 500);
        assert!(!players.expend_funds(1000));
        assert_eq!(players.current().funds, 500);
    }

    #[test]
    fn test_hq_capture_defeats() {
        let (mut board, mut players) = duel();
        board.square_at_mut(Point::new(2, 2)).unwrap().owner = Some(0);

        let standing = players.refresh_standing(&board, &Scenario::default());
        assert_eq!(standing.newly_defeated, vec![1]);
        assert_eq!(standing.winner, Some(0));
    }

    #[test]
    fn test_no_army_defeats() {
        let mut board = Board::new(3, 1);
        board.spawn_unit(Point::new(0, 0), UnitType::Infantry, 0).unwrap();
        let mut players = Players::new(&["A", "B"], &board, &Scenario::default());

        let standing = players.refresh_standing(&board, &Scenario::default());
        assert_eq!(standing.newly_defeated, vec![1]);
        assert_eq!(players.winner(), Some(0));
    }

    #[test]
    fn test_day_limit_awards_most_properties() {
        let (mut board, mut players) = duel();
        board.square_at_mut(Point::new(0, 1)).unwrap().terrain = Terrain::City;
        board.square_at_mut(Point::new(0, 1)).unwrap().owner = Some(1);
        let scenario = Scenario {
            day_limit: Some(3),
            ..Scenario::default()
        };

        assert_eq!(players.refresh_standing(&board, &scenario).winner, None);
        players.day = 4;
        assert_eq!(players.refresh_standing(&board, &scenario).winner, Some(1));
    }
}
