//! Everything a turn state reads or writes.
//!
//! `BattleAssets` is owned by the `BattleSystemManager` and lent to the active
//! state for each lifecycle call. It bundles the board and roster with the
//! in-progress instruction, the controller, and the network mailboxes.

use crate::board::{Board, PlayerId};
use crate::command::{
    attack_targets, damage_forecast, drop_spots, map_targets, CommandRegistry, MenuEntry,
    OrderQuery,
};
use crate::events::BoardEventSchedule;
use crate::grid::Point;
use crate::input::{Button, Gamepad, MapCursor};
use crate::instruction::{CommandInstruction, RemoteOrder};
use crate::player::Players;
use crate::scenario::Scenario;
use crate::unit::Unit;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// How a finished game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub winner: PlayerId,
    /// The local perspective won
    pub victory: bool,
}

pub struct BattleAssets {
    pub board: Board,
    pub players: Players,
    pub scenario: Scenario,
    pub registry: CommandRegistry,
    /// The order being assembled; reset at the start of every order
    pub instruction: CommandInstruction,
    /// Pending animations for the renderer
    pub events: BoardEventSchedule,
    pub cursor: MapCursor,
    pub gamepad: Gamepad,
    /// Expected damage against the highlighted target
    pub forecast: Option<u32>,
    /// Orders received from remote seats, oldest first
    pub inbox: VecDeque<RemoteOrder>,
    /// Orders issued locally that remote seats must replay
    pub outbox: Vec<RemoteOrder>,
    /// Lines shown by the opening cutscene
    pub intro: Vec<String>,
    pub outcome: Option<Outcome>,
    /// Set once the game has fully ended
    pub finished: bool,
    seeds: ChaCha8Rng,
}

impl BattleAssets {
    pub fn new(board: Board, players: Players, scenario: Scenario) -> Self {
        let seeds = match scenario.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            board,
            players,
            scenario,
            registry: CommandRegistry::new(),
            instruction: CommandInstruction::default(),
            events: BoardEventSchedule::new(),
            cursor: MapCursor::default(),
            gamepad: Gamepad::new(),
            forecast: None,
            inbox: VecDeque::new(),
            outbox: Vec::new(),
            intro: Vec::new(),
            outcome: None,
            finished: false,
            seeds,
        }
    }

    /// Seed for the next order's randomness
    pub fn next_seed(&mut self) -> u64 {
        self.seeds.gen()
    }

    /// Feed this tick's controller sample
    pub fn poll_input(&mut self, held: &[Button], axis: Point) {
        self.gamepad.poll(held, axis);
    }

    /// The current seat is played on this machine
    pub fn is_local_turn(&self) -> bool {
        !self.players.current().remote
    }

    /// Queue `order` for remote seats, if there are any
    pub fn publish(&mut self, order: RemoteOrder) {
        if self.is_local_turn() && self.players.has_remote() {
            self.outbox.push(order);
        }
    }

    /// The unit acting in the current instruction
    pub fn actor(&self) -> Option<&Unit> {
        self.board.unit_at(self.instruction.actor_location?)
    }

    pub fn menu(&mut self) -> Vec<MenuEntry> {
        let query = OrderQuery::new(&self.instruction, &self.board, &self.players, &self.scenario);
        self.registry.menu(&query)
    }

    pub fn attack_targets(&mut self) -> Vec<Point> {
        let query = OrderQuery::new(&self.instruction, &self.board, &self.players, &self.scenario);
        attack_targets(&query, self.registry.ranges_mut())
    }

    pub fn map_targets(&mut self, range: (i32, i32)) -> Vec<Point> {
        let query = OrderQuery::new(&self.instruction, &self.board, &self.players, &self.scenario);
        map_targets(&query, self.registry.ranges_mut(), range)
    }

    pub fn drop_spots(&self, which: usize) -> Vec<Point> {
        let query = OrderQuery::new(&self.instruction, &self.board, &self.players, &self.scenario);
        drop_spots(&query, which)
    }

    pub fn damage_forecast(&self, target: Point) -> Option<u32> {
        let query = OrderQuery::new(&self.instruction, &self.board, &self.players, &self.scenario);
        damage_forecast(&query, target)
    }
}
