//! The command catalogue.
//!
//! Every order a unit can be given is a `CommandObject`: plain data (name,
//! stable serial, menu weight, chain) paired with two plain functions, an
//! inclusion predicate deciding whether the command appears in the menu and a
//! ratification step applying its effect. The registry is a flat table indexed
//! by serial, built once.
//!
//! Most commands move first: their chain is `[Move, <self>]`, run in order and
//! short-circuited as soon as a step reports anything but success (an ambush
//! interrupting the walk, for instance).
//!
//! Ratification is atomic. Steps run against staged copies of the board and
//! roster, and the copies are committed only when the whole chain succeeds.

mod include;
mod ratify;

pub use include::{attack_targets, damage_forecast, drop_spots, map_targets};

use crate::board::{Board, BoardError};
use crate::damage::DamageScript;
use crate::events::{BoardEvent, BoardEventSchedule};
use crate::grid::{Direction, Point};
use crate::instruction::{CommandInstruction, DropInstruction};
use crate::player::Players;
use crate::region::{RangeSieve, RegionMap};
use crate::scenario::Scenario;
use crate::unit::{Unit, UnitType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Range of a missile silo launch, measured from the silo
pub const SILO_RANGE: (i32, i32) = (0, 5);

/// Blast shape of a missile silo strike
pub const SILO_BLAST: (i32, i32) = (0, 2);

/// Every command in the catalogue, in serial order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CommandKind {
    Wait,
    Move,
    Attack,
    Capture,
    Supply,
    Join,
    Load,
    Drop,
    Spawn,
    LaunchSilo,
}

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::Wait,
        CommandKind::Move,
        CommandKind::Attack,
        CommandKind::Capture,
        CommandKind::Supply,
        CommandKind::Join,
        CommandKind::Load,
        CommandKind::Drop,
        CommandKind::Spawn,
        CommandKind::LaunchSilo,
    ];

    /// Stable numeric id, used on the wire
    pub fn serial(self) -> u8 {
        match self {
            CommandKind::Wait => 0,
            CommandKind::Move => 1,
            CommandKind::Attack => 2,
            CommandKind::Capture => 3,
            CommandKind::Supply => 4,
            CommandKind::Join => 5,
            CommandKind::Load => 6,
            CommandKind::Drop => 7,
            CommandKind::Spawn => 8,
            CommandKind::LaunchSilo => 9,
        }
    }

    pub fn from_serial(serial: u8) -> Option<CommandKind> {
        Self::ALL.get(serial as usize).copied()
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = String;

    fn try_from(serial: u8) -> Result<Self, Self::Error> {
        CommandKind::from_serial(serial).ok_or_else(|| format!("unknown command serial {serial}"))
    }
}

impl From<CommandKind> for u8 {
    fn from(kind: CommandKind) -> u8 {
        kind.serial()
    }
}

/// Menu ordering; lower sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Weight {
    Primary,
    Secondary,
    Tertiary,
    Quaternary,
    Unpreferred,
    /// Never listed
    None,
}

/// How a command picks its target once chosen from the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Targeting {
    /// Complete as soon as it is chosen
    Immediate,
    /// Pick an enemy unit in range
    Unit,
    /// Pick any tile within `range` of the goal; `effect` is the area hit
    Map {
        range: (i32, i32),
        effect: (i32, i32),
    },
    /// Pick a tile to place a held unit
    DropSpot,
}

/// How a ratification step finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    /// The chain was cut short (e.g. ambushed mid-walk); later steps are skipped
    Interrupted,
}

/// Why a command could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatifyFault {
    #[error("missing data: {0}")]
    MissingData(&'static str),

    #[error("no unit at {0}")]
    NoUnit(Point),

    #[error("no unit to join with at {0}")]
    NoJoinPartner(Point),

    #[error("units are not allied")]
    NotAllied,

    #[error("units are not the same type")]
    TypeMismatch,

    #[error("invalid drop: {0}")]
    InvalidDrop(String),

    #[error("{0} is out of range")]
    OutOfRange(Point),

    #[error("path to {0} is impassable")]
    Impassable(Point),

    #[error("cannot afford {cost} with {funds} funds")]
    InsufficientFunds { cost: u32, funds: u32 },

    #[error("unit limit reached")]
    UnitLimit,

    #[error("{0}")]
    Illegal(String),

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// A command's effect could not be legally applied; nothing was changed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command}: {fault}")]
pub struct RatificationError {
    pub command: &'static str,
    pub fault: RatifyFault,
}

impl RatificationError {
    pub fn new(command: &'static str, fault: RatifyFault) -> Self {
        Self { command, fault }
    }
}

/// Read-only view used by inclusion predicates and target listings
#[derive(Debug, Clone, Copy)]
pub struct OrderQuery<'a> {
    pub instruction: &'a CommandInstruction,
    pub board: &'a Board,
    pub players: &'a Players,
    pub scenario: &'a Scenario,
    /// Variant under consideration, e.g. a cargo index for Drop
    pub variant: Option<u32>,
}

impl<'a> OrderQuery<'a> {
    pub fn new(
        instruction: &'a CommandInstruction,
        board: &'a Board,
        players: &'a Players,
        scenario: &'a Scenario,
    ) -> Self {
        Self {
            instruction,
            board,
            players,
            scenario,
            variant: None,
        }
    }

    pub fn with_variant(self, variant: u32) -> Self {
        Self {
            variant: Some(variant),
            ..self
        }
    }

    pub fn place(&self) -> Option<Point> {
        self.instruction.actor_location
    }

    pub fn goal(&self) -> Option<Point> {
        self.instruction.goal()
    }

    pub fn actor(&self) -> Option<&'a Unit> {
        self.board.unit_at(self.place()?)
    }

    pub fn moved(&self) -> bool {
        self.instruction.path.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// The actor could end its walk on the goal tile
    pub fn goal_is_free(&self) -> bool {
        match (self.place(), self.goal()) {
            (Some(place), Some(goal)) => goal == place || self.board.unit_at(goal).is_none(),
            _ => false,
        }
    }
}

/// The instruction fields a ratification step reads, with typed accessors
/// that fail with `MissingData` instead of panicking
#[derive(Debug, Clone)]
pub struct OrderData {
    pub action: CommandKind,
    pub seed: u64,
    actor_location: Option<Point>,
    path: Vec<Direction>,
    action_variant: Option<u32>,
    target_location: Option<Point>,
    drop_list: Vec<DropInstruction>,
}

impl OrderData {
    pub fn resolve(instruction: &CommandInstruction) -> Result<Self, RatifyFault> {
        Ok(Self {
            action: instruction.action.ok_or(RatifyFault::MissingData("action"))?,
            seed: instruction.seed,
            actor_location: instruction.actor_location,
            path: instruction.path.clone().unwrap_or_default(),
            action_variant: instruction.action_variant,
            target_location: instruction.target_location,
            drop_list: instruction.drop_list.clone(),
        })
    }

    pub fn place(&self) -> Result<Point, RatifyFault> {
        self.actor_location
            .ok_or(RatifyFault::MissingData("actor location"))
    }

    pub fn path(&self) -> &[Direction] {
        &self.path
    }

    pub fn goal(&self) -> Result<Point, RatifyFault> {
        Ok(self.place()?.follow(&self.path))
    }

    pub fn target(&self) -> Result<Point, RatifyFault> {
        self.target_location
            .ok_or(RatifyFault::MissingData("target location"))
    }

    pub fn variant(&self) -> Result<u32, RatifyFault> {
        self.action_variant
            .ok_or(RatifyFault::MissingData("action variant"))
    }

    pub fn drops(&self) -> &[DropInstruction] {
        &self.drop_list
    }
}

/// Staged copies that ratification steps mutate
pub(crate) struct Stage<'a> {
    pub board: Board,
    pub players: Players,
    pub events: Vec<BoardEvent>,
    pub scenario: &'a Scenario,
    pub ranges: &'a mut RangeSieve,
    pub damage: DamageScript,
    /// Where the acting unit currently stands; `None` once it leaves the board
    pub actor: Option<Point>,
}

impl Stage<'_> {
    pub fn actor_pos(&self) -> Result<Point, RatifyFault> {
        self.actor
            .ok_or(RatifyFault::MissingData("actor on board"))
    }

    pub fn actor_unit(&self) -> Result<&Unit, RatifyFault> {
        let pos = self.actor_pos()?;
        self.board.unit_at(pos).ok_or(RatifyFault::NoUnit(pos))
    }
}

type IncludeFn = fn(&OrderQuery<'_>, &mut RangeSieve) -> bool;
type StepFn = fn(&OrderData, &mut Stage<'_>) -> Result<ExitCode, RatifyFault>;

/// Static descriptor of one command
pub struct CommandObject {
    pub kind: CommandKind,
    pub name: &'static str,
    pub weight: Weight,
    /// The actor is marked spent after a successful ratification
    pub spends_actor: bool,
    /// Steps run, in order, when this command is ratified
    pub chain: &'static [CommandKind],
    pub targeting: Targeting,
    include: IncludeFn,
    step: StepFn,
}

impl CommandObject {
    pub fn serial(&self) -> u8 {
        self.kind.serial()
    }

    fn describe(kind: CommandKind) -> Self {
        use CommandKind::*;
        let (name, weight, spends_actor, chain, targeting, include, step): (
            &'static str,
            Weight,
            bool,
            &'static [CommandKind],
            Targeting,
            IncludeFn,
            StepFn,
        ) = match kind {
            Wait => (
                "Wait",
                Weight::Unpreferred,
                true,
                &[Move, Wait],
                Targeting::Immediate,
                include::wait,
                ratify::wait,
            ),
            Move => (
                "Move",
                Weight::None,
                true,
                &[Move],
                Targeting::Immediate,
                include::never,
                ratify::travel,
            ),
            Attack => (
                "Attack",
                Weight::Primary,
                true,
                &[Move, Attack],
                Targeting::Unit,
                include::attack,
                ratify::attack,
            ),
            Capture => (
                "Capture",
                Weight::Primary,
                true,
                &[Move, Capture],
                Targeting::Immediate,
                include::capture,
                ratify::capture,
            ),
            Supply => (
                "Supply",
                Weight::Secondary,
                true,
                &[Move, Supply],
                Targeting::Immediate,
                include::supply,
                ratify::supply,
            ),
            Join => (
                "Join",
                Weight::Primary,
                true,
                &[Move, Join],
                Targeting::Immediate,
                include::join,
                ratify::join,
            ),
            Load => (
                "Load",
                Weight::Primary,
                true,
                &[Move, Load],
                Targeting::Immediate,
                include::load,
                ratify::load,
            ),
            Drop => (
                "Drop",
                Weight::Tertiary,
                true,
                &[Move, Drop],
                Targeting::DropSpot,
                include::drop,
                ratify::drop,
            ),
            Spawn => (
                "Spawn",
                Weight::None,
                false,
                &[Spawn],
                Targeting::Immediate,
                include::never,
                ratify::spawn,
            ),
            LaunchSilo => (
                "Launch",
                Weight::Quaternary,
                true,
                &[Move, LaunchSilo],
                Targeting::Map {
                    range: SILO_RANGE,
                    effect: SILO_BLAST,
                },
                include::launch_silo,
                ratify::launch_silo,
            ),
        };

        Self {
            kind,
            name,
            weight,
            spends_actor,
            chain,
            targeting,
            include,
            step,
        }
    }
}

/// One line of the command menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub kind: CommandKind,
    pub variant: Option<u32>,
    pub label: String,
}

/// The command table plus the range-shape cache its predicates share
pub struct CommandRegistry {
    table: Vec<CommandObject>,
    ranges: RangeSieve,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            table: CommandKind::ALL.map(CommandObject::describe).into(),
            ranges: RangeSieve::new(),
        }
    }

    pub fn get(&self, kind: CommandKind) -> &CommandObject {
        lookup(&self.table, kind)
    }

    pub fn by_serial(&self, serial: u8) -> Option<&CommandObject> {
        CommandKind::from_serial(serial).map(|kind| self.get(kind))
    }

    pub fn commands(&self) -> &[CommandObject] {
        &self.table
    }

    /// Memoized range shape for `(min, max)`
    pub fn range(&mut self, min: i32, max: i32) -> Arc<RegionMap> {
        self.ranges.get(min, max)
    }

    pub fn ranges_mut(&mut self) -> &mut RangeSieve {
        &mut self.ranges
    }

    /// Whether `kind` should be offered for the order described by `query`
    pub fn includes(&mut self, kind: CommandKind, query: &OrderQuery<'_>) -> bool {
        let include = lookup(&self.table, kind).include;
        include(query, &mut self.ranges)
    }

    /// The command menu for the order described by `query`.
    ///
    /// Drop is listed once per held unit not already scheduled to leave. Once
    /// any drop has been scheduled, only the remaining drops and Wait (which
    /// finalizes the order) are offered. When the goal holds another unit only
    /// the merge commands, Join and Load, make sense.
    pub fn menu(&mut self, query: &OrderQuery<'_>) -> Vec<MenuEntry> {
        let mut entries = Vec::new();
        let Some(actor) = query.actor() else {
            return entries;
        };

        if !query.instruction.drop_list.is_empty() {
            entries.extend(self.drop_entries(query, actor));
            entries.push(self.entry(CommandKind::Wait, None, "Wait".to_string()));
            return entries;
        }

        let mut kinds: Vec<&CommandObject> = self
            .table
            .iter()
            .filter(|c| c.weight != Weight::None)
            .collect();
        kinds.sort_by_key(|c| c.weight);
        let kinds: Vec<CommandKind> = kinds.into_iter().map(|c| c.kind).collect();

        for kind in kinds {
            if kind == CommandKind::Drop {
                entries.extend(self.drop_entries(query, actor));
            } else if self.includes(kind, query) {
                let name = self.get(kind).name.to_string();
                entries.push(self.entry(kind, None, name));
            }
        }
        entries
    }

    fn drop_entries(&mut self, query: &OrderQuery<'_>, actor: &Unit) -> Vec<MenuEntry> {
        let mut entries = Vec::new();
        for (which, held) in actor.loaded.iter().enumerate() {
            let variant = which as u32;
            if self.includes(CommandKind::Drop, &query.with_variant(variant)) {
                entries.push(self.entry(
                    CommandKind::Drop,
                    Some(variant),
                    format!("Drop {}", held.kind.name()),
                ));
            }
        }
        entries
    }

    fn entry(&self, kind: CommandKind, variant: Option<u32>, label: String) -> MenuEntry {
        MenuEntry {
            kind,
            variant,
            label,
        }
    }

    /// Apply a completed instruction to the board.
    ///
    /// The chosen command's chain runs against staged copies of `board` and
    /// `players`; on success the copies replace the originals and the produced
    /// events are appended to `events`. On failure nothing is touched.
    pub fn ratify(
        &mut self,
        instruction: &CommandInstruction,
        board: &mut Board,
        players: &mut Players,
        scenario: &Scenario,
        events: &mut BoardEventSchedule,
    ) -> Result<ExitCode, RatificationError> {
        let data =
            OrderData::resolve(instruction).map_err(|f| RatificationError::new("Instruction", f))?;
        let command = lookup(&self.table, data.action);

        let mut stage = Stage {
            board: board.clone(),
            players: players.clone(),
            events: Vec::new(),
            scenario,
            ranges: &mut self.ranges,
            damage: DamageScript::new(data.seed),
            actor: instruction.actor_location,
        };
        let actor_id = instruction
            .actor_location
            .and_then(|p| board.unit_at(p))
            .map(|u| u.id);

        let exit = schedule_events(&self.table, command.chain, &data, &mut stage)?;

        if command.spends_actor {
            if let Some(unit) = stage.actor.and_then(|p| stage.board.unit_at_mut(p)) {
                if Some(unit.id) == actor_id {
                    unit.spent = true;
                }
            }
        }

        *board = stage.board;
        *players = stage.players;
        events.extend(stage.events);
        info!(command = command.name, ?exit, "order ratified");
        Ok(exit)
    }

    /// Dry-run `instruction` without touching any state
    pub fn validate(
        &mut self,
        instruction: &CommandInstruction,
        board: &Board,
        players: &Players,
        scenario: &Scenario,
    ) -> Result<ExitCode, RatificationError> {
        let mut board = board.clone();
        let mut players = players.clone();
        let mut events = BoardEventSchedule::new();
        self.ratify(instruction, &mut board, &mut players, scenario, &mut events)
    }
}

fn lookup(table: &[CommandObject], kind: CommandKind) -> &CommandObject {
    &table[kind.serial() as usize]
}

/// Run `chain` step by step, stopping at the first step that does not succeed
fn schedule_events(
    table: &[CommandObject],
    chain: &[CommandKind],
    data: &OrderData,
    stage: &mut Stage<'_>,
) -> Result<ExitCode, RatificationError> {
    for &kind in chain {
        let command = lookup(table, kind);
        let exit =
            (command.step)(data, stage).map_err(|f| RatificationError::new(command.name, f))?;
        if exit != ExitCode::Success {
            debug!(command = command.name, ?exit, "chain interrupted");
            return Ok(exit);
        }
    }
    Ok(ExitCode::Success)
}

/// Whether a unit type could stand on the terrain at `p`
pub(crate) fn passable_for(board: &Board, p: Point, kind: UnitType) -> bool {
    board
        .square_at(p)
        .is_some_and(|s| s.terrain.move_cost(kind.move_type()).is_some())
}
