//! Battle Core - turn engine for a grid-based tactics game
//!
//! This crate provides the rules side of a battle, including:
//! - Region maps for movement, attack and blast shapes
//! - The board, units, players and scenario settings
//! - A command registry that turns a finished order into board changes
//! - A stack of turn states that gathers each order and can step back out of it
//!
//! # Architecture
//!
//! The engine is headless. A host feeds controller input once per tick,
//! calls [`BattleSystemManager::update`], and drains the board events it
//! wants to animate. Networked seats exchange [`RemoteOrder`]s through the
//! assets' inbox and outbox, so the same engine also runs inside the relay
//! server as the authority.
//!
//! # Modules
//!
//! - [`region`]: Occupancy shapes and the range cache
//! - [`board`]: Terrain, squares, movement maps
//! - [`command`]: Command table, menu predicates, ratification
//! - [`turn`]: Turn states and the transition table
//! - [`manager`]: The driver that owns the state stack

pub mod assets;
pub mod board;
pub mod command;
pub mod damage;
pub mod events;
pub mod grid;
pub mod input;
pub mod instruction;
pub mod manager;
pub mod maps;
pub mod player;
pub mod region;
pub mod scenario;
pub mod turn;
pub mod unit;

// Re-export commonly used types
pub use assets::{BattleAssets, Outcome};
pub use board::{Board, BoardError, MapError, MovementMap, PlayerId, Square, Terrain};
pub use command::{CommandKind, CommandRegistry, ExitCode, MenuEntry, RatificationError, RatifyFault};
pub use events::{BoardEvent, BoardEventSchedule};
pub use grid::{Direction, Point};
pub use input::{Button, Gamepad, MapCursor};
pub use instruction::{CommandInstruction, DropInstruction, InstructionError, RemoteOrder};
pub use manager::{BattleError, BattleSystemManager, StateId};
pub use maps::MapDef;
pub use player::{Player, Players};
pub use region::{RangeSieve, RegionMap};
pub use scenario::{Scenario, ScenarioError};
pub use turn::{StateError, StateKind, TurnState};
pub use unit::{Unit, UnitType};
