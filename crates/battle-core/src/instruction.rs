//! The in-progress order record and its wire format.
//!
//! A `CommandInstruction` accumulates the player's decision one state at a
//! time: who acts, where they walk, what they do, and at whom. Once complete it
//! is ratified locally and the very same record is what travels to remote
//! peers, who ratify it against their own board.

use crate::command::CommandKind;
use crate::grid::{Direction, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire encode/decode failures
#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("malformed order payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One held unit leaving its transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropInstruction {
    /// Index into the transport's cargo as it was when the order began
    pub which: usize,
    /// Where the held unit is placed
    pub destination: Point,
}

/// The decision being assembled for the current order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandInstruction {
    /// Tile of the acting unit (or the deploying building)
    pub actor_location: Option<Point>,
    /// Steps walked from `actor_location`
    pub path: Option<Vec<Direction>>,
    pub action: Option<CommandKind>,
    /// Command-specific selector, e.g. a cargo index or a unit type serial
    pub action_variant: Option<u32>,
    pub target_location: Option<Point>,
    #[serde(default)]
    pub drop_list: Vec<DropInstruction>,
    /// Seed for any randomness this order resolves
    pub seed: u64,
}

impl CommandInstruction {
    /// A blank instruction for a fresh order
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Where the actor ends up: its location followed along the path
    pub fn goal(&self) -> Option<Point> {
        let place = self.actor_location?;
        Some(match &self.path {
            Some(path) => place.follow(path),
            None => place,
        })
    }

    /// Whether cargo index `which` is already scheduled to drop
    pub fn is_dropping(&self, which: usize) -> bool {
        self.drop_list.iter().any(|d| d.which == which)
    }

    pub fn to_wire(&self) -> Result<String, InstructionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_wire(payload: &str) -> Result<Self, InstructionError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// A message between peers in networked play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RemoteOrder {
    /// A completed order to ratify
    Instruction(CommandInstruction),
    /// The sender ended their turn
    EndTurn,
}
