//! Board events for the renderer.
//!
//! Ratification and turn phases describe what happened as a FIFO of
//! `BoardEvent`s. The engine only ever appends; playing the events back (and
//! draining the queue) is the renderer's job.

use crate::board::PlayerId;
use crate::grid::{Direction, Point};
use crate::unit::{UnitId, UnitType, Weapon};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Something the renderer should animate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardEvent {
    // ==================== Movement ====================
    /// A unit walked a path
    Move {
        unit: UnitId,
        from: Point,
        path: Vec<Direction>,
    },
    /// A unit's walk was cut short by a hidden enemy
    Ambush { unit: UnitId, at: Point, by: Point },

    // ==================== Combat ====================
    /// One side of an exchange of fire
    Attack {
        attacker: Point,
        defender: Point,
        weapon: Weapon,
        damage: u32,
        counter: bool,
    },
    /// A unit was destroyed
    Destroy { unit: UnitId, at: Point },
    /// A missile silo was fired
    SiloImpact {
        silo: Point,
        target: Point,
        hits: Vec<Point>,
    },

    // ==================== Logistics ====================
    /// Capture progress on a building
    Capture {
        at: Point,
        remaining: u32,
        captured: bool,
    },
    /// Units were resupplied
    Supply { at: Vec<Point> },
    /// A unit was repaired on a friendly building
    Repair { at: Point, hp: u32 },
    /// Two units merged
    Join { at: Point, returned_funds: u32 },
    /// A unit boarded a transport
    Load { carrier: Point, unit: UnitId },
    /// A unit left a transport
    Unload { carrier: Point, to: Point, unit: UnitId },
    /// A unit was deployed from a building
    Spawn {
        at: Point,
        kind: UnitType,
        owner: PlayerId,
    },

    // ==================== Turn ====================
    /// Turn income was paid
    Income { player: PlayerId, amount: u32 },
}

/// FIFO of pending board events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardEventSchedule {
    queue: VecDeque<BoardEvent>,
}

impl BoardEventSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: BoardEvent) {
        self.queue.push_back(event);
    }

    /// Append everything from `events`, preserving order
    pub fn extend(&mut self, events: impl IntoIterator<Item = BoardEvent>) {
        self.queue.extend(events);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Next event for playback
    pub fn pop(&mut self) -> Option<BoardEvent> {
        self.queue.pop_front()
    }

    /// Take every pending event
    pub fn drain(&mut self) -> Vec<BoardEvent> {
        self.queue.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoardEvent> {
        self.queue.iter()
    }
}
