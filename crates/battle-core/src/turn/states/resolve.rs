//! Carrying a finished order out, locally or on behalf of a remote seat.

use crate::assets::BattleAssets;
use crate::instruction::RemoteOrder;
use crate::turn::{StateError, StateKind, StateLogic, Transition, Wake};
use tracing::{debug, info};

/// Ticks spent on each tile of a walk
pub const TICKS_PER_STEP: u32 = 4;

/// Plays the actor's walk along its path
#[derive(Debug, Default)]
pub struct AnimateMoveUnit {
    ticks: u32,
}

impl StateLogic for AnimateMoveUnit {
    fn kind(&self) -> StateKind {
        StateKind::AnimateMoveUnit
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        let steps = assets.instruction.path.as_ref().map_or(0, Vec::len) as u32;
        self.ticks = steps * TICKS_PER_STEP;
        if self.ticks == 0 {
            t.advance_next();
        }
        Ok(())
    }

    fn update(&mut self, _assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        self.ticks = self.ticks.saturating_sub(1);
        if self.ticks == 0 {
            t.advance_next();
        }
        Ok(())
    }
}

/// Applies the assembled instruction to the board.
///
/// A rejected order is reported as a state failure, so the manager backs out
/// to whichever menu produced it with the board untouched.
#[derive(Debug, Default)]
pub struct RatifyIssuedOrder {
    done: bool,
}

impl StateLogic for RatifyIssuedOrder {
    fn kind(&self) -> StateKind {
        StateKind::RatifyIssuedOrder
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        if assets.instruction.actor_location.is_none() {
            return Err(StateError::missing(self.kind(), "an actor location"));
        }
        if assets.instruction.action.is_none() {
            return Err(StateError::missing(self.kind(), "an action"));
        }
        Ok(())
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        if !self.done {
            let BattleAssets {
                registry,
                instruction,
                board,
                players,
                scenario,
                events,
                ..
            } = assets;
            let exit = registry.ratify(instruction, board, players, scenario, events)?;
            self.done = true;
            debug!(?exit, events = events.len(), "instruction applied");

            let order = RemoteOrder::Instruction(assets.instruction.clone());
            assets.publish(order);
            assets.board.clear_tile_overlay();
            assets.cursor.area = None;
            assets.forecast = None;
        }
        t.advance(&[StateKind::AnimateEvents, StateKind::CheckBoardState]);
        Ok(())
    }
}

/// Holds until the renderer has drained every pending board event
#[derive(Debug)]
pub struct AnimateEvents;

impl StateLogic for AnimateEvents {
    fn kind(&self) -> StateKind {
        StateKind::AnimateEvents
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        if assets.events.is_empty() {
            t.advance_next();
        }
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if assets.events.is_empty() {
            t.advance_next();
        }
        Ok(())
    }
}

/// Idles while a remote seat plays, replaying each order as it arrives
#[derive(Debug)]
pub struct WaitForNextInstruction;

impl StateLogic for WaitForNextInstruction {
    fn kind(&self) -> StateKind {
        StateKind::WaitForNextInstruction
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        assets.board.clear_tile_overlay();
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        match assets.inbox.pop_front() {
            Some(RemoteOrder::Instruction(instruction)) => {
                info!(
                    seat = assets.players.current_id(),
                    action = ?instruction.action,
                    "replaying remote order"
                );
                assets.instruction = instruction;
                t.advance(&[StateKind::RatifyIssuedOrder]);
            }
            Some(RemoteOrder::EndTurn) => {
                info!(seat = assets.players.current_id(), "remote seat ended its turn");
                t.advance(&[StateKind::TurnEnd]);
            }
            None => {}
        }
        Ok(())
    }
}
