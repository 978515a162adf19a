//! Order assembly: choosing an actor, a path, a command, and a target.
//!
//! Each state here writes one part of the instruction and clears it again in
//! `prev`, so stepping back always leaves the instruction as the previous
//! state saw it.

use super::{cycle, pressed};
use crate::assets::BattleAssets;
use crate::board::MovementMap;
use crate::command::{CommandKind, MenuEntry, Targeting};
use crate::grid::{Direction, Point};
use crate::input::Button;
use crate::instruction::{CommandInstruction, DropInstruction};
use crate::turn::{StateError, StateKind, StateLogic, Transition, Wake};
use crate::unit::UnitType;
use std::collections::HashSet;

/// Highlight `points` as selectable targets
fn mark_targets(assets: &mut BattleAssets, points: &[Point]) {
    assets.board.clear_tile_overlay();
    for &p in points {
        if let Some(square) = assets.board.square_at_mut(p) {
            square.overlay.targetable = true;
        }
    }
}

fn actor_required(state: StateKind, assets: &BattleAssets) -> Result<(), StateError> {
    match assets.actor() {
        Some(_) => Ok(()),
        None => Err(StateError::missing(state, "a unit at the actor location")),
    }
}

/// Browse the board and pick what to act with
#[derive(Debug)]
pub struct PickUnit;

impl StateLogic for PickUnit {
    fn kind(&self) -> StateKind {
        StateKind::PickUnit
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        let seed = assets.next_seed();
        assets.instruction = CommandInstruction::new(seed);
        assets.forecast = None;
        assets.cursor.area = None;
        assets.board.clear_tile_overlay();
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if let Some(dir) = assets.gamepad.axis_pressed() {
            assets.cursor.step(dir, &assets.board);
            return Ok(());
        }

        let at = assets.cursor.pos();
        let owner = assets.players.current_id();
        if pressed(assets, Button::A) {
            let factory = assets
                .board
                .square_at(at)
                .is_some_and(|s| s.owner == Some(owner) && s.terrain.deploys().is_some());
            match assets.board.unit_at(at) {
                Some(unit) => {
                    let ready = unit.owner == owner && unit.is_ready();
                    assets.instruction.actor_location = Some(at);
                    if ready {
                        t.advance(&[
                            StateKind::MoveUnit,
                            StateKind::CommandMenu,
                            StateKind::RatifyIssuedOrder,
                        ]);
                    } else {
                        t.advance(&[StateKind::MoveUnit]);
                    }
                }
                None if factory => {
                    assets.instruction.actor_location = Some(at);
                    t.advance(&[StateKind::FactoryMenu, StateKind::RatifyIssuedOrder]);
                }
                None => t.advance(&[StateKind::FieldMenu]),
            }
        } else if pressed(assets, Button::B) && assets.board.unit_at(at).is_some() {
            assets.instruction.actor_location = Some(at);
            t.advance(&[StateKind::ShowUnitAttackRange]);
        } else if pressed(assets, Button::Start) {
            t.advance(&[StateKind::FieldMenu]);
        }
        Ok(())
    }
}

/// Shows every tile a unit threatens while B is held
#[derive(Debug)]
pub struct ShowUnitAttackRange;

impl StateLogic for ShowUnitAttackRange {
    fn kind(&self) -> StateKind {
        StateKind::ShowUnitAttackRange
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        actor_required(self.kind(), assets)
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        let place = assets
            .instruction
            .actor_location
            .ok_or(StateError::missing(self.kind(), "an actor location"))?;
        let kind = assets
            .actor()
            .map(|u| u.kind)
            .ok_or(StateError::NoOptions(self.kind()))?;

        let (min, max) = kind.attack_range();
        let region = assets.registry.range(min, max);
        let origins: Vec<Point> = if kind.can_move_and_attack() {
            assets
                .board
                .reachable(place)
                .map(|m| m.points().collect())
                .unwrap_or_default()
        } else {
            vec![place]
        };

        let threat: HashSet<Point> = origins
            .into_iter()
            .flat_map(|o| region.points_around(o))
            .filter(|&p| assets.board.contains(p))
            .collect();

        assets.board.clear_tile_overlay();
        for &p in &threat {
            let outline = p.neighbors().iter().any(|n| !threat.contains(n));
            if let Some(square) = assets.board.square_at_mut(p) {
                square.overlay.attackable = true;
                square.overlay.outline = outline;
            }
        }
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if assets.gamepad.button(Button::B).released() || pressed(assets, Button::A) {
            t.regress();
        }
        Ok(())
    }

    fn close(&mut self, assets: &mut BattleAssets) {
        assets.board.clear_tile_overlay();
    }

    fn prev(&mut self, assets: &mut BattleAssets) {
        assets.instruction.actor_location = None;
    }
}

/// The field menu; its only order is ending the turn
#[derive(Debug)]
pub struct FieldMenu;

impl StateLogic for FieldMenu {
    fn kind(&self) -> StateKind {
        StateKind::FieldMenu
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if pressed(assets, Button::A) {
            t.advance(&[StateKind::TurnEnd]);
        } else if pressed(assets, Button::B) || pressed(assets, Button::Start) {
            t.regress();
        }
        Ok(())
    }
}

/// Deployment menu for an owned factory, airport or port
#[derive(Debug, Default)]
pub struct FactoryMenu {
    options: Vec<UnitType>,
    index: usize,
}

impl FactoryMenu {
    pub fn options(&self) -> &[UnitType] {
        &self.options
    }

    pub fn selected(&self) -> Option<UnitType> {
        self.options.get(self.index).copied()
    }
}

impl StateLogic for FactoryMenu {
    fn kind(&self) -> StateKind {
        StateKind::FactoryMenu
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        let owner = assets.players.current_id();
        let deploys = assets
            .instruction
            .actor_location
            .and_then(|p| assets.board.square_at(p))
            .is_some_and(|s| s.owner == Some(owner) && s.terrain.deploys().is_some());
        if deploys {
            Ok(())
        } else {
            Err(StateError::missing(self.kind(), "an owned deployment building"))
        }
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        let terrain = assets
            .instruction
            .actor_location
            .and_then(|p| assets.board.square_at(p))
            .map(|s| s.terrain)
            .ok_or(StateError::missing(self.kind(), "an actor location"))?;

        assets.instruction.path = None;
        assets.instruction.action = None;
        assets.instruction.action_variant = None;
        self.options = UnitType::ALL
            .into_iter()
            .filter(|k| k.deployed_from() == terrain)
            .collect();
        self.index = 0;
        if self.options.is_empty() {
            return Err(StateError::NoOptions(self.kind()));
        }
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        self.index = cycle(self.index, self.options.len(), assets.gamepad.axis_pressed());

        if pressed(assets, Button::B) {
            t.regress();
        } else if pressed(assets, Button::A) {
            let Some(kind) = self.selected() else {
                return Ok(());
            };
            if assets.players.current().funds >= kind.cost() {
                assets.instruction.action = Some(CommandKind::Spawn);
                assets.instruction.action_variant = Some(kind.serial());
                t.advance_next();
            }
        }
        Ok(())
    }

    fn prev(&mut self, assets: &mut BattleAssets) {
        assets.instruction.action = None;
        assets.instruction.action_variant = None;
    }
}

/// Walk the selected unit; the cursor drags a path behind it.
///
/// Enemy and spent units can be inspected here too, but not ordered.
#[derive(Debug, Default)]
pub struct MoveUnit {
    map: Option<MovementMap>,
    controllable: bool,
}

impl MoveUnit {
    pub fn controllable(&self) -> bool {
        self.controllable
    }

    /// Extend, trim, or re-plan the path so it ends on `next`
    fn track(&self, assets: &mut BattleAssets, place: Point, dir: Direction, next: Point) {
        let Some(map) = &self.map else {
            return;
        };
        let Some(move_type) = assets.actor().map(|u| u.kind.move_type()) else {
            return;
        };
        let path = assets.instruction.path.get_or_insert_with(Vec::new);
        let trail = place.trail(path);

        if next == place {
            path.clear();
        } else if let Some(i) = trail.iter().position(|&p| p == next) {
            path.truncate(i + 1);
        } else {
            let mut extended = path.clone();
            extended.push(dir);
            let affordable = assets
                .board
                .travel_cost_for_path(place, &extended, move_type)
                .is_some_and(|cost| cost <= map.budget);
            *path = if affordable {
                extended
            } else {
                map.path_to(next).unwrap_or_default()
            };
        }
    }
}

impl StateLogic for MoveUnit {
    fn kind(&self) -> StateKind {
        StateKind::MoveUnit
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        actor_required(self.kind(), assets)
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        let place = assets
            .instruction
            .actor_location
            .ok_or(StateError::missing(self.kind(), "an actor location"))?;
        let owner = assets.players.current_id();
        let local = assets.is_local_turn();
        self.controllable = assets
            .actor()
            .is_some_and(|u| u.owner == owner && u.is_ready() && local);

        if wake == Wake::Advance || assets.instruction.path.is_none() {
            assets.instruction.path = Some(Vec::new());
        }

        assets.board.clear_tile_overlay();
        self.map = assets.board.generate_movement_map(place);
        if self.controllable {
            if let Some(square) = assets.board.square_at_mut(place) {
                square.overlay.hide_unit = true;
            }
        }
        if let Some(goal) = assets.instruction.goal() {
            assets.cursor.teleport(goal, &assets.board);
        }
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        let Some(place) = assets.instruction.actor_location else {
            return Err(StateError::missing(self.kind(), "an actor location"));
        };

        if let Some(dir) = assets.gamepad.axis_pressed() {
            let next = assets.cursor.pos().step(dir);
            if !self.controllable {
                assets.cursor.step(dir, &assets.board);
            } else if self.map.as_ref().is_some_and(|m| m.contains(next)) {
                assets.cursor.teleport(next, &assets.board);
                self.track(assets, place, dir, next);
            }
            return Ok(());
        }

        if pressed(assets, Button::B) {
            t.regress();
        } else if self.controllable && pressed(assets, Button::A) {
            let Some(goal) = assets.instruction.goal() else {
                return Ok(());
            };
            let enterable = goal == place
                || match (assets.board.unit_at(goal), assets.actor()) {
                    (None, _) => true,
                    (Some(other), Some(actor)) => other.can_join(actor) || other.can_board(actor),
                    (Some(_), None) => false,
                };
            if enterable {
                t.advance_next();
            }
        }
        Ok(())
    }

    fn close(&mut self, assets: &mut BattleAssets) {
        assets.board.clear_tile_overlay();
        if let Some(place) = assets.instruction.actor_location {
            if let Some(square) = assets.board.square_at_mut(place) {
                square.overlay.hide_unit = self.controllable;
            }
        }
    }

    fn prev(&mut self, assets: &mut BattleAssets) {
        assets.board.clear_tile_overlay();
        assets.instruction.path = None;
        if let Some(place) = assets.instruction.actor_location {
            assets.cursor.teleport(place, &assets.board);
        }
    }
}

/// Lists the commands available at the end of the path
#[derive(Debug, Default)]
pub struct CommandMenu {
    entries: Vec<MenuEntry>,
    index: usize,
}

impl CommandMenu {
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn choose(&self, entry: &MenuEntry, assets: &mut BattleAssets, t: &mut Transition) {
        let instruction = &mut assets.instruction;
        if entry.kind == CommandKind::Wait && !instruction.drop_list.is_empty() {
            instruction.action = Some(CommandKind::Drop);
            t.advance(&[StateKind::AnimateMoveUnit]);
            return;
        }

        instruction.action = Some(entry.kind);
        instruction.action_variant = entry.variant;
        match assets.registry.get(entry.kind).targeting {
            Targeting::Immediate => t.advance(&[StateKind::AnimateMoveUnit]),
            Targeting::Unit => t.advance(&[StateKind::ChooseAttackTarget]),
            Targeting::Map { .. } => t.advance(&[StateKind::ChooseMapTarget]),
            Targeting::DropSpot => t.advance(&[StateKind::DropLocation]),
        }
    }
}

impl StateLogic for CommandMenu {
    fn kind(&self) -> StateKind {
        StateKind::CommandMenu
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        actor_required(self.kind(), assets)?;
        if assets.instruction.path.is_none() {
            return Err(StateError::missing(self.kind(), "a path"));
        }
        Ok(())
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        assets.instruction.action = None;
        assets.instruction.action_variant = None;
        assets.instruction.target_location = None;

        self.entries = assets.menu();
        self.index = 0;

        let dropping = !assets.instruction.drop_list.is_empty();
        if dropping && !self.entries.iter().any(|e| e.kind == CommandKind::Drop) {
            // Every held unit has somewhere to go
            assets.instruction.action = Some(CommandKind::Drop);
            t.advance(&[StateKind::AnimateMoveUnit]);
            return Ok(());
        }
        if self.entries.is_empty() {
            return Err(StateError::NoOptions(self.kind()));
        }
        if let Some(goal) = assets.instruction.goal() {
            assets.cursor.teleport(goal, &assets.board);
        }
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        self.index = cycle(self.index, self.entries.len(), assets.gamepad.axis_pressed());

        if pressed(assets, Button::B) {
            t.regress();
        } else if pressed(assets, Button::A) {
            if let Some(entry) = self.entries.get(self.index) {
                self.choose(entry, assets, t);
            }
        }
        Ok(())
    }

    fn prev(&mut self, assets: &mut BattleAssets) {
        assets.instruction.action = None;
        assets.instruction.action_variant = None;
        assets.instruction.target_location = None;
    }
}

/// Cycle through enemy units in range, with a damage forecast for each
#[derive(Debug, Default)]
pub struct ChooseAttackTarget {
    targets: Vec<Point>,
    index: usize,
}

impl ChooseAttackTarget {
    pub fn targets(&self) -> &[Point] {
        &self.targets
    }

    fn focus(&self, assets: &mut BattleAssets) {
        if let Some(&p) = self.targets.get(self.index) {
            assets.cursor.teleport(p, &assets.board);
            assets.forecast = assets.damage_forecast(p);
        }
    }
}

impl StateLogic for ChooseAttackTarget {
    fn kind(&self) -> StateKind {
        StateKind::ChooseAttackTarget
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        actor_required(self.kind(), assets)?;
        if assets.instruction.action.is_none() {
            return Err(StateError::missing(self.kind(), "an action"));
        }
        Ok(())
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        assets.instruction.target_location = None;
        self.targets = assets.attack_targets();
        self.index = 0;
        if self.targets.is_empty() {
            return Err(StateError::NoOptions(self.kind()));
        }
        mark_targets(assets, &self.targets);
        self.focus(assets);
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if let Some(dir) = assets.gamepad.axis_pressed() {
            self.index = cycle(self.index, self.targets.len(), Some(dir));
            self.focus(assets);
            return Ok(());
        }

        if pressed(assets, Button::B) {
            t.regress();
        } else if pressed(assets, Button::A) {
            assets.instruction.target_location = self.targets.get(self.index).copied();
            t.advance(&[StateKind::AnimateMoveUnit]);
        }
        Ok(())
    }

    fn close(&mut self, assets: &mut BattleAssets) {
        assets.forecast = None;
        assets.board.clear_tile_overlay();
    }

    fn prev(&mut self, assets: &mut BattleAssets) {
        assets.instruction.target_location = None;
    }
}

/// Free cursor over the tiles a map-targeted command can reach
#[derive(Debug, Default)]
pub struct ChooseMapTarget {
    area: Vec<Point>,
}

impl ChooseMapTarget {
    fn targeting(assets: &BattleAssets) -> Option<((i32, i32), (i32, i32))> {
        let action = assets.instruction.action?;
        match assets.registry.get(action).targeting {
            Targeting::Map { range, effect } => Some((range, effect)),
            _ => None,
        }
    }
}

impl StateLogic for ChooseMapTarget {
    fn kind(&self) -> StateKind {
        StateKind::ChooseMapTarget
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        actor_required(self.kind(), assets)?;
        match Self::targeting(assets) {
            Some(_) => Ok(()),
            None => Err(StateError::missing(self.kind(), "a map-targeted action")),
        }
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        let (range, effect) = Self::targeting(assets)
            .ok_or(StateError::missing(self.kind(), "a map-targeted action"))?;
        assets.instruction.target_location = None;
        self.area = assets.map_targets(range);
        let Some(&first) = self.area.first() else {
            return Err(StateError::NoOptions(self.kind()));
        };

        mark_targets(assets, &self.area);
        let start = assets
            .instruction
            .goal()
            .filter(|g| self.area.contains(g))
            .unwrap_or(first);
        assets.cursor.teleport(start, &assets.board);
        assets.cursor.area = Some(assets.registry.range(effect.0, effect.1));
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if let Some(dir) = assets.gamepad.axis_pressed() {
            let next = assets.cursor.pos().step(dir);
            if self.area.contains(&next) {
                assets.cursor.teleport(next, &assets.board);
            }
            return Ok(());
        }

        if pressed(assets, Button::B) {
            t.regress();
        } else if pressed(assets, Button::A) {
            let at = assets.cursor.pos();
            if self.area.contains(&at) {
                assets.instruction.target_location = Some(at);
                t.advance(&[StateKind::AnimateMoveUnit]);
            }
        }
        Ok(())
    }

    fn close(&mut self, assets: &mut BattleAssets) {
        assets.cursor.area = None;
        assets.board.clear_tile_overlay();
    }

    fn prev(&mut self, assets: &mut BattleAssets) {
        assets.instruction.target_location = None;
    }
}

/// Pick where one held unit is set down
#[derive(Debug, Default)]
pub struct DropLocation {
    which: Option<usize>,
    spots: Vec<Point>,
    index: usize,
}

impl DropLocation {
    pub fn spots(&self) -> &[Point] {
        &self.spots
    }

    fn which(&self, assets: &BattleAssets) -> Option<usize> {
        self.which.or_else(|| match assets.instruction.action {
            Some(CommandKind::Drop) => assets.instruction.action_variant.map(|v| v as usize),
            _ => None,
        })
    }

    fn forget(&self, assets: &mut BattleAssets) {
        if let Some(which) = self.which {
            assets.instruction.drop_list.retain(|d| d.which != which);
        }
    }
}

impl StateLogic for DropLocation {
    fn kind(&self) -> StateKind {
        StateKind::DropLocation
    }

    fn assert_dependencies(&self, assets: &BattleAssets) -> Result<(), StateError> {
        actor_required(self.kind(), assets)?;
        match self.which(assets) {
            Some(_) => Ok(()),
            None => Err(StateError::missing(self.kind(), "a held unit to drop")),
        }
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        let which = self
            .which(assets)
            .ok_or(StateError::missing(self.kind(), "a held unit to drop"))?;
        self.which = Some(which);
        // Coming back from a later menu takes this drop off the list again
        self.forget(assets);
        assets.instruction.action = Some(CommandKind::Drop);
        assets.instruction.action_variant = Some(which as u32);

        self.spots = assets.drop_spots(which);
        self.index = 0;
        let Some(&first) = self.spots.first() else {
            return Err(StateError::NoOptions(self.kind()));
        };
        mark_targets(assets, &self.spots);
        assets.cursor.teleport(first, &assets.board);
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if let Some(dir) = assets.gamepad.axis_pressed() {
            self.index = cycle(self.index, self.spots.len(), Some(dir));
            if let Some(&p) = self.spots.get(self.index) {
                assets.cursor.teleport(p, &assets.board);
            }
            return Ok(());
        }

        if pressed(assets, Button::B) {
            t.regress();
        } else if pressed(assets, Button::A) {
            if let (Some(which), Some(&destination)) = (self.which, self.spots.get(self.index)) {
                assets
                    .instruction
                    .drop_list
                    .push(DropInstruction { which, destination });
                t.advance(&[StateKind::CommandMenu]);
            }
        }
        Ok(())
    }

    fn close(&mut self, assets: &mut BattleAssets) {
        assets.board.clear_tile_overlay();
    }

    fn prev(&mut self, assets: &mut BattleAssets) {
        self.forget(assets);
        assets.instruction.action = None;
        assets.instruction.action_variant = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::states::fixtures::{assets, configure, press, push, update};
    use crate::turn::Request;
    use pretty_assertions::assert_eq;

    fn ready(a: &mut BattleAssets, at: Point, kind: UnitType, owner: u8) {
        a.board.spawn_unit(at, kind, owner).unwrap();
        a.board.unit_at_mut(at).unwrap().orderable = true;
    }

    #[test]
    fn test_pick_own_unit_queues_full_order() {
        let mut a = assets(". . .\n. . .");
        ready(&mut a, Point::new(1, 0), UnitType::Infantry, 0);
        let mut pick = PickUnit;
        configure(&mut pick, &mut a);

        push(&mut a, Point::new(1, 0));
        assert!(!update(&mut pick, &mut a).is_requested());
        assert_eq!(a.cursor.pos(), Point::new(1, 0));

        press(&mut a, Button::A);
        assert_eq!(
            update(&mut pick, &mut a).take(),
            Some(Request::Advance(vec![
                StateKind::MoveUnit,
                StateKind::CommandMenu,
                StateKind::RatifyIssuedOrder
            ]))
        );
        assert_eq!(a.instruction.actor_location, Some(Point::new(1, 0)));
    }

    #[test]
    fn test_pick_routes_enemies_factories_and_empty_tiles() {
        let mut a = assets("F0 . .");
        ready(&mut a, Point::new(2, 0), UnitType::Infantry, 1);
        let mut pick = PickUnit;

        configure(&mut pick, &mut a);
        press(&mut a, Button::A);
        assert_eq!(
            update(&mut pick, &mut a).take(),
            Some(Request::Advance(vec![
                StateKind::FactoryMenu,
                StateKind::RatifyIssuedOrder
            ]))
        );

        a.cursor.teleport(Point::new(1, 0), &a.board);
        press(&mut a, Button::A);
        assert_eq!(
            update(&mut pick, &mut a).take(),
            Some(Request::Advance(vec![StateKind::FieldMenu]))
        );

        a.cursor.teleport(Point::new(2, 0), &a.board);
        press(&mut a, Button::A);
        assert_eq!(
            update(&mut pick, &mut a).take(),
            Some(Request::Advance(vec![StateKind::MoveUnit]))
        );
    }

    #[test]
    fn test_pick_resets_instruction_with_fresh_seed() {
        let mut a = assets(". .");
        let mut pick = PickUnit;
        configure(&mut pick, &mut a);
        let first = a.instruction.seed;
        a.instruction.action = Some(CommandKind::Wait);
        configure(&mut pick, &mut a);
        assert_eq!(a.instruction.action, None);
        assert_ne!(a.instruction.seed, first);
    }

    #[test]
    fn test_move_unit_tracks_path() {
        let mut a = assets(". . . .\n. . . .");
        ready(&mut a, Point::new(0, 0), UnitType::Infantry, 0);
        a.instruction.actor_location = Some(Point::new(0, 0));
        let mut walk = MoveUnit::default();
        configure(&mut walk, &mut a);
        assert!(walk.controllable());

        for axis in [Point::new(1, 0), Point::new(0, 1), Point::new(1, 0)] {
            push(&mut a, axis);
            update(&mut walk, &mut a);
        }
        use Direction::*;
        assert_eq!(a.instruction.path, Some(vec![East, South, East]));
        assert_eq!(a.cursor.pos(), Point::new(2, 1));

        // Stepping back onto the trail trims it
        push(&mut a, Point::new(-1, 0));
        update(&mut walk, &mut a);
        assert_eq!(a.instruction.path, Some(vec![East, South]));

        press(&mut a, Button::A);
        assert_eq!(update(&mut walk, &mut a).take(), Some(Request::AdvanceNext));
    }

    #[test]
    fn test_move_unit_stays_inside_movement_range() {
        let mut a = assets(". ^ . .");
        ready(&mut a, Point::new(0, 0), UnitType::Tank, 0);
        a.instruction.actor_location = Some(Point::new(0, 0));
        let mut walk = MoveUnit::default();
        configure(&mut walk, &mut a);

        push(&mut a, Point::new(1, 0));
        update(&mut walk, &mut a);
        assert_eq!(a.cursor.pos(), Point::new(0, 0));
        assert_eq!(a.instruction.path, Some(vec![]));
    }

    #[test]
    fn test_move_unit_refuses_occupied_goal() {
        let mut a = assets(". . .");
        ready(&mut a, Point::new(0, 0), UnitType::Infantry, 0);
        ready(&mut a, Point::new(1, 0), UnitType::Tank, 0);
        a.instruction.actor_location = Some(Point::new(0, 0));
        let mut walk = MoveUnit::default();
        configure(&mut walk, &mut a);

        push(&mut a, Point::new(1, 0));
        update(&mut walk, &mut a);
        press(&mut a, Button::A);
        assert!(!update(&mut walk, &mut a).is_requested());
    }

    #[test]
    fn test_move_unit_prev_restores_instruction() {
        let mut a = assets(". .");
        ready(&mut a, Point::new(0, 0), UnitType::Infantry, 0);
        a.instruction.actor_location = Some(Point::new(0, 0));
        let mut walk = MoveUnit::default();
        configure(&mut walk, &mut a);
        assert!(a.board.square_at(Point::new(0, 0)).unwrap().overlay.hide_unit);

        walk.prev(&mut a);
        assert_eq!(a.instruction.path, None);
        assert!(!a.board.square_at(Point::new(0, 0)).unwrap().overlay.hide_unit);
    }

    #[test]
    fn test_command_menu_routes_by_targeting() {
        let mut a = assets(". . .");
        ready(&mut a, Point::new(0, 0), UnitType::Infantry, 0);
        ready(&mut a, Point::new(2, 0), UnitType::Infantry, 1);
        a.instruction.actor_location = Some(Point::new(0, 0));
        a.instruction.path = Some(vec![Direction::East]);

        let mut menu = CommandMenu::default();
        configure(&mut menu, &mut a);
        let labels: Vec<&str> = menu.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Attack", "Wait"]);

        press(&mut a, Button::A);
        assert_eq!(
            update(&mut menu, &mut a).take(),
            Some(Request::Advance(vec![StateKind::ChooseAttackTarget]))
        );
        assert_eq!(a.instruction.action, Some(CommandKind::Attack));

        menu.prev(&mut a);
        assert_eq!(a.instruction.action, None);
    }

    #[test]
    fn test_attack_target_forecast() {
        let mut a = assets(". . .");
        ready(&mut a, Point::new(0, 0), UnitType::Tank, 0);
        ready(&mut a, Point::new(1, 0), UnitType::Tank, 1);
        a.instruction.actor_location = Some(Point::new(0, 0));
        a.instruction.path = Some(vec![]);
        a.instruction.action = Some(CommandKind::Attack);

        let mut choose = ChooseAttackTarget::default();
        configure(&mut choose, &mut a);
        assert_eq!(choose.targets(), &[Point::new(1, 0)]);
        assert!(a.forecast.is_some_and(|d| d > 0));

        press(&mut a, Button::A);
        update(&mut choose, &mut a);
        assert_eq!(a.instruction.target_location, Some(Point::new(1, 0)));
    }

    #[test]
    fn test_drop_location_round_trip_through_menu() {
        let mut a = assets(". , .\n. . .");
        ready(&mut a, Point::new(1, 0), UnitType::Lander, 0);
        a.board
            .unit_at_mut(Point::new(1, 0))
            .unwrap()
            .loaded
            .push(crate::unit::Unit::new(50, UnitType::Infantry, 0));
        a.instruction.actor_location = Some(Point::new(1, 0));
        a.instruction.path = Some(vec![]);
        a.instruction.action = Some(CommandKind::Drop);
        a.instruction.action_variant = Some(0);

        let mut unload = DropLocation::default();
        configure(&mut unload, &mut a);
        assert_eq!(
            unload.spots(),
            &[Point::new(2, 0), Point::new(1, 1), Point::new(0, 0)]
        );

        press(&mut a, Button::A);
        assert_eq!(
            update(&mut unload, &mut a).take(),
            Some(Request::Advance(vec![StateKind::CommandMenu]))
        );
        assert_eq!(a.instruction.drop_list.len(), 1);

        // Nothing left to drop: the menu finalizes on its own
        let mut menu = CommandMenu::default();
        assert_eq!(
            configure(&mut menu, &mut a).take(),
            Some(Request::Advance(vec![StateKind::AnimateMoveUnit]))
        );
        assert_eq!(a.instruction.action, Some(CommandKind::Drop));

        // Backing out of the menu reopens the drop with the list cleared
        menu.prev(&mut a);
        let mut t = Transition::default();
        unload.configure(&mut a, Wake::Regress, &mut t).unwrap();
        assert!(a.instruction.drop_list.is_empty());
        assert_eq!(a.instruction.action, Some(CommandKind::Drop));
    }

    #[test]
    fn test_factory_menu_needs_funds() {
        let mut a = assets("F0 .");
        a.instruction.actor_location = Some(Point::new(0, 0));
        let mut factory = FactoryMenu::default();
        configure(&mut factory, &mut a);
        assert_eq!(factory.selected(), Some(UnitType::Infantry));

        press(&mut a, Button::A);
        assert!(!update(&mut factory, &mut a).is_requested());

        a.players.current_mut().funds = 1000;
        press(&mut a, Button::A);
        assert_eq!(update(&mut factory, &mut a).take(), Some(Request::AdvanceNext));
        assert_eq!(a.instruction.action, Some(CommandKind::Spawn));
        assert_eq!(a.instruction.action_variant, Some(UnitType::Infantry.serial()));
    }

    #[test]
    fn test_attack_range_outline() {
        let mut a = assets(". . . . .\n. . . . .\n. . . . .");
        ready(&mut a, Point::new(2, 1), UnitType::Artillery, 0);
        a.instruction.actor_location = Some(Point::new(2, 1));
        configure(&mut ShowUnitAttackRange, &mut a);

        let overlay = |x, y| a.board.square_at(Point::new(x, y)).unwrap().overlay;
        assert!(overlay(0, 1).attackable);
        assert!(!overlay(2, 0).attackable);
        assert!(!overlay(2, 1).attackable);
        assert!(overlay(4, 1).outline);
    }
}
