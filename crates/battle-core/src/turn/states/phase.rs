//! Turn bookkeeping: start-of-turn upkeep, standings, and hand-over.

use super::pressed;
use crate::assets::{BattleAssets, Outcome};
use crate::board::{Board, PlayerId, CAPTURE_POINTS};
use crate::events::BoardEvent;
use crate::grid::Point;
use crate::input::Button;
use crate::instruction::{CommandInstruction, RemoteOrder};
use crate::turn::{StateError, StateKind, StateLogic, Transition, Wake};
use crate::unit::{UnitClass, MAX_HP};
use tracing::info;

/// Ticks the player card stays up unless dismissed
const PLAYER_CARD_TICKS: u32 = 48;

/// Ticks the victory or defeat card stays up unless dismissed
const RESULT_CARD_TICKS: u32 = 120;

#[derive(Debug)]
pub struct GameStart;

impl StateLogic for GameStart {
    fn kind(&self) -> StateKind {
        StateKind::GameStart
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        info!(players = assets.players.len(), "battle begins");
        if assets.intro.is_empty() {
            t.advance(&[StateKind::TurnStart]);
        } else {
            t.advance(&[StateKind::TextCutscene, StateKind::TurnStart]);
        }
        Ok(())
    }
}

/// Pages through the intro lines, one per A press
#[derive(Debug, Default)]
pub struct TextCutscene {
    line: usize,
}

impl TextCutscene {
    pub fn line(&self) -> usize {
        self.line
    }
}

impl StateLogic for TextCutscene {
    fn kind(&self) -> StateKind {
        StateKind::TextCutscene
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        self.line = 0;
        if assets.intro.is_empty() {
            t.advance_next();
        }
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        if pressed(assets, Button::A) {
            self.line += 1;
            if self.line >= assets.intro.len() {
                t.advance_next();
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct TurnStart;

impl StateLogic for TurnStart {
    fn kind(&self) -> StateKind {
        StateKind::TurnStart
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        assets.instruction = CommandInstruction::default();
        assets.forecast = None;
        assets.board.clear_tile_overlay();
        let player = assets.players.current();
        info!(day = assets.players.day, player = %player.name, "turn start");
        t.advance(&[
            StateKind::ResetPerspective,
            StateKind::PlayerCard,
            StateKind::StandbyPhase,
        ]);
        Ok(())
    }
}

/// Points the camera at the incoming seat
#[derive(Debug)]
pub struct ResetPerspective;

impl StateLogic for ResetPerspective {
    fn kind(&self) -> StateKind {
        StateKind::ResetPerspective
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        let player = assets.players.current();
        let (id, remote) = (player.id, player.remote);
        let focus = player
            .last_cursor
            .or(player.hq)
            .or_else(|| assets.board.units_of(id).next().map(|(p, _)| p))
            .unwrap_or_default();

        if !remote {
            assets.players.perspective = id;
        }
        assets.cursor.teleport(focus, &assets.board);
        t.advance_next();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PlayerCard {
    ticks: u32,
}

impl StateLogic for PlayerCard {
    fn kind(&self) -> StateKind {
        StateKind::PlayerCard
    }

    fn configure(
        &mut self,
        _assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        self.ticks = 0;
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        self.ticks += 1;
        if self.ticks >= PLAYER_CARD_TICKS || pressed(assets, Button::A) {
            t.advance_next();
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StandbyPhase {
    done: bool,
}

impl StateLogic for StandbyPhase {
    fn kind(&self) -> StateKind {
        StateKind::StandbyPhase
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        if !self.done {
            standby(assets);
            self.done = true;
        }
        t.advance(&[StateKind::AnimateEvents, StateKind::CheckBoardState]);
        Ok(())
    }
}

/// Start-of-turn upkeep for the current seat.
///
/// Pays income, burns daily fuel, then repairs and resupplies units standing
/// on their own buildings or next to an allied resupplier. Aircraft and ships
/// left without fuel crash. Every unit of the seat becomes orderable.
pub(crate) fn standby(assets: &mut BattleAssets) {
    let BattleAssets {
        board,
        players,
        scenario,
        events,
        ..
    } = assets;
    let owner = players.current_id();

    let income = players.collect_income(board, scenario);
    if income > 0 {
        events.push(BoardEvent::Income {
            player: owner,
            amount: income,
        });
    }

    let positions: Vec<Point> = board.units_of(owner).map(|(p, _)| p).collect();
    let suppliers: Vec<Point> = board
        .units_of(owner)
        .filter(|(_, u)| u.kind.is_resupplier())
        .map(|(p, _)| p)
        .collect();

    let mut supplied = Vec::new();
    for p in positions {
        let on_depot = board.square_at(p).is_some_and(|s| {
            s.owner == Some(owner)
                && board
                    .unit_at(p)
                    .is_some_and(|u| s.terrain.repairs(u.kind.class()))
        });
        let beside_supplier = suppliers.iter().any(|s| s.manhattan_distance(p) == 1);
        let Some(unit) = board.unit_at_mut(p) else {
            continue;
        };

        unit.spent = false;
        unit.orderable = true;
        let drain = unit.kind.daily_fuel_drain();
        unit.fuel = unit.fuel.saturating_sub(drain);

        if on_depot && unit.hp < MAX_HP {
            let healed = (unit.rounded_hp() + scenario.repair_hp).min(MAX_HP);
            let gain = healed - unit.hp;
            if players.expend_funds(gain * unit.kind.cost() / MAX_HP) {
                unit.hp = healed;
                events.push(BoardEvent::Repair { at: p, hp: gain });
            }
        }
        if on_depot || beside_supplier {
            unit.resupply();
            supplied.push(p);
        }

        if drain > 0 && unit.fuel == 0 && unit.kind.class() != UnitClass::Ground {
            let id = unit.id;
            if board.remove_unit(p).is_ok() {
                events.push(BoardEvent::Destroy { unit: id, at: p });
            }
        }
    }
    if !supplied.is_empty() {
        events.push(BoardEvent::Supply { at: supplied });
    }
}

/// Decides whether the game goes on, and who plays next
#[derive(Debug)]
pub struct CheckBoardState;

impl StateLogic for CheckBoardState {
    fn kind(&self) -> StateKind {
        StateKind::CheckBoardState
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        let standing = assets
            .players
            .refresh_standing(&assets.board, &assets.scenario);
        for &id in &standing.newly_defeated {
            info!(player = id, "player defeated");
            retire(&mut assets.board, id);
        }

        if let Some(winner) = standing.winner {
            let victory = winner == assets.players.perspective;
            assets.outcome = Some(Outcome { winner, victory });
            t.advance(&[if victory {
                StateKind::GameWin
            } else {
                StateKind::GameLose
            }]);
            return Ok(());
        }

        let current = assets.players.current();
        if current.defeated {
            t.advance(&[StateKind::TurnEnd]);
        } else if current.remote {
            t.advance(&[StateKind::AnimateEvents, StateKind::WaitForNextInstruction]);
        } else {
            t.advance(&[StateKind::AnimateEvents, StateKind::PickUnit]);
        }
        Ok(())
    }
}

/// Clear a defeated seat off the board: its units go and its buildings turn neutral
fn retire(board: &mut Board, owner: PlayerId) {
    let points: Vec<Point> = board.points().collect();
    for p in points {
        if let Some(square) = board.square_at_mut(p) {
            if square.unit.as_ref().is_some_and(|u| u.owner == owner) {
                square.unit = None;
            }
            if square.owner == Some(owner) {
                square.owner = None;
                square.capture_points = CAPTURE_POINTS;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TurnEnd {
    done: bool,
}

impl StateLogic for TurnEnd {
    fn kind(&self) -> StateKind {
        StateKind::TurnEnd
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        if !self.done {
            let owner = assets.players.current_id();
            let positions: Vec<Point> = assets.board.units_of(owner).map(|(p, _)| p).collect();
            for p in positions {
                if let Some(unit) = assets.board.unit_at_mut(p) {
                    unit.spent = false;
                    unit.orderable = false;
                }
            }
            assets.board.clear_tile_overlay();
            let cursor = assets.cursor.pos();
            assets.players.current_mut().last_cursor = Some(cursor);
            assets.publish(RemoteOrder::EndTurn);
            info!(player = owner, "turn end");
            self.done = true;
        }
        t.advance(&[StateKind::TurnChange]);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TurnChange {
    done: bool,
}

impl StateLogic for TurnChange {
    fn kind(&self) -> StateKind {
        StateKind::TurnChange
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        t: &mut Transition,
    ) -> Result<(), StateError> {
        if !self.done {
            assets.players.increment();
            self.done = true;
        }
        t.advance(&[StateKind::TurnStart]);
        Ok(())
    }
}

/// Result card shared by the win and lose screens
fn result_card(ticks: &mut u32, assets: &BattleAssets, t: &mut Transition) {
    *ticks += 1;
    if *ticks >= RESULT_CARD_TICKS || pressed(assets, Button::A) {
        t.advance(&[StateKind::GameEnd]);
    }
}

#[derive(Debug, Default)]
pub struct GameWin {
    ticks: u32,
}

impl StateLogic for GameWin {
    fn kind(&self) -> StateKind {
        StateKind::GameWin
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        info!(outcome = ?assets.outcome, "victory");
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        result_card(&mut self.ticks, assets, t);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct GameLose {
    ticks: u32,
}

impl StateLogic for GameLose {
    fn kind(&self) -> StateKind {
        StateKind::GameLose
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        info!(outcome = ?assets.outcome, "defeat");
        Ok(())
    }

    fn update(&mut self, assets: &mut BattleAssets, t: &mut Transition) -> Result<(), StateError> {
        result_card(&mut self.ticks, assets, t);
        Ok(())
    }
}

#[derive(Debug)]
pub struct GameEnd;

impl StateLogic for GameEnd {
    fn kind(&self) -> StateKind {
        StateKind::GameEnd
    }

    fn configure(
        &mut self,
        assets: &mut BattleAssets,
        _wake: Wake,
        _t: &mut Transition,
    ) -> Result<(), StateError> {
        assets.finished = true;
        info!("battle over");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::states::fixtures::{assets, configure, press, update};
    use crate::turn::Request;
    use crate::unit::UnitType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_game_start_plays_intro_first() {
        let mut a = assets(". .");
        let t = &mut configure(&mut GameStart, &mut a);
        assert_eq!(t.take(), Some(Request::Advance(vec![StateKind::TurnStart])));

        a.intro = vec!["Hold the bridge.".into()];
        let t = &mut configure(&mut GameStart, &mut a);
        assert_eq!(
            t.take(),
            Some(Request::Advance(vec![
                StateKind::TextCutscene,
                StateKind::TurnStart
            ]))
        );
    }

    #[test]
    fn test_cutscene_pages_on_a() {
        let mut a = assets(". .");
        a.intro = vec!["one".into(), "two".into()];
        let mut scene = TextCutscene::default();
        assert!(!configure(&mut scene, &mut a).is_requested());

        press(&mut a, Button::A);
        assert!(!update(&mut scene, &mut a).is_requested());
        assert_eq!(scene.line(), 1);
        press(&mut a, Button::A);
        assert_eq!(update(&mut scene, &mut a).take(), Some(Request::AdvanceNext));
    }

    #[test]
    fn test_player_card_times_out() {
        let mut a = assets(". .");
        let mut card = PlayerCard::default();
        configure(&mut card, &mut a);
        for _ in 1..PLAYER_CARD_TICKS {
            assert!(!update(&mut card, &mut a).is_requested());
        }
        assert!(update(&mut card, &mut a).is_requested());
    }

    #[test]
    fn test_standby_income_and_repair() {
        let mut a = assets("C0 F0 . H1");
        a.board.spawn_unit(Point::new(1, 0), UnitType::Tank, 0).unwrap();
        {
            let tank = a.board.unit_at_mut(Point::new(1, 0)).unwrap();
            tank.hp = 45;
            tank.fuel = 3;
            tank.spent = true;
        }

        standby(&mut a);

        // 2000 income, then 25 hp of a 7000 tank costs 1750
        assert_eq!(a.players.current().funds, 250);
        let tank = a.board.unit_at(Point::new(1, 0)).unwrap();
        assert_eq!(tank.hp, 70);
        assert_eq!(tank.fuel, 70);
        assert!(tank.is_ready());
        assert_eq!(
            a.events.drain(),
            vec![
                BoardEvent::Income {
                    player: 0,
                    amount: 2000
                },
                BoardEvent::Repair {
                    at: Point::new(1, 0),
                    hp: 25
                },
                BoardEvent::Supply {
                    at: vec![Point::new(1, 0)]
                },
            ]
        );
    }

    #[test]
    fn test_standby_skips_repair_without_funds() {
        let mut a = assets("F0 . H1");
        a.scenario.income_per_property = 0;
        a.board.spawn_unit(Point::new(0, 0), UnitType::Infantry, 0).unwrap();
        a.board.unit_at_mut(Point::new(0, 0)).unwrap().hp = 50;

        standby(&mut a);
        assert_eq!(a.board.unit_at(Point::new(0, 0)).unwrap().hp, 50);
    }

    #[test]
    fn test_standby_supplies_beside_apc_and_crashes_dry_aircraft() {
        let mut a = assets(". . . .");
        a.board.spawn_unit(Point::new(0, 0), UnitType::Apc, 0).unwrap();
        a.board.spawn_unit(Point::new(1, 0), UnitType::TransportCopter, 0).unwrap();
        a.board.spawn_unit(Point::new(3, 0), UnitType::BattleCopter, 0).unwrap();
        a.board.unit_at_mut(Point::new(1, 0)).unwrap().fuel = 1;
        a.board.unit_at_mut(Point::new(3, 0)).unwrap().fuel = 2;

        standby(&mut a);

        assert_eq!(a.board.unit_at(Point::new(1, 0)).unwrap().fuel, 99);
        assert!(a.board.unit_at(Point::new(3, 0)).is_none());
    }

    #[test]
    fn test_standby_runs_once_per_instance() {
        let mut a = assets("C0 . H1");
        let mut phase = StandbyPhase::default();
        configure(&mut phase, &mut a);
        let mut t = Transition::default();
        phase.configure(&mut a, Wake::Regress, &mut t).unwrap();
        assert_eq!(a.players.current().funds, 1000);
    }

    #[test]
    fn test_check_board_routes_by_seat() {
        let mut a = assets("H0 . . H1");
        a.board.spawn_unit(Point::new(1, 0), UnitType::Infantry, 0).unwrap();
        a.board.spawn_unit(Point::new(2, 0), UnitType::Infantry, 1).unwrap();
        assert_eq!(
            configure(&mut CheckBoardState, &mut a).take(),
            Some(Request::Advance(vec![
                StateKind::AnimateEvents,
                StateKind::PickUnit
            ]))
        );

        a.players.current_mut().remote = true;
        assert_eq!(
            configure(&mut CheckBoardState, &mut a).take(),
            Some(Request::Advance(vec![
                StateKind::AnimateEvents,
                StateKind::WaitForNextInstruction
            ]))
        );
    }

    #[test]
    fn test_captured_hq_ends_the_game() {
        let mut a = assets("H0 . H1");
        a.board.spawn_unit(Point::new(1, 0), UnitType::Infantry, 1).unwrap();
        a.board.square_at_mut(Point::new(0, 0)).unwrap().owner = Some(1);

        let t = &mut configure(&mut CheckBoardState, &mut a);
        assert_eq!(t.take(), Some(Request::Advance(vec![StateKind::GameLose])));
        assert_eq!(
            a.outcome,
            Some(Outcome {
                winner: 1,
                victory: false
            })
        );
        assert!(a.players.get(0).unwrap().defeated);
    }

    #[test]
    fn test_retire_clears_units_and_buildings() {
        let mut a = assets("C0 . H1");
        a.board.spawn_unit(Point::new(1, 0), UnitType::Recon, 0).unwrap();
        retire(&mut a.board, 0);
        assert!(a.board.unit_at(Point::new(1, 0)).is_none());
        assert_eq!(a.board.square_at(Point::new(0, 0)).unwrap().owner, None);
        assert_eq!(a.board.square_at(Point::new(2, 0)).unwrap().owner, Some(1));
    }

    #[test]
    fn test_turn_end_hands_over() {
        let mut a = assets("H0 . H1");
        a.players.get_mut(1).unwrap().remote = true;
        a.board.spawn_unit(Point::new(1, 0), UnitType::Infantry, 0).unwrap();
        a.board.unit_at_mut(Point::new(1, 0)).unwrap().spent = true;

        let mut end = TurnEnd::default();
        configure(&mut end, &mut a);
        let unit = a.board.unit_at(Point::new(1, 0)).unwrap();
        assert!(!unit.spent && !unit.orderable);
        assert_eq!(a.outbox, vec![RemoteOrder::EndTurn]);

        let mut change = TurnChange::default();
        configure(&mut change, &mut a);
        assert_eq!(a.players.current_id(), 1);
    }
}
