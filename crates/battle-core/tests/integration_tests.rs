//! Integration tests for the battle engine.
//!
//! These drive a `BattleSystemManager` the way a host does: one controller
//! sample per tick, with board events drained as a renderer would.

use battle_core::*;
use pretty_assertions::assert_eq;

const TICK_LIMIT: usize = 1000;

fn assets(terrain: &str, units: &[(i32, i32, UnitType, PlayerId)]) -> BattleAssets {
    let mut board = Board::parse(terrain).unwrap();
    for &(x, y, kind, owner) in units {
        board.spawn_unit(Point::new(x, y), kind, owner).unwrap();
    }
    let scenario = Scenario {
        seed: Some(2024),
        ..Scenario::default()
    };
    let players = Players::new(&["Red", "Blue"], &board, &scenario);
    BattleAssets::new(board, players, scenario)
}

fn tick(m: &mut BattleSystemManager, held: &[Button], axis: Point) {
    m.assets_mut().poll_input(held, axis);
    m.assets_mut().events.drain();
    m.update().unwrap();
}

/// Tick until no transition is pending
fn settle(m: &mut BattleSystemManager) {
    for _ in 0..TICK_LIMIT {
        if !m.is_transitioning() {
            return;
        }
        tick(m, &[], Point::default());
    }
    panic!("never settled: {}", m.state_history());
}

/// Tick with no input until `kind` is on top and at rest.
/// Intro pages are clicked through on the way.
fn run_until(m: &mut BattleSystemManager, kind: StateKind) {
    for _ in 0..TICK_LIMIT {
        if m.current_kind() == kind && !m.is_transitioning() {
            return;
        }
        if m.current_kind() == StateKind::TextCutscene && !m.is_transitioning() {
            press(m, Button::A);
            continue;
        }
        tick(m, &[], Point::default());
    }
    panic!("never reached {kind}: {}", m.state_history());
}

/// Press and release `button`. Input is edge-triggered, so the release
/// tick lets the next press of the same button register.
fn press(m: &mut BattleSystemManager, button: Button) {
    tick(m, &[button], Point::default());
    tick(m, &[], Point::default());
    settle(m);
}

fn steer(m: &mut BattleSystemManager, dir: Direction) {
    tick(m, &[], dir.unit());
    tick(m, &[], Point::default());
    settle(m);
}

/// Put the cursor on `p` and press A
fn select(m: &mut BattleSystemManager, p: Point) {
    let assets = m.assets_mut();
    assets.cursor.teleport(p, &assets.board);
    press(m, Button::A);
}

fn menu_labels(m: &BattleSystemManager) -> Vec<String> {
    match m.current_state() {
        TurnState::CommandMenu(menu) => menu.entries().iter().map(|e| e.label.clone()).collect(),
        other => panic!("not in the command menu: {:?}", other.kind()),
    }
}

/// Scroll the command menu to `label` and pick it
fn choose(m: &mut BattleSystemManager, label: &str) {
    let index = menu_labels(m)
        .iter()
        .position(|l| l == label)
        .unwrap_or_else(|| panic!("{label} not offered: {:?}", menu_labels(m)));
    for _ in 0..index {
        steer(m, Direction::South);
    }
    press(m, Button::A);
}

fn end_turn(m: &mut BattleSystemManager) {
    press(m, Button::Start);
    assert_eq!(m.current_kind(), StateKind::FieldMenu);
    press(m, Button::A);
}

#[test]
fn test_full_local_turn() {
    let map = maps::named("duel").unwrap();
    let assets = map.assets(&["Red", "Blue"], Scenario::default()).unwrap();
    let mut m = BattleSystemManager::new(assets).unwrap();

    run_until(&mut m, StateKind::PickUnit);
    assert_eq!(m.assets().players.current_id(), 0);
    assert_eq!(m.assets().players.current().funds, 2000);

    select(&mut m, Point::new(1, 0));
    assert_eq!(m.current_kind(), StateKind::MoveUnit);
    steer(&mut m, Direction::East);
    press(&mut m, Button::A);
    assert_eq!(menu_labels(&m), vec!["Wait"]);
    choose(&mut m, "Wait");
    run_until(&mut m, StateKind::PickUnit);

    let unit = m.assets().board.unit_at(Point::new(2, 0)).unwrap();
    assert_eq!(unit.kind, UnitType::Infantry);
    assert!(unit.spent);
    assert_eq!(unit.fuel, UnitType::Infantry.max_fuel() - 1);
    assert!(m.assets().board.unit_at(Point::new(1, 0)).is_none());

    end_turn(&mut m);
    run_until(&mut m, StateKind::PickUnit);
    assert_eq!(m.assets().players.current_id(), 1);
    assert_eq!(m.assets().players.perspective, 1);
    assert!(!m.assets().board.unit_at(Point::new(2, 0)).unwrap().spent);
}

#[test]
fn test_attack_through_menus() {
    let mut m = BattleSystemManager::new(assets(
        "H0 . . H1\nF0 . . F1",
        &[(1, 0, UnitType::Tank, 0), (2, 0, UnitType::Tank, 1)],
    ))
    .unwrap();
    run_until(&mut m, StateKind::PickUnit);

    select(&mut m, Point::new(1, 0));
    press(&mut m, Button::A);
    assert_eq!(menu_labels(&m), vec!["Attack", "Wait"]);
    choose(&mut m, "Attack");
    assert_eq!(m.current_kind(), StateKind::ChooseAttackTarget);
    assert!(m.assets().forecast.is_some());

    press(&mut m, Button::A);
    run_until(&mut m, StateKind::PickUnit);

    let attacker = m.assets().board.unit_at(Point::new(1, 0)).unwrap();
    let defender = m.assets().board.unit_at(Point::new(2, 0)).unwrap();
    assert!(defender.hp < 100);
    assert!(attacker.hp < 100);
    assert_eq!(attacker.ammo, UnitType::Tank.max_ammo() - 1);
    assert!(attacker.spent);
}

#[test]
fn test_backing_out_leaves_board_untouched() {
    let mut m = BattleSystemManager::new(assets(
        "H0 . . H1\nF0 . . F1",
        &[(1, 0, UnitType::Tank, 0), (2, 0, UnitType::Tank, 1)],
    ))
    .unwrap();
    run_until(&mut m, StateKind::PickUnit);
    let before = m.assets().board.clone();

    select(&mut m, Point::new(1, 0));
    press(&mut m, Button::A);
    choose(&mut m, "Attack");
    assert_eq!(m.current_kind(), StateKind::ChooseAttackTarget);

    press(&mut m, Button::B);
    assert_eq!(m.current_kind(), StateKind::CommandMenu);
    assert_eq!(m.assets().instruction.action, None);
    press(&mut m, Button::B);
    assert_eq!(m.current_kind(), StateKind::MoveUnit);
    press(&mut m, Button::B);
    assert_eq!(m.current_kind(), StateKind::PickUnit);

    assert_eq!(m.assets().board, before);
    assert!(m.upcoming().is_empty());
}

#[test]
fn test_silo_strike() {
    let map = maps::named("devroom").unwrap();
    let assets = map.assets(&["Red", "Blue"], Scenario::default()).unwrap();
    let mut m = BattleSystemManager::new(assets).unwrap();
    run_until(&mut m, StateKind::PickUnit);

    select(&mut m, Point::new(3, 0));
    steer(&mut m, Direction::East);
    press(&mut m, Button::A);
    choose(&mut m, "Launch");
    assert_eq!(m.current_kind(), StateKind::ChooseMapTarget);
    assert!(m.assets().cursor.area.is_some());

    for _ in 0..4 {
        steer(&mut m, Direction::South);
    }
    steer(&mut m, Direction::East);
    assert_eq!(m.assets().cursor.pos(), Point::new(5, 4));
    press(&mut m, Button::A);
    run_until(&mut m, StateKind::PickUnit);

    let board = &m.assets().board;
    assert_eq!(
        board.square_at(Point::new(4, 0)).map(|s| s.terrain),
        Some(Terrain::UsedSilo)
    );
    for p in [Point::new(5, 4), Point::new(6, 4), Point::new(6, 5)] {
        assert_eq!(board.unit_at(p).unwrap().hp, 70, "unit at {p}");
    }
    assert_eq!(board.unit_at(Point::new(4, 0)).unwrap().kind, UnitType::Mech);
}

#[test]
fn test_hq_capture_ends_game() {
    let mut m = BattleSystemManager::new(assets(
        "H0 . H1\nF0 . F1",
        &[(1, 0, UnitType::Infantry, 0)],
    ))
    .unwrap();
    run_until(&mut m, StateKind::PickUnit);

    select(&mut m, Point::new(1, 0));
    steer(&mut m, Direction::East);
    press(&mut m, Button::A);
    choose(&mut m, "Capture");
    run_until(&mut m, StateKind::PickUnit);
    assert_eq!(
        m.assets().board.square_at(Point::new(2, 0)).unwrap().capture_points,
        10
    );

    end_turn(&mut m);
    run_until(&mut m, StateKind::PickUnit);
    end_turn(&mut m);
    run_until(&mut m, StateKind::PickUnit);
    assert_eq!(m.assets().players.day, 2);

    select(&mut m, Point::new(2, 0));
    press(&mut m, Button::A);
    choose(&mut m, "Capture");
    run_until(&mut m, StateKind::GameEnd);

    assert_eq!(
        m.assets().outcome,
        Some(Outcome {
            winner: 0,
            victory: true
        })
    );
    assert!(m.assets().finished);
    assert!(m.is_idle());
}

/// Two engines, one per seat, joined only by their mailboxes
#[test]
fn test_networked_replay_matches() {
    let units = [(1, 0, UnitType::Tank, 0), (2, 0, UnitType::Tank, 1)];
    let mut red_side = assets("H0 . . H1\nF0 . . F1", &units);
    red_side.players.get_mut(1).unwrap().remote = true;
    let mut blue_side = assets("H0 . . H1\nF0 . . F1", &units);
    blue_side.players.get_mut(0).unwrap().remote = true;

    let mut red = BattleSystemManager::new(red_side).unwrap();
    let mut blue = BattleSystemManager::new(blue_side).unwrap();
    run_until(&mut red, StateKind::PickUnit);
    run_until(&mut blue, StateKind::WaitForNextInstruction);
    assert!(blue.is_idle());

    select(&mut red, Point::new(1, 0));
    press(&mut red, Button::A);
    choose(&mut red, "Attack");
    press(&mut red, Button::A);
    run_until(&mut red, StateKind::PickUnit);
    end_turn(&mut red);
    run_until(&mut red, StateKind::WaitForNextInstruction);

    let sent: Vec<RemoteOrder> = red.assets_mut().outbox.drain(..).collect();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1], RemoteOrder::EndTurn);
    blue.assets_mut().inbox.extend(sent);
    run_until(&mut blue, StateKind::PickUnit);

    assert_eq!(red.assets().board, blue.assets().board);
    assert_eq!(red.assets().players.current_id(), 1);
    assert_eq!(blue.assets().players.current_id(), 1);
    assert!(blue.assets().outbox.is_empty());
}

#[test]
fn test_bad_remote_order_is_dropped() {
    let mut side = assets(
        "H0 . . H1\nF0 . . F1",
        &[(1, 0, UnitType::Tank, 0), (2, 0, UnitType::Tank, 1)],
    );
    side.players.get_mut(0).unwrap().remote = true;
    let mut m = BattleSystemManager::new(side).unwrap();
    run_until(&mut m, StateKind::WaitForNextInstruction);
    let before = m.assets().board.clone();

    let bogus = CommandInstruction {
        actor_location: Some(Point::new(3, 1)),
        path: Some(vec![]),
        action: Some(CommandKind::Wait),
        ..CommandInstruction::new(1)
    };
    m.assets_mut().inbox.push_back(RemoteOrder::Instruction(bogus));
    m.assets_mut().inbox.push_back(RemoteOrder::EndTurn);

    tick(&mut m, &[], Point::default());
    settle(&mut m);
    assert_eq!(m.current_kind(), StateKind::WaitForNextInstruction);
    assert_eq!(m.assets().board, before);
    assert!(m.state_history().contains("!RatifyIssuedOrder"));

    run_until(&mut m, StateKind::PickUnit);
    assert_eq!(m.assets().players.current_id(), 1);
}
