//! Ratification steps: the authoritative effect of each command.

use super::{passable_for, CommandKind, ExitCode, OrderData, RatifyFault, Stage};
use crate::board::{Terrain, CAPTURE_POINTS};
use crate::events::BoardEvent;
use crate::grid::Point;
use crate::unit::{Unit, UnitType, Weapon, MAX_HP};
use std::collections::HashSet;

/// Damage a silo strike deals to every unit in the blast
const SILO_DAMAGE: u32 = 30;

/// Silo strikes never reduce a unit below this
const SILO_FLOOR_HP: u32 = 10;

/// Walk the actor along its path, debiting fuel.
///
/// The walk stops short in front of the first enemy found on the path; the
/// step then reports `Interrupted` so the rest of the chain is skipped. When
/// the goal holds a friendly unit (Join, Load) the actor stays put and the
/// following step takes it off the board.
///
/// Only a ready unit of the seat in play may act, and the whole requested
/// path must fit within the lesser of its move points and fuel.
pub(super) fn travel(data: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let place = data.place()?;
    let path = data.path();
    let unit = stage.board.unit_at(place).ok_or(RatifyFault::NoUnit(place))?;
    let (owner, id, kind) = (unit.owner, unit.id, unit.kind);

    if owner != stage.players.current_id() {
        return Err(RatifyFault::Illegal(format!(
            "unit at {place} belongs to seat {owner}"
        )));
    }
    if !unit.is_ready() {
        return Err(RatifyFault::Illegal(format!(
            "unit at {place} cannot act this turn"
        )));
    }
    let budget = kind.move_points().min(unit.fuel);
    let full_cost = stage
        .board
        .travel_cost_for_path(place, path, kind.move_type())
        .ok_or(RatifyFault::Impassable(place.follow(path)))?;
    if full_cost > budget {
        return Err(RatifyFault::OutOfRange(place.follow(path)));
    }

    let trail = place.trail(path);
    let mut walked = path.len();
    let mut ambusher = None;
    for (i, &p) in trail.iter().enumerate() {
        if stage.board.unit_at(p).is_some_and(|u| u.owner != owner) {
            walked = i;
            ambusher = Some(p);
            break;
        }
    }
    if ambusher.is_some() {
        while walked > 0 && stage.board.unit_at(trail[walked - 1]).is_some() {
            walked -= 1;
        }
    }

    let path = &path[..walked];
    let destination = place.follow(path);
    let cost = stage
        .board
        .travel_cost_for_path(place, path, kind.move_type())
        .ok_or(RatifyFault::Impassable(destination))?;

    let merging = ambusher.is_none()
        && destination != place
        && stage.board.unit_at(destination).is_some()
        && matches!(data.action, CommandKind::Join | CommandKind::Load);
    if !merging {
        stage.board.move_unit(place, destination)?;
        stage.actor = Some(destination);
    }

    let standing = stage.actor_pos()?;
    if let Some(square) = stage.board.square_at_mut(place) {
        square.overlay.hide_unit = false;
    }
    let infinite = kind.is_resupplier() && stage.scenario.resuppliers_infinite_fuel;
    if let Some(unit) = stage.board.unit_at_mut(standing) {
        if !infinite {
            unit.fuel = unit.fuel.saturating_sub(cost);
        }
    }

    if !path.is_empty() {
        stage.events.push(BoardEvent::Move {
            unit: id,
            from: place,
            path: path.to_vec(),
        });
    }

    match ambusher {
        Some(by) => {
            stage.events.push(BoardEvent::Ambush {
                unit: id,
                at: destination,
                by,
            });
            Ok(ExitCode::Interrupted)
        }
        None => Ok(ExitCode::Success),
    }
}

pub(super) fn wait(_: &OrderData, _: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    Ok(ExitCode::Success)
}

/// Exchange fire with the unit at the target location.
///
/// Runs after the actor has moved, so range and counterattack adjacency are
/// measured from the post-move position.
pub(super) fn attack(data: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let from = stage.actor_pos()?;
    let target = data.target()?;
    let mut attacker = stage.actor_unit()?.clone();
    let mut defender = stage
        .board
        .unit_at(target)
        .ok_or(RatifyFault::NoUnit(target))?
        .clone();

    if defender.owner == attacker.owner {
        return Err(RatifyFault::Illegal("cannot attack an allied unit".into()));
    }
    let distance = from.manhattan_distance(target) as i32;
    let (min, max) = attacker.kind.attack_range();
    if distance < min || distance > max {
        return Err(RatifyFault::OutOfRange(target));
    }
    if !data.path().is_empty() && !attacker.kind.can_move_and_attack() {
        return Err(RatifyFault::Illegal(format!(
            "{} cannot move and fire in one order",
            attacker.kind.name()
        )));
    }

    let (weapon, damage) = stage
        .damage
        .roll(&attacker, &defender)
        .ok_or_else(|| RatifyFault::Illegal("no weapon can hit the target".into()))?;
    defender.take_damage(damage);
    if weapon == Weapon::Primary {
        attacker.ammo = attacker.ammo.saturating_sub(1);
    }
    stage.events.push(BoardEvent::Attack {
        attacker: from,
        defender: target,
        weapon,
        damage,
        counter: false,
    });

    if defender.is_destroyed() {
        if stage.scenario.rank_up {
            attacker.rank_up();
        }
    } else if defender.kind.is_direct() && distance == 1 {
        if let Some((weapon, damage)) = stage.damage.roll(&defender, &attacker) {
            attacker.take_damage(damage);
            if weapon == Weapon::Primary {
                defender.ammo = defender.ammo.saturating_sub(1);
            }
            stage.events.push(BoardEvent::Attack {
                attacker: target,
                defender: from,
                weapon,
                damage,
                counter: true,
            });
            if attacker.is_destroyed() && stage.scenario.rank_up {
                defender.rank_up();
            }
        }
    }

    settle(stage, from, attacker)?;
    settle(stage, target, defender)?;
    if stage.board.unit_at(from).is_none() {
        stage.actor = None;
    }
    Ok(ExitCode::Success)
}

/// Write a combatant back to the board, or remove it if destroyed
fn settle(stage: &mut Stage<'_>, at: Point, unit: Unit) -> Result<(), RatifyFault> {
    stage.board.remove_unit(at)?;
    if unit.is_destroyed() {
        stage.events.push(BoardEvent::Destroy { unit: unit.id, at });
        Ok(())
    } else {
        Ok(stage.board.place_unit(at, unit)?)
    }
}

pub(super) fn capture(_: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let at = stage.actor_pos()?;
    let unit = stage.actor_unit()?;
    let (owner, strength) = (unit.owner, unit.display_hp());

    let square = stage
        .board
        .square_at_mut(at)
        .ok_or(RatifyFault::MissingData("square"))?;
    if !square.terrain.is_property() || square.owner == Some(owner) {
        return Err(RatifyFault::Illegal(format!("nothing to capture at {at}")));
    }

    square.capture_points = square.capture_points.saturating_sub(strength);
    let captured = square.capture_points == 0;
    if captured {
        square.owner = Some(owner);
        square.capture_points = CAPTURE_POINTS;
    }
    let remaining = square.capture_points;
    stage.events.push(BoardEvent::Capture {
        at,
        remaining,
        captured,
    });
    Ok(ExitCode::Success)
}

pub(super) fn supply(_: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let at = stage.actor_pos()?;
    let supplier = stage.actor_unit()?;
    if !supplier.kind.is_resupplier() {
        return Err(RatifyFault::Illegal(format!(
            "{} cannot resupply",
            supplier.kind.name()
        )));
    }
    let owner = supplier.owner;

    let mut supplied = Vec::new();
    for p in stage.board.neighbors_at(at).orthogonals {
        if let Some(unit) = stage.board.unit_at_mut(p) {
            if unit.owner == owner {
                unit.resupply();
                supplied.push(p);
            }
        }
    }
    stage.events.push(BoardEvent::Supply { at: supplied });
    Ok(ExitCode::Success)
}

/// Merge the actor into the allied unit of the same type on the goal.
///
/// Health is summed after rounding each side up to a whole display point and
/// capped at the maximum; overflow is refunded in proportion to unit cost.
pub(super) fn join(data: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let from = stage.actor_pos()?;
    let goal = data.goal()?;
    if goal == from {
        return Err(RatifyFault::NoJoinPartner(goal));
    }
    let actor = stage.actor_unit()?.clone();
    let other = stage
        .board
        .unit_at(goal)
        .ok_or(RatifyFault::NoJoinPartner(goal))?;
    if other.owner != actor.owner {
        return Err(RatifyFault::NotAllied);
    }
    if other.kind != actor.kind {
        return Err(RatifyFault::TypeMismatch);
    }

    let summed = actor.rounded_hp() + other.rounded_hp();
    let extra = summed.saturating_sub(MAX_HP);
    let returned_funds = extra * actor.kind.cost() / MAX_HP;

    stage.board.remove_unit(from)?;
    stage.actor = None;
    let merged = stage
        .board
        .unit_at_mut(goal)
        .ok_or(RatifyFault::NoJoinPartner(goal))?;
    merged.hp = summed.min(MAX_HP);
    merged.rank = merged.rank.max(actor.rank);
    merged.fuel = (merged.fuel + actor.fuel).min(merged.kind.max_fuel());
    merged.ammo = (merged.ammo + actor.ammo).min(merged.kind.max_ammo());
    merged.spent = true;

    if let Some(player) = stage.players.get_mut(actor.owner) {
        player.funds += returned_funds;
    }
    stage.events.push(BoardEvent::Join {
        at: goal,
        returned_funds,
    });
    Ok(ExitCode::Success)
}

pub(super) fn load(data: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let from = stage.actor_pos()?;
    let goal = data.goal()?;
    let actor = stage.actor_unit()?;
    let carrier = stage.board.unit_at(goal).ok_or(RatifyFault::NoUnit(goal))?;
    if goal == from || !carrier.can_board(actor) {
        return Err(RatifyFault::Illegal(format!(
            "{} cannot board the unit at {goal}",
            actor.kind.name()
        )));
    }

    let mut passenger = stage.board.remove_unit(from)?;
    passenger.spent = true;
    let id = passenger.id;
    stage.actor = None;
    stage
        .board
        .unit_at_mut(goal)
        .ok_or(RatifyFault::NoUnit(goal))?
        .loaded
        .push(passenger);
    stage.events.push(BoardEvent::Load {
        carrier: goal,
        unit: id,
    });
    Ok(ExitCode::Success)
}

/// Unload every unit in the drop list.
///
/// Indices refer to the cargo as it was when the order began. The whole list
/// is validated first, then units leave in descending index order so the
/// remaining indices stay valid.
pub(super) fn drop(data: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let at = stage.actor_pos()?;
    let carrier = stage.actor_unit()?;
    let drops = data.drops();
    if drops.is_empty() {
        return Err(RatifyFault::InvalidDrop("drop list is empty".into()));
    }

    let mut indices = HashSet::new();
    let mut destinations = HashSet::new();
    for d in drops {
        let held = carrier.loaded.get(d.which).ok_or_else(|| {
            RatifyFault::InvalidDrop(format!(
                "index {} out of bounds for {} held units",
                d.which,
                carrier.loaded.len()
            ))
        })?;
        if !indices.insert(d.which) {
            return Err(RatifyFault::InvalidDrop(format!("index {} dropped twice", d.which)));
        }
        if !destinations.insert(d.destination) {
            return Err(RatifyFault::InvalidDrop(format!(
                "two units dropped on {}",
                d.destination
            )));
        }
        if d.destination.manhattan_distance(at) != 1 {
            return Err(RatifyFault::InvalidDrop(format!(
                "{} is not next to {at}",
                d.destination
            )));
        }
        if stage.board.unit_at(d.destination).is_some() {
            return Err(RatifyFault::InvalidDrop(format!("{} is occupied", d.destination)));
        }
        if !passable_for(&stage.board, d.destination, held.kind) {
            return Err(RatifyFault::InvalidDrop(format!(
                "{} cannot stand on {}",
                held.kind.name(),
                d.destination
            )));
        }
    }

    let mut ordered = drops.to_vec();
    ordered.sort_by(|a, b| b.which.cmp(&a.which));
    for d in ordered {
        let carrier = stage
            .board
            .unit_at_mut(at)
            .ok_or(RatifyFault::NoUnit(at))?;
        let mut unit = carrier.loaded.remove(d.which);
        unit.spent = true;
        unit.orderable = false;
        let id = unit.id;
        stage.board.place_unit(d.destination, unit)?;
        stage.events.push(BoardEvent::Unload {
            carrier: at,
            to: d.destination,
            unit: id,
        });
    }
    Ok(ExitCode::Success)
}

/// Deploy a unit from a building; `action_variant` is the unit type serial
pub(super) fn spawn(data: &OrderData, stage: &mut Stage<'_>) -> Result<ExitCode, RatifyFault> {
    let at = data.place()?;
    let serial = data.variant()?;
    let kind = UnitType::from_serial(serial)
        .ok_or_else(|| RatifyFault::Illegal(format!("unknown unit serial {serial}")))?;
    let owner = stage.players.current_id();

    let square = stage
        .board
        .square_at(at)
        .ok_or(RatifyFault::MissingData("square"))?;
    if square.owner != Some(owner) || square.terrain != kind.deployed_from() {
        return Err(RatifyFault::Illegal(format!(
            "{} cannot be deployed from {at}",
            kind.name()
        )));
    }
    if stage.board.unit_count(owner) >= stage.scenario.unit_limit {
        return Err(RatifyFault::UnitLimit);
    }
    let funds = stage.players.current().funds;
    if !stage.players.expend_funds(kind.cost()) {
        return Err(RatifyFault::InsufficientFunds {
            cost: kind.cost(),
            funds,
        });
    }

    stage.board.spawn_unit(at, kind, owner)?;
    if let Some(unit) = stage.board.unit_at_mut(at) {
        unit.spent = true;
        unit.orderable = false;
    }
    stage.events.push(BoardEvent::Spawn { at, kind, owner });
    Ok(ExitCode::Success)
}

/// Fire the silo the actor stands on at the target location
pub(super) fn launch_silo(
    data: &OrderData,
    stage: &mut Stage<'_>,
) -> Result<ExitCode, RatifyFault> {
    let silo = stage.actor_pos()?;
    let target = data.target()?;
    let square = stage
        .board
        .square_at_mut(silo)
        .ok_or(RatifyFault::MissingData("square"))?;
    if square.terrain != Terrain::Silo {
        return Err(RatifyFault::Illegal(format!("no loaded silo at {silo}")));
    }
    if silo.manhattan_distance(target) > super::SILO_RANGE.1 as u32 {
        return Err(RatifyFault::OutOfRange(target));
    }
    square.terrain = Terrain::UsedSilo;

    let blast = stage.ranges.get(super::SILO_BLAST.0, super::SILO_BLAST.1);
    let mut hits = Vec::new();
    for p in blast.points_around(target) {
        if let Some(unit) = stage.board.unit_at_mut(p) {
            if unit.hp > SILO_FLOOR_HP {
                unit.hp = unit.hp.saturating_sub(SILO_DAMAGE).max(SILO_FLOOR_HP);
            }
            hits.push(p);
        }
    }
    stage.events.push(BoardEvent::SiloImpact { silo, target, hits });
    Ok(ExitCode::Success)
}
