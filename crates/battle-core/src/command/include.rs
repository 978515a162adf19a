//! Menu inclusion predicates and target listings.

use super::{passable_for, OrderQuery};
use crate::damage::DamageScript;
use crate::grid::Point;
use crate::region::RangeSieve;

pub(super) fn never(_: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    false
}

pub(super) fn wait(query: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    query.actor().is_some() && query.goal_is_free()
}

pub(super) fn attack(query: &OrderQuery<'_>, ranges: &mut RangeSieve) -> bool {
    query.goal_is_free() && !attack_targets(query, ranges).is_empty()
}

pub(super) fn capture(query: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    let (Some(actor), Some(goal)) = (query.actor(), query.goal()) else {
        return false;
    };
    actor.kind.is_soldier()
        && query.goal_is_free()
        && query
            .board
            .square_at(goal)
            .is_some_and(|s| s.terrain.is_property() && s.owner != Some(actor.owner))
}

pub(super) fn supply(query: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    let (Some(actor), Some(goal)) = (query.actor(), query.goal()) else {
        return false;
    };
    actor.kind.is_resupplier()
        && query.goal_is_free()
        && query
            .board
            .neighbors_at(goal)
            .orthogonals
            .into_iter()
            .filter_map(|p| query.board.unit_at(p))
            .any(|u| u.id != actor.id && u.owner == actor.owner && u.needs_supply())
}

pub(super) fn join(query: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    let (Some(actor), Some(place), Some(goal)) = (query.actor(), query.place(), query.goal()) else {
        return false;
    };
    goal != place
        && query
            .board
            .unit_at(goal)
            .is_some_and(|other| other.can_join(actor))
}

pub(super) fn load(query: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    let (Some(actor), Some(place), Some(goal)) = (query.actor(), query.place(), query.goal()) else {
        return false;
    };
    goal != place
        && query
            .board
            .unit_at(goal)
            .is_some_and(|carrier| carrier.can_board(actor))
}

/// Drop is considered per held unit: `query.variant` is the cargo index
pub(super) fn drop(query: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    let Some(which) = query.variant else {
        return false;
    };
    let which = which as usize;
    query.goal_is_free()
        && query.actor().is_some_and(|a| which < a.loaded.len())
        && !query.instruction.is_dropping(which)
        && !drop_spots(query, which).is_empty()
}

pub(super) fn launch_silo(query: &OrderQuery<'_>, _: &mut RangeSieve) -> bool {
    let (Some(actor), Some(goal)) = (query.actor(), query.goal()) else {
        return false;
    };
    actor.kind.is_soldier()
        && query.goal_is_free()
        && query
            .board
            .square_at(goal)
            .is_some_and(|s| s.terrain == crate::board::Terrain::Silo)
}

/// Enemy units the actor could fire on from its goal tile
pub fn attack_targets(query: &OrderQuery<'_>, ranges: &mut RangeSieve) -> Vec<Point> {
    let (Some(actor), Some(goal)) = (query.actor(), query.goal()) else {
        return Vec::new();
    };
    if query.moved() && !actor.kind.can_move_and_attack() {
        return Vec::new();
    }

    let (min, max) = actor.kind.attack_range();
    let mut targets: Vec<Point> = ranges
        .get(min, max)
        .points_around(goal)
        .into_iter()
        .filter(|&p| {
            query.board.unit_at(p).is_some_and(|target| {
                target.owner != actor.owner
                    && actor.kind.base_damage(target.kind, actor.ammo > 0).is_some()
            })
        })
        .collect();
    targets.sort_by_key(|p| (p.y, p.x));
    targets
}

/// Unfuzzed damage the actor would deal to the unit at `target`
pub fn damage_forecast(query: &OrderQuery<'_>, target: Point) -> Option<u32> {
    let actor = query.actor()?;
    let defender = query.board.unit_at(target)?;
    DamageScript::estimate(actor, defender).map(|(_, damage)| damage)
}

/// Tiles next to the goal where held unit `which` could be placed.
///
/// The actor's starting tile counts as free, since the actor walks off it.
/// Destinations already claimed by the drop list are excluded.
pub fn drop_spots(query: &OrderQuery<'_>, which: usize) -> Vec<Point> {
    let (Some(actor), Some(place), Some(goal)) = (query.actor(), query.place(), query.goal()) else {
        return Vec::new();
    };
    let Some(held) = actor.loaded.get(which) else {
        return Vec::new();
    };

    query
        .board
        .neighbors_at(goal)
        .orthogonals
        .into_iter()
        .filter(|&p| {
            (p == place || query.board.unit_at(p).is_none())
                && passable_for(query.board, p, held.kind)
                && !query
                    .instruction
                    .drop_list
                    .iter()
                    .any(|d| d.destination == p)
        })
        .collect()
}

/// Tiles on the board within `range` of the goal
pub fn map_targets(query: &OrderQuery<'_>, ranges: &mut RangeSieve, range: (i32, i32)) -> Vec<Point> {
    let Some(goal) = query.goal() else {
        return Vec::new();
    };
    ranges
        .get(range.0, range.1)
        .points_around(goal)
        .into_iter()
        .filter(|&p| query.board.contains(p))
        .collect()
}
