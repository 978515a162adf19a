//! Unit catalogue and unit instances.
//!
//! This module contains:
//! - `UnitType`: the static stat table for every unit class
//! - `Unit`: a unit on the board (or held inside a transport)
//! - The base-damage table used by the damage script

use crate::board::{PlayerId, Terrain};
use serde::{Deserialize, Serialize};

/// Maximum hit points of every unit
pub const MAX_HP: u32 = 100;

/// Highest veterancy rank
pub const MAX_RANK: u8 = 3;

/// How a unit traverses terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveType {
    Foot,
    Boot,
    Treads,
    Tires,
    Air,
    Ship,
}

/// Which weapon an attack uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weapon {
    /// Consumes ammunition
    Primary,
    /// Unlimited
    Secondary,
}

/// Broad class of a unit, used for cargo and repair rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitClass {
    Ground,
    Air,
    Naval,
}

/// Every unit class in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Infantry,
    Mech,
    Recon,
    Tank,
    Artillery,
    Rockets,
    Apc,
    TransportCopter,
    BattleCopter,
    Lander,
}

impl UnitType {
    /// All unit types in serial order
    pub const ALL: [UnitType; 10] = [
        UnitType::Infantry,
        UnitType::Mech,
        UnitType::Recon,
        UnitType::Tank,
        UnitType::Artillery,
        UnitType::Rockets,
        UnitType::Apc,
        UnitType::TransportCopter,
        UnitType::BattleCopter,
        UnitType::Lander,
    ];

    /// Stable numeric id, used by spawn orders on the wire
    pub fn serial(self) -> u32 {
        Self::ALL.iter().position(|&t| t == self).unwrap_or(0) as u32
    }

    /// Look up a type by its serial
    pub fn from_serial(serial: u32) -> Option<UnitType> {
        Self::ALL.get(serial as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            UnitType::Infantry => "Infantry",
            UnitType::Mech => "Mech",
            UnitType::Recon => "Recon",
            UnitType::Tank => "Tank",
            UnitType::Artillery => "Artillery",
            UnitType::Rockets => "Rockets",
            UnitType::Apc => "APC",
            UnitType::TransportCopter => "T-Copter",
            UnitType::BattleCopter => "B-Copter",
            UnitType::Lander => "Lander",
        }
    }

    /// Deployment cost in funds
    pub fn cost(self) -> u32 {
        match self {
            UnitType::Infantry => 1000,
            UnitType::Mech => 3000,
            UnitType::Recon => 4000,
            UnitType::Tank => 7000,
            UnitType::Artillery => 6000,
            UnitType::Rockets => 15000,
            UnitType::Apc => 5000,
            UnitType::TransportCopter => 5000,
            UnitType::BattleCopter => 9000,
            UnitType::Lander => 12000,
        }
    }

    pub fn move_points(self) -> u32 {
        match self {
            UnitType::Infantry => 3,
            UnitType::Mech => 2,
            UnitType::Recon => 8,
            UnitType::Tank => 6,
            UnitType::Artillery | UnitType::Rockets => 5,
            UnitType::Apc | UnitType::TransportCopter | UnitType::BattleCopter => 6,
            UnitType::Lander => 6,
        }
    }

    pub fn move_type(self) -> MoveType {
        match self {
            UnitType::Infantry => MoveType::Foot,
            UnitType::Mech => MoveType::Boot,
            UnitType::Recon | UnitType::Rockets => MoveType::Tires,
            UnitType::Tank | UnitType::Artillery | UnitType::Apc => MoveType::Treads,
            UnitType::TransportCopter | UnitType::BattleCopter => MoveType::Air,
            UnitType::Lander => MoveType::Ship,
        }
    }

    pub fn class(self) -> UnitClass {
        match self.move_type() {
            MoveType::Air => UnitClass::Air,
            MoveType::Ship => UnitClass::Naval,
            _ => UnitClass::Ground,
        }
    }

    pub fn max_fuel(self) -> u32 {
        match self {
            UnitType::Infantry | UnitType::TransportCopter | UnitType::BattleCopter => 99,
            UnitType::Lander => 99,
            UnitType::Mech | UnitType::Tank | UnitType::Apc => 70,
            UnitType::Recon => 80,
            UnitType::Artillery | UnitType::Rockets => 50,
        }
    }

    /// Primary weapon ammunition; zero means the unit has no primary weapon
    pub fn max_ammo(self) -> u32 {
        match self {
            UnitType::Mech => 3,
            UnitType::Tank | UnitType::Artillery => 9,
            UnitType::Rockets | UnitType::BattleCopter => 6,
            _ => 0,
        }
    }

    /// Fuel burned at the start of each of the owner's turns
    pub fn daily_fuel_drain(self) -> u32 {
        match self {
            UnitType::TransportCopter | UnitType::BattleCopter => 2,
            UnitType::Lander => 1,
            _ => 0,
        }
    }

    /// Attack range as `(min, max)`; `(-1, -1)` for unarmed units
    pub fn attack_range(self) -> (i32, i32) {
        match self {
            UnitType::Artillery => (2, 3),
            UnitType::Rockets => (3, 5),
            UnitType::Apc | UnitType::TransportCopter | UnitType::Lander => (-1, -1),
            _ => (1, 1),
        }
    }

    /// Indirect units may not move and fire in the same order
    pub fn can_move_and_attack(self) -> bool {
        !matches!(self, UnitType::Artillery | UnitType::Rockets)
    }

    /// Direct-fire units counterattack; indirect units never do
    pub fn is_direct(self) -> bool {
        self.attack_range() == (1, 1)
    }

    /// Soldiers can capture and launch silos
    pub fn is_soldier(self) -> bool {
        matches!(self, UnitType::Infantry | UnitType::Mech)
    }

    /// Resuppliers refill adjacent allies
    pub fn is_resupplier(self) -> bool {
        matches!(self, UnitType::Apc)
    }

    /// How many units this type can carry
    pub fn cargo_capacity(self) -> usize {
        match self {
            UnitType::Apc | UnitType::TransportCopter => 1,
            UnitType::Lander => 2,
            _ => 0,
        }
    }

    /// Whether this transport accepts `passenger`
    pub fn can_carry(self, passenger: UnitType) -> bool {
        match self {
            UnitType::Apc | UnitType::TransportCopter => passenger.is_soldier(),
            UnitType::Lander => passenger.class() == UnitClass::Ground,
            _ => false,
        }
    }

    /// The building that deploys this type
    pub fn deployed_from(self) -> Terrain {
        match self.class() {
            UnitClass::Ground => Terrain::Factory,
            UnitClass::Air => Terrain::Airport,
            UnitClass::Naval => Terrain::Port,
        }
    }

    /// Base damage percentage against `defender`, paired with the weapon used.
    ///
    /// The primary weapon is preferred when `has_ammo` and it can hit the target.
    pub fn base_damage(self, defender: UnitType, has_ammo: bool) -> Option<(Weapon, u32)> {
        let primary = if has_ammo {
            primary_damage(self, defender)
        } else {
            None
        };
        primary
            .map(|d| (Weapon::Primary, d))
            .or_else(|| secondary_damage(self, defender).map(|d| (Weapon::Secondary, d)))
    }
}

fn primary_damage(attacker: UnitType, defender: UnitType) -> Option<u32> {
    use UnitType::*;
    let damage = match (attacker, defender) {
        (Mech, Recon) | (Mech, Rockets) => 85,
        (Mech, Tank) => 55,
        (Mech, Artillery) => 70,
        (Mech, Apc) => 75,
        (Tank, Recon) | (Tank, Rockets) => 85,
        (Tank, Tank) => 55,
        (Tank, Artillery) => 70,
        (Tank, Apc) => 75,
        (Tank, Lander) => 10,
        (Artillery, Infantry) => 90,
        (Artillery, Mech) => 85,
        (Artillery, Recon) | (Artillery, Rockets) => 80,
        (Artillery, Tank) | (Artillery, Apc) => 70,
        (Artillery, Artillery) => 75,
        (Artillery, Lander) => 55,
        (Rockets, Infantry) => 95,
        (Rockets, Mech) | (Rockets, Recon) => 90,
        (Rockets, Tank) | (Rockets, Artillery) | (Rockets, Apc) => 80,
        (Rockets, Rockets) => 85,
        (Rockets, Lander) => 60,
        (BattleCopter, Recon) | (BattleCopter, Tank) => 55,
        (BattleCopter, Artillery) | (BattleCopter, Rockets) => 65,
        (BattleCopter, Apc) => 60,
        (BattleCopter, Lander) => 25,
        _ => return None,
    };
    Some(damage)
}

fn secondary_damage(attacker: UnitType, defender: UnitType) -> Option<u32> {
    use UnitType::*;
    let damage = match (attacker, defender) {
        (Infantry, Infantry) => 55,
        (Infantry, Mech) => 45,
        (Infantry, Recon) => 12,
        (Infantry, Tank) => 5,
        (Infantry, Artillery) => 15,
        (Infantry, Rockets) => 25,
        (Infantry, Apc) => 14,
        (Infantry, TransportCopter) => 30,
        (Infantry, BattleCopter) => 7,
        (Mech, Infantry) => 65,
        (Mech, Mech) => 55,
        (Mech, TransportCopter) => 35,
        (Mech, BattleCopter) => 9,
        (Recon, Infantry) => 70,
        (Recon, Mech) => 65,
        (Recon, Recon) => 35,
        (Recon, Tank) => 6,
        (Recon, Artillery) => 45,
        (Recon, Rockets) | (Recon, Apc) => 55,
        (Recon, TransportCopter) => 35,
        (Recon, BattleCopter) => 10,
        (Tank, Infantry) => 75,
        (Tank, Mech) => 70,
        (Tank, TransportCopter) => 40,
        (Tank, BattleCopter) => 10,
        (BattleCopter, Infantry) => 75,
        (BattleCopter, Mech) => 65,
        (BattleCopter, TransportCopter) => 95,
        (BattleCopter, BattleCopter) => 65,
        _ => return None,
    };
    Some(damage)
}

/// Identifier unique among all units ever placed on a board
pub type UnitId = u32;

/// A unit instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitType,
    pub owner: PlayerId,
    /// Hit points, 0..=100
    pub hp: u32,
    pub fuel: u32,
    pub ammo: u32,
    /// Veterancy, 0..=3
    pub rank: u8,
    /// Has already acted this turn
    pub spent: bool,
    /// May receive orders this turn
    pub orderable: bool,
    /// Units held inside this transport
    pub loaded: Vec<Unit>,
}

impl Unit {
    /// A fresh unit at full strength
    pub fn new(id: UnitId, kind: UnitType, owner: PlayerId) -> Self {
        Self {
            id,
            kind,
            owner,
            hp: MAX_HP,
            fuel: kind.max_fuel(),
            ammo: kind.max_ammo(),
            rank: 0,
            spent: false,
            orderable: false,
            loaded: Vec::new(),
        }
    }

    /// Hit points as shown to the player, 1..=10 for a living unit
    pub fn display_hp(&self) -> u32 {
        self.hp.div_ceil(10)
    }

    /// Hit points rounded up to the next multiple of 10
    pub fn rounded_hp(&self) -> u32 {
        self.display_hp() * 10
    }

    /// Whether this unit can receive an order right now
    pub fn is_ready(&self) -> bool {
        self.orderable && !self.spent
    }

    /// Whether this transport has room for `passenger`
    pub fn can_board(&self, passenger: &Unit) -> bool {
        self.owner == passenger.owner
            && self.kind.can_carry(passenger.kind)
            && self.loaded.len() < self.kind.cargo_capacity()
    }

    /// Whether `other` may merge into this unit
    pub fn can_join(&self, other: &Unit) -> bool {
        self.id != other.id
            && self.owner == other.owner
            && self.kind == other.kind
            && self.hp < MAX_HP
            && self.loaded.is_empty()
            && other.loaded.is_empty()
    }

    pub fn resupply(&mut self) {
        self.fuel = self.kind.max_fuel();
        self.ammo = self.kind.max_ammo();
    }

    pub fn needs_supply(&self) -> bool {
        self.fuel < self.kind.max_fuel() || self.ammo < self.kind.max_ammo()
    }

    pub fn rank_up(&mut self) {
        self.rank = (self.rank + 1).min(MAX_RANK);
    }

    /// Deal `damage` hit points, saturating at zero
    pub fn take_damage(&mut self, damage: u32) {
        self.hp = self.hp.saturating_sub(damage);
    }

    pub fn is_destroyed(&self) -> bool {
        self.hp == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit_is_full_strength() {
        let unit = Unit::new(1, UnitType::Tank, 0);
        assert_eq!(unit.hp, MAX_HP);
        assert_eq!(unit.fuel, 70);
        assert_eq!(unit.ammo, 9);
        assert_eq!(unit.display_hp(), 10);
        assert!(!unit.is_ready());
    }

    #[test]
    fn test_display_hp_rounds_up() {
        let mut unit = Unit::new(1, UnitType::Infantry, 0);
        unit.hp = 41;
        assert_eq!(unit.display_hp(), 5);
        assert_eq!(unit.rounded_hp(), 50);
        unit.hp = 40;
        assert_eq!(unit.rounded_hp(), 40);
    }

    #[test]
    fn test_serials_round_trip() {
        for kind in UnitType::ALL {
            assert_eq!(UnitType::from_serial(kind.serial()), Some(kind));
        }
        assert_eq!(UnitType::from_serial(99), None);
    }

    #[test]
    fn test_weapon_selection() {
        // Tanks fire the cannon at tanks while ammo remains
        assert_eq!(
            UnitType::Tank.base_damage(UnitType::Tank, true),
            Some((Weapon::Primary, 55))
        );
        assert_eq!(UnitType::Tank.base_damage(UnitType::Tank, false), None);

        // Machine guns against infantry never need ammo
        assert_eq!(
            UnitType::Tank.base_damage(UnitType::Infantry, true),
            Some((Weapon::Secondary, 75))
        );

        // Transports are unarmed
        assert_eq!(UnitType::Apc.base_damage(UnitType::Infantry, true), None);
    }

    #[test]
    fn test_cargo_rules() {
        let apc = Unit::new(1, UnitType::Apc, 0);
        let soldier = Unit::new(2, UnitType::Mech, 0);
        let tank = Unit::new(3, UnitType::Tank, 0);
        let enemy = Unit::new(4, UnitType::Infantry, 1);

        assert!(apc.can_board(&soldier));
        assert!(!apc.can_board(&tank));
        assert!(!apc.can_board(&enemy));

        let lander = Unit::new(5, UnitType::Lander, 0);
        assert!(lander.can_board(&tank));
        assert_eq!(UnitType::Lander.cargo_capacity(), 2);
    }

    #[test]
    fn test_rank_is_capped() {
        let mut unit = Unit::new(1, UnitType::Recon, 0);
        for _ in 0..10 {
            unit.rank_up();
        }
        assert_eq!(unit.rank, MAX_RANK);
    }
}
