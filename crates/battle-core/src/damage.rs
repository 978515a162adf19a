//! Damage resolution.
//!
//! Damage scales with the attacker's health and is fuzzed by up to ±5%. The
//! fuzz comes from a ChaCha stream seeded by the order's seed, so every peer
//! ratifying the same instruction computes identical results.

use crate::unit::{Unit, Weapon};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest fuzz applied to a hit, in percent
const FUZZ_PERCENT: i64 = 5;

/// Seeded damage roller for one order
#[derive(Debug, Clone)]
pub struct DamageScript {
    rng: ChaCha8Rng,
}

impl DamageScript {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Unfuzzed damage `attacker` would deal to `defender`
    pub fn estimate(attacker: &Unit, defender: &Unit) -> Option<(Weapon, u32)> {
        let (weapon, base) = attacker.kind.base_damage(defender.kind, attacker.ammo > 0)?;
        let damage = (base * attacker.hp).div_ceil(100);
        Some((weapon, damage.min(defender.hp)))
    }

    /// Fuzzed damage `attacker` deals to `defender`, never more than the defender's hp
    pub fn roll(&mut self, attacker: &Unit, defender: &Unit) -> Option<(Weapon, u32)> {
        let (weapon, base) = attacker.kind.base_damage(defender.kind, attacker.ammo > 0)?;
        let damage = (base * attacker.hp).div_ceil(100) as i64;
        let fuzz = self.rng.gen_range(-FUZZ_PERCENT..=FUZZ_PERCENT);
        let fuzzed = (damage * (100 + fuzz) + 50) / 100;
        Some((weapon, (fuzzed.max(0) as u32).min(defender.hp)))
    }
}
