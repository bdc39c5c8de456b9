//! Damage resolution
//!
//! Resolution is pure: the same attacker, defender and move against the same
//! data always produce the same [`DamageOutcome`]. Both peers rely on this to
//! compute identical results independently.

use crate::dex::Dex;
use crate::types::{MoveCategory, PokemonData};

/// HP assumed for a defender the data provider does not know
pub const UNKNOWN_DEFENDER_HP: u32 = 100;

/// Result of one damage calculation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    pub damage_dealt: u32,
    /// Defender HP after the hit, counted from the defender's base HP
    pub defender_remaining_hp: u32,
    pub status_text: String,
}

impl DamageOutcome {
    /// Zero-damage outcome used for unknown identifiers
    pub fn miss(defender_hp: u32) -> Self {
        Self {
            damage_dealt: 0,
            defender_remaining_hp: defender_hp,
            status_text: "Missed (Invalid Data)".to_string(),
        }
    }
}

/// What the battle state machine needs from its data source
pub trait DamageResolver {
    /// Compute the outcome of `attacker` using `move_name` on `defender`.
    ///
    /// Never fails: unknown identifiers resolve to [`DamageOutcome::miss`].
    fn resolve(&self, attacker: &str, defender: &str, move_name: &str) -> DamageOutcome;

    /// Base data for a species
    fn lookup(&self, pokemon: &str) -> Option<&PokemonData>;
}

impl DamageResolver for Dex {
    fn resolve(&self, attacker: &str, defender: &str, move_name: &str) -> DamageOutcome {
        let defending = self.lookup(defender);
        let (Some(attacking), Some(defending), Some(used)) =
            (self.lookup(attacker), defending, self.get_move(move_name))
        else {
            return DamageOutcome::miss(defending.map_or(UNKNOWN_DEFENDER_HP, |d| d.hp));
        };

        if used.category == MoveCategory::Status || used.power == 0 {
            return DamageOutcome {
                damage_dealt: 0,
                defender_remaining_hp: defending.hp,
                status_text: format!("{} used {}. No damage.", attacking.name, used.name),
            };
        }

        let effectiveness = used.move_type.effectiveness_multi(&defending.types);
        if effectiveness == 0.0 {
            return DamageOutcome {
                damage_dealt: 0,
                defender_remaining_hp: defending.hp,
                status_text: format!("It doesn't affect {}...", defending.name),
            };
        }

        let (atk, def) = match used.category {
            MoveCategory::Physical => (attacking.attack, defending.defense),
            _ => (attacking.sp_attack, defending.sp_defense),
        };

        let raw = used.power as f32 * effectiveness * (atk as f32 / def.max(1) as f32);
        let damage_dealt = (raw as u32).max(1);

        let mut status_text = format!("Hit for {} dmg", damage_dealt);
        if effectiveness > 1.0 {
            status_text.push_str(". It's super effective!");
        } else if effectiveness < 1.0 {
            status_text.push_str(". It's not very effective...");
        }

        DamageOutcome {
            damage_dealt,
            defender_remaining_hp: defending.hp.saturating_sub(damage_dealt),
            status_text,
        }
    }

    fn lookup(&self, pokemon: &str) -> Option<&PokemonData> {
        Dex::lookup(self, pokemon)
    }
}
