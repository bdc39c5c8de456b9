//! Static pokemon and move data

use serde::{Deserialize, Serialize};

use super::pokemon_type::Type;

/// Base data for one species, identical on both peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonData {
    pub name: String,

    /// One or two types
    pub types: Vec<Type>,

    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,

    /// Moves this pokemon may choose from
    #[serde(default)]
    pub moves: Vec<String>,
}

impl PokemonData {
    /// Whether `move_name` is in this pokemon's move list (case-insensitive)
    pub fn knows(&self, move_name: &str) -> bool {
        self.moves
            .iter()
            .any(|m| m.eq_ignore_ascii_case(move_name.trim()))
    }
}

/// How a move's damage is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveCategory {
    /// Uses attack against defense
    Physical,
    /// Uses special attack against special defense
    Special,
    /// Deals no damage
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    pub name: String,
    pub move_type: Type,
    pub category: MoveCategory,
    #[serde(default)]
    pub power: u32,
}
