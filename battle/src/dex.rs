//! Pokemon and move data provider
//!
//! Both peers must load identical data or their independent damage
//! calculations will disagree. The built-in table is the default; a JSON
//! file with the same shape can replace it:
//!
//! ```json
//! {
//!   "pokemon": [{ "name": "Charizard", "types": ["Fire", "Flying"], "hp": 100,
//!                 "attack": 84, "defense": 78, "sp_attack": 109,
//!                 "sp_defense": 85, "speed": 100, "moves": ["Ember"] }],
//!   "moves": [{ "name": "Ember", "move_type": "Fire",
//!               "category": "Special", "power": 40 }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MoveCategory, MoveData, PokemonData, Type};

#[derive(Error, Debug)]
pub enum DexError {
    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data file defines no pokemon")]
    Empty,
}

/// Lookup tables for species and moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dex {
    pokemon: Vec<PokemonData>,
    #[serde(default)]
    moves: Vec<MoveData>,
}

impl Dex {
    /// Build a dex from explicit tables
    pub fn new(pokemon: Vec<PokemonData>, moves: Vec<MoveData>) -> Self {
        Self { pokemon, moves }
    }

    /// Parse a dex from JSON text
    pub fn from_json(text: &str) -> Result<Self, DexError> {
        let dex: Dex = serde_json::from_str(text)?;
        if dex.pokemon.is_empty() {
            return Err(DexError::Empty);
        }
        Ok(dex)
    }

    /// Load a dex from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DexError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Look up a species by name (case-insensitive)
    pub fn lookup(&self, name: &str) -> Option<&PokemonData> {
        let name = name.trim();
        self.pokemon
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Look up a move by name (case-insensitive)
    pub fn get_move(&self, name: &str) -> Option<&MoveData> {
        let name = name.trim();
        self.moves.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// All species in load order
    pub fn pokemon(&self) -> &[PokemonData] {
        &self.pokemon
    }

    /// The embedded table used when no data file is given
    pub fn builtin() -> Self {
        use MoveCategory::{Physical, Special, Status};

        let pokemon = vec![
            species(
                "Charizard",
                &[Type::Fire, Type::Flying],
                [100, 84, 78, 109, 85, 100],
                &["Ember", "Flamethrower", "Wing Attack", "Tackle"],
            ),
            species(
                "Blastoise",
                &[Type::Water],
                [100, 83, 100, 85, 105, 78],
                &["Water Gun", "Surf", "Bite", "Tackle"],
            ),
            species(
                "Venusaur",
                &[Type::Grass, Type::Poison],
                [100, 82, 83, 100, 100, 80],
                &["Vine Whip", "Razor Leaf", "Sludge Bomb", "Tackle"],
            ),
            species(
                "Pikachu",
                &[Type::Electric],
                [35, 55, 40, 50, 50, 90],
                &["Thunder Shock", "Thunderbolt", "Quick Attack", "Growl"],
            ),
            species(
                "Gengar",
                &[Type::Ghost, Type::Poison],
                [60, 65, 60, 130, 75, 110],
                &["Shadow Ball", "Sludge Bomb", "Lick"],
            ),
            species(
                "Snorlax",
                &[Type::Normal],
                [160, 110, 65, 65, 110, 30],
                &["Body Slam", "Tackle", "Bite", "Growl"],
            ),
        ];

        let moves = vec![
            move_data("Tackle", Type::Normal, Physical, 40),
            move_data("Quick Attack", Type::Normal, Physical, 40),
            move_data("Body Slam", Type::Normal, Physical, 85),
            move_data("Growl", Type::Normal, Status, 0),
            move_data("Ember", Type::Fire, Special, 40),
            move_data("Flamethrower", Type::Fire, Special, 90),
            move_data("Water Gun", Type::Water, Special, 40),
            move_data("Surf", Type::Water, Special, 90),
            move_data("Vine Whip", Type::Grass, Physical, 45),
            move_data("Razor Leaf", Type::Grass, Physical, 55),
            move_data("Sludge Bomb", Type::Poison, Special, 90),
            move_data("Wing Attack", Type::Flying, Physical, 60),
            move_data("Bite", Type::Dark, Physical, 60),
            move_data("Thunder Shock", Type::Electric, Special, 40),
            move_data("Thunderbolt", Type::Electric, Special, 90),
            move_data("Shadow Ball", Type::Ghost, Special, 80),
            move_data("Lick", Type::Ghost, Physical, 30),
        ];

        Self { pokemon, moves }
    }
}

impl Default for Dex {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `stats` is hp, attack, defense, sp. attack, sp. defense, speed
fn species(name: &str, types: &[Type], stats: [u32; 6], moves: &[&str]) -> PokemonData {
    let [hp, attack, defense, sp_attack, sp_defense, speed] = stats;
    PokemonData {
        name: name.to_string(),
        types: types.to_vec(),
        hp,
        attack,
        defense,
        sp_attack,
        sp_defense,
        speed,
        moves: moves.iter().map(|m| m.to_string()).collect(),
    }
}

fn move_data(name: &str, move_type: Type, category: MoveCategory, power: u32) -> MoveData {
    MoveData {
        name: name.to_string(),
        move_type,
        category,
        power,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dex = Dex::builtin();

        assert_eq!(dex.lookup("charizard").unwrap().name, "Charizard");
        assert_eq!(dex.lookup(" BLASTOISE ").unwrap().hp, 100);
        assert!(dex.lookup("Missingno").is_none());
    }

    #[test]
    fn test_builtin_moves_are_all_defined() {
        let dex = Dex::builtin();

        for pokemon in dex.pokemon() {
            for name in &pokemon.moves {
                assert!(
                    dex.get_move(name).is_some(),
                    "{} knows undefined move {}",
                    pokemon.name,
                    name
                );
            }
        }
    }

    #[test]
    fn test_from_json() {
        let dex = Dex::from_json(
            r#"{
                "pokemon": [{
                    "name": "Eevee", "types": ["Normal"], "hp": 55,
                    "attack": 55, "defense": 50, "sp_attack": 45,
                    "sp_defense": 65, "speed": 55, "moves": ["Tackle"]
                }],
                "moves": [{ "name": "Tackle", "move_type": "Normal", "category": "Physical", "power": 40 }]
            }"#,
        )
        .unwrap();

        assert_eq!(dex.lookup("eevee").unwrap().types, vec![Type::Normal]);
        assert_eq!(dex.get_move("tackle").unwrap().power, 40);
    }

    #[test]
    fn test_from_json_rejects_empty_and_garbage() {
        assert!(matches!(
            Dex::from_json(r#"{ "pokemon": [] }"#),
            Err(DexError::Empty)
        ));
        assert!(matches!(Dex::from_json("not json"), Err(DexError::Json(_))));
    }

    #[test]
    fn test_builtin_survives_json() {
        let dex = Dex::builtin();
        let text = serde_json::to_string(&dex).unwrap();

        assert_eq!(Dex::from_json(&text).unwrap(), dex);
    }
}
