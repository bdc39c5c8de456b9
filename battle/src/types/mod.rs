//! Domain types shared by the data provider and the damage resolver

mod pokemon;
mod pokemon_type;

pub use pokemon::{MoveCategory, MoveData, PokemonData};
pub use pokemon_type::{TYPE_CHART, Type};
