//! Battle state machine and damage resolution for pokelink.
//!
//! # Overview
//!
//! `pokelink-battle` sits between `pokelink-protocol` (wire format) and the
//! networked client:
//!
//! ```text
//! pokelink-protocol (wire format)
//!        │
//!        ▼
//! pokelink-battle (state machine + damage) ← THIS CRATE
//!        │
//!        ▼
//! pokelink-client (transport, session, CLI)
//! ```
//!
//! Nothing here does I/O. [`Battle`] consumes decoded [`Message`]s and
//! returns the messages it wants sent; the caller owns delivery.
//!
//! # Main Types
//!
//! - [`Battle`] - turn-synchronised state machine with catch-up recovery
//! - [`BattleContext`] - HP, turn owner and in-flight attack
//! - [`DamageResolver`] - what the state machine needs from its data source
//! - [`Dex`] - built-in or JSON-loaded species and move tables
//!
//! # Example Usage
//!
//! ```ignore
//! use pokelink_battle::{Battle, Dex, Role};
//!
//! let mut battle = Battle::new(Role::Host, "Charizard", Dex::builtin());
//!
//! for reply in battle.handle(&message) {
//!     outbox.push_back(reply);
//! }
//!
//! if battle.context().can_move() {
//!     outbox.extend(battle.submit_move("Ember")?);
//! }
//! ```

pub mod damage;
pub mod dex;
pub mod tracking;
pub mod types;

pub use damage::{DamageOutcome, DamageResolver, UNKNOWN_DEFENDER_HP};
pub use dex::{Dex, DexError};
pub use tracking::{
    Battle, BattleContext, BattleError, BattleState, HANDSHAKE_SEED, Role, Side,
};
pub use types::{MoveCategory, MoveData, PokemonData, TYPE_CHART, Type};

// Re-export commonly used protocol types
pub use pokelink_protocol::{CalculationReport, Message};
