//! Turn synchronisation between two peers

mod battle;
mod updater;

pub use battle::{
    Battle, BattleContext, BattleError, BattleState, HANDSHAKE_SEED, Role, Side,
};
