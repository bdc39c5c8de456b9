use std::net::SocketAddr;
use std::path::Path;

use pokelink_battle::BattleContext;
use pokelink_protocol::ChatMessage;

/// Trait for reacting to battle session events.
///
/// All methods have default no-op implementations, so you only need to
/// implement the events you care about.
///
/// # Example
///
/// ```ignore
/// struct Printer;
///
/// impl Handler for Printer {
///     fn on_chat(&mut self, chat: &ChatMessage, _from: SocketAddr) {
///         println!("{}: {:?}", chat.sender_name, chat.content);
///     }
/// }
/// ```
pub trait Handler {
    /// Called after the battle has consumed a message from the peer.
    fn on_battle_update(&mut self, context: &BattleContext) {
        let _ = context;
    }

    /// Called for every chat message, from the peer or a spectator.
    fn on_chat(&mut self, chat: &ChatMessage, from: SocketAddr) {
        let _ = (chat, from);
    }

    /// Called once a received sticker has been written to disk.
    fn on_sticker_saved(&mut self, sender_name: &str, path: &Path) {
        let _ = (sender_name, path);
    }

    fn on_spectator_joined(&mut self, addr: SocketAddr) {
        let _ = addr;
    }

    /// Called once, when a combatant reaches 0 HP.
    fn on_game_over(&mut self, context: &BattleContext) {
        let _ = context;
    }

    /// Called once, when the transport gives up on the peer.
    fn on_disconnected(&mut self, context: &BattleContext) {
        let _ = context;
    }
}

/// A handler that ignores everything
impl Handler for () {}
