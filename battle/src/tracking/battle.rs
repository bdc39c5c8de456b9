//! Battle - the turn-synchronised state machine and its context

use std::fmt;

use thiserror::Error;

use crate::damage::{DamageOutcome, DamageResolver, UNKNOWN_DEFENDER_HP};
use pokelink_protocol::{CalculationReport, Message};

/// Seed the host hands out in `HANDSHAKE_RESPONSE`
pub const HANDSHAKE_SEED: u32 = 12345;

/// Where the battle is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BattleState {
    /// Waiting for the opponent's `BATTLE_SETUP`
    Setup,
    /// Waiting for whoever owns the turn to pick a move
    WaitingForMove,
    /// An attack is in flight; waiting for the peer's report
    ProcessingTurn,
    /// A combatant reached 0 HP
    GameOver,
    /// The transport gave up on the peer
    Disconnected,
}

impl BattleState {
    /// No further transitions happen from here
    pub fn is_terminal(&self) -> bool {
        matches!(self, BattleState::GameOver | BattleState::Disconnected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BattleState::Setup => "SETUP",
            BattleState::WaitingForMove => "WAITING_FOR_MOVE",
            BattleState::ProcessingTurn => "PROCESSING_TURN",
            BattleState::GameOver => "GAME_OVER",
            BattleState::Disconnected => "DISCONNECTED",
        }
    }
}

impl fmt::Display for BattleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Listens, moves first
    Host,
    /// Connects to a host
    Joiner,
    /// Watches a host's battle, never attacks
    Spectator,
}

impl Role {
    /// Name used as the chat sender
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Host => "Host",
            Role::Joiner => "Joiner",
            Role::Spectator => "Spectator",
        }
    }
}

/// One of the two combatants, from this process's point of view.
///
/// For a spectator, `Local` is the host's pokemon and `Remote` the joiner's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Local => Side::Remote,
            Side::Remote => Side::Local,
        }
    }
}

/// Reasons a local move command is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BattleError {
    #[error("It is not your turn")]
    NotYourTurn,

    #[error("Cannot move while the battle is in {0}")]
    NotReady(BattleState),

    #[error("The battle is over ({0})")]
    Finished(BattleState),

    #[error("Spectators cannot attack")]
    Spectating,

    #[error("No move given")]
    EmptyMove,
}

/// Everything the state machine knows about the match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleContext {
    pub state: BattleState,
    pub role: Role,
    pub is_my_turn: bool,

    /// Our pokemon (the host's, for a spectator)
    pub my_identity: String,
    /// Known once `BATTLE_SETUP` arrives
    pub opponent_identity: Option<String>,

    pub my_hp: u32,
    pub opponent_hp: u32,

    /// Who is attacking in the current (or last) turn
    pub current_attacker: Option<Side>,
    pub current_move: String,

    /// Our own calculation for the current turn; advisory only
    pub last_local_damage_result: Option<DamageOutcome>,
    /// The peer's last authoritative report
    pub last_remote_report: Option<CalculationReport>,

    /// Seed exchanged during the handshake
    pub shared_seed: Option<u32>,

    /// Completed turns
    pub turn: u32,
}

impl BattleContext {
    /// Display name for a side, `"???"` while the opponent is unknown
    pub fn name_of(&self, side: Side) -> &str {
        match side {
            Side::Local if !self.my_identity.is_empty() => &self.my_identity,
            Side::Remote => self.opponent_identity.as_deref().unwrap_or("???"),
            Side::Local => "???",
        }
    }

    pub fn hp_of(&self, side: Side) -> u32 {
        match side {
            Side::Local => self.my_hp,
            Side::Remote => self.opponent_hp,
        }
    }

    /// Whether a local move would be accepted right now
    pub fn can_move(&self) -> bool {
        self.role != Role::Spectator
            && self.is_my_turn
            && self.state == BattleState::WaitingForMove
    }

    /// The surviving side once the game is over
    pub fn winner(&self) -> Option<Side> {
        if self.state != BattleState::GameOver {
            return None;
        }
        if self.my_hp == 0 {
            Some(Side::Remote)
        } else {
            Some(Side::Local)
        }
    }
}

/// The battle state machine.
///
/// A `Battle` never touches the network. Each operation returns the
/// messages it wants delivered, in order; the caller hands them to the
/// transport one at a time.
#[derive(Debug)]
pub struct Battle<R> {
    pub(crate) context: BattleContext,
    pub(crate) resolver: R,
}

impl<R: DamageResolver> Battle<R> {
    /// Start a battle fielding `pokemon`.
    ///
    /// HP comes from the resolver's base data; the opponent sits at a
    /// placeholder until its identity is known. Only the host moves first.
    pub fn new(role: Role, pokemon: &str, resolver: R) -> Self {
        let my_identity = match role {
            Role::Spectator => String::new(),
            _ => resolver
                .lookup(pokemon)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| pokemon.trim().to_string()),
        };
        let my_hp = resolver
            .lookup(&my_identity)
            .map_or(UNKNOWN_DEFENDER_HP, |p| p.hp);

        tracing::info!(
            role = role.display_name(),
            pokemon = %my_identity,
            hp = my_hp,
            "Battle initialised"
        );

        Self {
            context: BattleContext {
                state: BattleState::Setup,
                role,
                is_my_turn: role == Role::Host,
                my_identity,
                opponent_identity: None,
                my_hp,
                opponent_hp: UNKNOWN_DEFENDER_HP,
                current_attacker: None,
                current_move: String::new(),
                last_local_damage_result: None,
                last_remote_report: None,
                shared_seed: None,
                turn: 0,
            },
            resolver,
        }
    }

    /// Messages this role sends before anything arrives
    pub fn start(&self) -> Vec<Message> {
        match self.context.role {
            Role::Host => Vec::new(),
            Role::Joiner => vec![Message::HandshakeRequest],
            Role::Spectator => vec![Message::SpectatorRequest],
        }
    }

    pub fn context(&self) -> &BattleContext {
        &self.context
    }

    pub fn state(&self) -> BattleState {
        self.context.state
    }

    pub fn is_over(&self) -> bool {
        self.context.state.is_terminal()
    }

    /// Moves our pokemon knows, for prompting
    pub fn available_moves(&self) -> Vec<String> {
        self.resolver
            .lookup(&self.context.my_identity)
            .map(|p| p.moves.clone())
            .unwrap_or_default()
    }

    /// The transport exhausted its retries
    pub fn connection_lost(&mut self) {
        if self.context.state.is_terminal() {
            return;
        }
        tracing::warn!(state = %self.context.state, "Connection lost, ending battle");
        self.context.state = BattleState::Disconnected;
    }

    /// Whether `name` refers to our own pokemon.
    ///
    /// When both sides field the same species the name is ambiguous, so
    /// turn ownership decides instead.
    pub(crate) fn is_me(&self, name: &str) -> bool {
        if self.is_mirror_match() {
            return self.context.is_my_turn;
        }
        !name.is_empty() && name.eq_ignore_ascii_case(&self.context.my_identity)
    }

    /// Whether `name` refers to the known opponent
    pub(crate) fn is_opponent(&self, name: &str) -> bool {
        if self.is_mirror_match() {
            return !self.context.is_my_turn;
        }
        self.context
            .opponent_identity
            .as_deref()
            .is_some_and(|opp| !name.is_empty() && name.eq_ignore_ascii_case(opp))
    }

    fn is_mirror_match(&self) -> bool {
        self.context
            .opponent_identity
            .as_deref()
            .is_some_and(|opp| opp.eq_ignore_ascii_case(&self.context.my_identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::Dex;

    #[test]
    fn test_new_host_moves_first() {
        let battle = Battle::new(Role::Host, "charizard", Dex::builtin());
        let ctx = battle.context();

        assert_eq!(ctx.state, BattleState::Setup);
        assert!(ctx.is_my_turn);
        assert_eq!(ctx.my_identity, "Charizard");
        assert_eq!(ctx.my_hp, 100);
        assert_eq!(ctx.opponent_hp, UNKNOWN_DEFENDER_HP);
        assert!(ctx.opponent_identity.is_none());
    }

    #[test]
    fn test_new_joiner_waits() {
        let battle = Battle::new(Role::Joiner, "Snorlax", Dex::builtin());

        assert!(!battle.context().is_my_turn);
        assert_eq!(battle.context().my_hp, 160);
    }

    #[test]
    fn test_unknown_pokemon_gets_placeholder_hp() {
        let battle = Battle::new(Role::Host, "Missingno", Dex::builtin());

        assert_eq!(battle.context().my_identity, "Missingno");
        assert_eq!(battle.context().my_hp, UNKNOWN_DEFENDER_HP);
    }

    #[test]
    fn test_start_messages_per_role() {
        let dex = Dex::builtin;

        assert!(Battle::new(Role::Host, "Charizard", dex()).start().is_empty());
        assert_eq!(
            Battle::new(Role::Joiner, "Blastoise", dex()).start(),
            vec![Message::HandshakeRequest]
        );
        assert_eq!(
            Battle::new(Role::Spectator, "", dex()).start(),
            vec![Message::SpectatorRequest]
        );
    }

    #[test]
    fn test_connection_lost_is_terminal() {
        let mut battle = Battle::new(Role::Host, "Charizard", Dex::builtin());
        battle.connection_lost();

        assert_eq!(battle.state(), BattleState::Disconnected);
        assert!(battle.is_over());
        assert_eq!(battle.context().winner(), None);
    }

    #[test]
    fn test_available_moves() {
        let battle = Battle::new(Role::Host, "Pikachu", Dex::builtin());

        assert!(battle.available_moves().contains(&"Thunderbolt".to_string()));
    }

    #[test]
    fn test_name_of_unknown_opponent() {
        let battle = Battle::new(Role::Host, "Charizard", Dex::builtin());

        assert_eq!(battle.context().name_of(Side::Remote), "???");
        assert_eq!(battle.context().name_of(Side::Local), "Charizard");
    }
}
