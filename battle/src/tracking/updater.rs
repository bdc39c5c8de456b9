//! Transition logic: inbound messages and local commands into battle state

use pokelink_protocol::{CalculationReport, Message};

use super::battle::{Battle, BattleError, BattleState, HANDSHAKE_SEED, Role, Side};
use crate::damage::{DamageResolver, UNKNOWN_DEFENDER_HP};

impl<R: DamageResolver> Battle<R> {
    /// Apply one inbound message, returning the messages to send in reply.
    ///
    /// Terminal states ignore everything.
    pub fn handle(&mut self, msg: &Message) -> Vec<Message> {
        if self.context.state.is_terminal() {
            tracing::debug!(kind = msg.type_name(), "Battle over, ignoring message");
            return Vec::new();
        }

        if self.context.role == Role::Spectator {
            self.observe(msg);
            return Vec::new();
        }

        match msg {
            // === Handshake ===
            Message::HandshakeRequest => {
                if self.context.role != Role::Host {
                    return Vec::new();
                }
                self.context.shared_seed = Some(HANDSHAKE_SEED);
                tracing::info!(seed = HANDSHAKE_SEED, "Peer requested handshake");
                vec![
                    Message::HandshakeResponse {
                        seed: Some(HANDSHAKE_SEED),
                    },
                    self.setup_message(),
                ]
            }

            Message::HandshakeResponse { seed } => {
                if self.context.role != Role::Joiner {
                    return Vec::new();
                }
                self.context.shared_seed = *seed;
                tracing::info!(seed = ?seed, "Handshake accepted");
                vec![self.setup_message()]
            }

            Message::SpectatorRequest => {
                tracing::info!("Spectator joined");
                Vec::new()
            }

            // === Turn flow ===
            Message::BattleSetup { pokemon } => {
                self.record_opponent(pokemon);
                Vec::new()
            }

            Message::AttackAnnounce {
                attacker,
                move_name,
            } => self.handle_announce(attacker, move_name),

            Message::CalculationReport(report) => self.handle_report(report),

            // Finalizing here as well would flip the turn twice
            Message::CalculationConfirm => Vec::new(),

            Message::Chat(_) | Message::Ack { .. } | Message::Unknown(_) => Vec::new(),
        }
    }

    /// Commit to a move on our turn.
    ///
    /// Returns the announce followed by our own report. The caller must not
    /// release the report until the announce is acknowledged.
    pub fn submit_move(&mut self, move_name: &str) -> Result<Vec<Message>, BattleError> {
        let ctx = &self.context;
        if ctx.role == Role::Spectator {
            return Err(BattleError::Spectating);
        }
        if ctx.state.is_terminal() {
            return Err(BattleError::Finished(ctx.state));
        }
        if ctx.state != BattleState::WaitingForMove {
            return Err(BattleError::NotReady(ctx.state));
        }
        if !ctx.is_my_turn {
            return Err(BattleError::NotYourTurn);
        }

        let move_name = move_name.trim();
        if move_name.is_empty() {
            return Err(BattleError::EmptyMove);
        }
        let pokemon = self.resolver.lookup(&self.context.my_identity);
        if pokemon.is_some_and(|p| !p.knows(move_name)) {
            tracing::warn!(move_name, "Move is not in this pokemon's move list");
        }
        let move_name = pokemon
            .and_then(|p| p.moves.iter().find(|m| m.eq_ignore_ascii_case(move_name)))
            .cloned()
            .unwrap_or_else(|| move_name.to_string());

        self.context.current_attacker = Some(Side::Local);
        self.context.current_move = move_name.clone();
        self.context.state = BattleState::ProcessingTurn;

        tracing::info!(
            attacker = %self.context.my_identity,
            move_name = %move_name,
            "Announcing attack"
        );

        let announce = Message::AttackAnnounce {
            attacker: self.context.my_identity.clone(),
            move_name,
        };
        Ok(vec![announce, self.perform_calculation()])
    }

    fn setup_message(&self) -> Message {
        Message::BattleSetup {
            pokemon: self.context.my_identity.clone(),
        }
    }

    fn record_opponent(&mut self, pokemon: &str) {
        let pokemon = pokemon.trim();
        if pokemon.is_empty() {
            return;
        }

        let (name, hp) = match self.resolver.lookup(pokemon) {
            Some(data) => (data.name.clone(), data.hp),
            None => (pokemon.to_string(), self.context.opponent_hp),
        };
        tracing::info!(opponent = %name, hp, "Opponent is ready");

        self.context.opponent_identity = Some(name);
        self.context.opponent_hp = hp;
        if self.context.state == BattleState::Setup {
            self.context.state = BattleState::WaitingForMove;
        }
    }

    fn handle_announce(&mut self, attacker: &str, move_name: &str) -> Vec<Message> {
        if !attacker.is_empty() && self.is_me(attacker) {
            // Our own announce echoed back
            return Vec::new();
        }
        if self.context.state != BattleState::WaitingForMove {
            tracing::warn!(state = %self.context.state, "Unexpected attack announce");
        }

        tracing::info!(move_name, "Opponent attacks");
        self.context.current_attacker = Some(Side::Remote);
        self.context.current_move = move_name.trim().to_string();
        self.context.state = BattleState::ProcessingTurn;
        vec![self.perform_calculation()]
    }

    fn handle_report(&mut self, report: &CalculationReport) -> Vec<Message> {
        let mut out = Vec::new();

        match self.context.state {
            BattleState::WaitingForMove if self.is_opponent(&report.attacker) => {
                // The announce never reached us; rebuild the turn from the report
                tracing::warn!(
                    attacker = %report.attacker,
                    move_name = %report.move_name,
                    "Missed attack announce, catching up"
                );
                self.context.current_attacker = Some(Side::Remote);
                self.context.current_move = report.move_name.clone();
                self.context.state = BattleState::ProcessingTurn;
                out.push(self.perform_calculation());
            }
            BattleState::ProcessingTurn => {}
            state => {
                // No turn in flight to pin the attacker; take it from the report
                let attacker = if self.is_me(&report.attacker) {
                    Side::Local
                } else {
                    Side::Remote
                };
                tracing::warn!(%state, attacker = %report.attacker, "Calculation report outside a turn");
                self.context.current_attacker = Some(attacker);
                self.context.current_move = report.move_name.clone();
            }
        }

        out.push(Message::CalculationConfirm);

        let target = self.report_target(&report.attacker);
        if let Some(local) = &self.context.last_local_damage_result {
            if local.defender_remaining_hp != report.defender_hp_remaining {
                tracing::warn!(
                    local_damage = local.damage_dealt,
                    remote_damage = report.damage_dealt,
                    local_hp = local.defender_remaining_hp,
                    remote_hp = report.defender_hp_remaining,
                    "Calculation mismatch, peer's report wins"
                );
            }
        }
        match target {
            Side::Local => self.context.my_hp = report.defender_hp_remaining,
            Side::Remote => self.context.opponent_hp = report.defender_hp_remaining,
        }
        self.context.last_remote_report = Some(report.clone());

        self.finalize_turn();
        out
    }

    /// The side whose HP a report describes
    fn report_target(&self, attacker: &str) -> Side {
        match self.context.current_attacker {
            Some(side) => side.other(),
            None if self.is_me(attacker) => Side::Remote,
            None => Side::Local,
        }
    }

    /// Run the local damage computation for the current attack.
    ///
    /// The result is recorded for comparison only; HP changes come from
    /// the peer's report.
    fn perform_calculation(&mut self) -> Message {
        let attacker_side = self.context.current_attacker.unwrap_or(Side::Remote);
        let defender_side = attacker_side.other();
        let attacker = self.context.name_of(attacker_side).to_string();
        let defender = self.context.name_of(defender_side).to_string();
        let defender_hp = self.context.hp_of(defender_side);

        let mut outcome = self
            .resolver
            .resolve(&attacker, &defender, &self.context.current_move);
        outcome.defender_remaining_hp = defender_hp.saturating_sub(outcome.damage_dealt);

        tracing::debug!(
            %attacker,
            %defender,
            move_name = %self.context.current_move,
            damage = outcome.damage_dealt,
            old_hp = defender_hp,
            new_hp = outcome.defender_remaining_hp,
            "Local calculation"
        );

        let report = CalculationReport {
            attacker,
            move_name: self.context.current_move.clone(),
            damage_dealt: outcome.damage_dealt,
            defender_hp_remaining: outcome.defender_remaining_hp,
            status_message: outcome.status_text.clone(),
        };
        self.context.last_local_damage_result = Some(outcome);
        Message::CalculationReport(report)
    }

    fn finalize_turn(&mut self) {
        self.context.turn += 1;

        if self.context.my_hp == 0 || self.context.opponent_hp == 0 {
            self.context.state = BattleState::GameOver;
            tracing::info!(
                my_hp = self.context.my_hp,
                opponent_hp = self.context.opponent_hp,
                "Game over"
            );
            return;
        }

        if self.context.role != Role::Spectator {
            self.context.is_my_turn = !self.context.is_my_turn;
        }
        self.context.state = BattleState::WaitingForMove;
        tracing::debug!(
            turn = self.context.turn,
            my_turn = self.context.is_my_turn,
            "Turn finished"
        );
    }

    /// Follow the host's mirrored traffic.
    ///
    /// `Local` tracks the host's pokemon, `Remote` the joiner's.
    fn observe(&mut self, msg: &Message) {
        match msg {
            Message::BattleSetup { pokemon } => {
                let pokemon = pokemon.trim();
                if pokemon.is_empty() {
                    return;
                }
                self.anchor_host(pokemon);
                if self.context.state == BattleState::Setup {
                    self.context.state = BattleState::WaitingForMove;
                }
            }

            Message::HandshakeResponse { seed } => {
                self.context.shared_seed = *seed;
            }

            Message::AttackAnnounce {
                attacker,
                move_name,
            } => {
                // Only the host's own announces are mirrored to us
                if !attacker.is_empty() {
                    self.anchor_host(attacker);
                }
                self.context.current_attacker = Some(Side::Local);
                self.context.current_move = move_name.clone();
                self.context.state = BattleState::ProcessingTurn;
                tracing::info!(%attacker, %move_name, "Host attacks");
            }

            Message::CalculationReport(report) => {
                // The host announces its own attacks; a report with no
                // announce before it is the host defending
                if self.context.current_attacker == Some(Side::Local) {
                    self.context.opponent_hp = report.defender_hp_remaining;
                } else {
                    if self.context.opponent_identity.is_none() && !report.attacker.is_empty() {
                        self.context.opponent_identity = Some(report.attacker.clone());
                    }
                    self.context.my_hp = report.defender_hp_remaining;
                }
                tracing::info!(
                    attacker = %report.attacker,
                    move_name = %report.move_name,
                    damage = report.damage_dealt,
                    remaining = report.defender_hp_remaining,
                    "Turn resolved"
                );

                self.context.current_attacker = None;
                self.context.last_remote_report = Some(report.clone());
                self.finalize_turn();
            }

            _ => {}
        }
    }

    fn anchor_host(&mut self, pokemon: &str) {
        if !self.context.my_identity.is_empty() {
            return;
        }
        let (name, hp) = self
            .resolver
            .lookup(pokemon)
            .map_or((pokemon.to_string(), UNKNOWN_DEFENDER_HP), |p| {
                (p.name.clone(), p.hp)
            });
        self.context.my_identity = name;
        self.context.my_hp = hp;
    }
}
