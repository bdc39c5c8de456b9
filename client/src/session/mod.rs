//! A battle session: transport, state machine and outbox driven by one loop


use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use pokelink_battle::{Battle, BattleError, BattleState, DamageResolver, Role};
use pokelink_protocol::{ChatContent, ChatMessage, Message};
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::handler::Handler;
use crate::socket::DatagramSocket;
use crate::transport::{Delivery, Transport, TransportEvent};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error("Failed to read sticker {}: {source}", path.display())]
    StickerRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Usage: /sticker <path>")]
    MissingStickerPath,
}

/// What a line of local input turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(String),
    Chat(String),
    Sticker(PathBuf),
    Nothing,
}

/// Owns one match from handshake to the end.
///
/// Outbound messages wait in an outbox and are handed to the transport one
/// at a time: nothing new goes out while a previous message is still
/// unacknowledged. This keeps a move's announce ahead of its report.
pub struct Session<R, S = UdpSocket> {
    transport: Transport<S>,
    battle: Battle<R>,
    outbox: VecDeque<Message>,
    sticker_dir: Option<PathBuf>,
}

impl<R: DamageResolver, S: DatagramSocket> Session<R, S> {
    /// Queue the battle's opening messages
    pub fn new(transport: Transport<S>, battle: Battle<R>) -> Self {
        let outbox = battle.start().into();
        Self {
            transport,
            battle,
            outbox,
            sticker_dir: None,
        }
    }

    /// Write received stickers into `dir`
    pub fn with_sticker_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sticker_dir = Some(dir.into());
        self
    }

    pub fn battle(&self) -> &Battle<R> {
        &self.battle
    }

    pub fn transport(&self) -> &Transport<S> {
        &self.transport
    }

    pub fn role(&self) -> Role {
        self.battle.context().role
    }

    /// Messages waiting behind the one in flight
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }

    /// Nothing queued and nothing awaiting acknowledgement
    pub fn is_settled(&self) -> bool {
        self.outbox.is_empty() && !self.transport.has_pending()
    }

    /// The battle is over and our last messages are delivered (or given up on)
    pub fn is_finished(&self) -> bool {
        match self.battle.state() {
            BattleState::Disconnected => true,
            BattleState::GameOver => self.is_settled(),
            _ => false,
        }
    }

    pub fn tick<H: Handler>(&mut self, handler: &mut H) {
        self.tick_at(Instant::now(), handler);
    }

    /// Drain the transport, dispatch everything it surfaced, then release
    /// the next queued message if the line is clear
    pub fn tick_at<H: Handler>(&mut self, now: Instant, handler: &mut H) {
        while let Some(event) = self.transport.poll_at(now) {
            self.dispatch(event, handler);
        }
        self.flush(now);
    }

    /// Interpret one line of local input.
    ///
    /// On our turn a line is a move; otherwise it is chat. `/sticker <path>`
    /// always sends a sticker.
    pub fn handle_input(&mut self, line: &str) -> Result<Command, SessionError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Nothing);
        }

        if let Some(rest) = line.strip_prefix("/sticker") {
            let path = rest.trim();
            if path.is_empty() {
                return Err(SessionError::MissingStickerPath);
            }
            let path = PathBuf::from(path);
            self.send_sticker(&path)?;
            return Ok(Command::Sticker(path));
        }

        if self.battle.context().can_move() {
            self.submit_move(line)?;
            return Ok(Command::Move(self.battle.context().current_move.clone()));
        }

        self.send_chat(line);
        Ok(Command::Chat(line.to_string()))
    }

    pub fn submit_move(&mut self, move_name: &str) -> Result<(), BattleError> {
        let out = self.battle.submit_move(move_name)?;
        self.outbox.extend(out);
        Ok(())
    }

    pub fn send_chat(&mut self, text: &str) {
        let chat = ChatMessage::text(self.sender_name(), text);
        self.outbox.push_back(Message::Chat(chat));
    }

    pub fn send_sticker(&mut self, path: &Path) -> Result<(), SessionError> {
        let bytes = std::fs::read(path).map_err(|source| SessionError::StickerRead {
            path: path.to_path_buf(),
            source,
        })?;
        let chat = ChatMessage::sticker(self.sender_name(), &bytes);
        self.outbox.push_back(Message::Chat(chat));
        Ok(())
    }

    fn sender_name(&self) -> &'static str {
        self.role().display_name()
    }

    fn flush(&mut self, now: Instant) {
        if self.battle.state() == BattleState::Disconnected {
            self.outbox.clear();
            return;
        }
        // Nowhere to send yet; a host waits for its joiner
        if self.transport.has_pending() || self.transport.peer().is_none() {
            return;
        }
        if let Some(message) = self.outbox.pop_front() {
            self.transport.send_at(&message, now);
        }
    }

    fn dispatch<H: Handler>(&mut self, event: TransportEvent, handler: &mut H) {
        match event {
            TransportEvent::ConnectionLost { sequence_number } => {
                if self.battle.is_over() {
                    tracing::debug!(sequence_number, "Peer gone after the battle ended");
                    return;
                }
                self.battle.connection_lost();
                self.outbox.clear();
                handler.on_disconnected(self.battle.context());
            }
            TransportEvent::Message(delivery) => self.dispatch_delivery(delivery, handler),
        }
    }

    fn dispatch_delivery<H: Handler>(&mut self, delivery: Delivery, handler: &mut H) {
        let Delivery {
            message,
            sequence_number,
            from,
        } = delivery;
        let from_peer = self.transport.peer() == Some(from);

        match &message {
            Message::Chat(chat) => {
                self.receive_chat(chat, sequence_number, from, handler);
                return;
            }
            Message::SpectatorRequest if !from_peer => {
                handler.on_spectator_joined(from);
                return;
            }
            _ if !from_peer => {
                tracing::debug!(%from, kind = message.type_name(), "Ignoring game message from spectator");
                return;
            }
            _ => {}
        }

        let was_over = self.battle.is_over();
        let replies = self.battle.handle(&message);
        self.outbox.extend(replies);

        handler.on_battle_update(self.battle.context());
        if !was_over && self.battle.state() == BattleState::GameOver {
            handler.on_game_over(self.battle.context());
        }
    }

    fn receive_chat<H: Handler>(
        &mut self,
        chat: &ChatMessage,
        sequence_number: u32,
        from: SocketAddr,
        handler: &mut H,
    ) {
        handler.on_chat(chat, from);

        if !matches!(chat.content, ChatContent::Sticker(_)) {
            return;
        }
        let Some(dir) = &self.sticker_dir else {
            return;
        };
        match save_sticker(dir, chat, sequence_number) {
            Ok(path) => {
                tracing::info!(sender = %chat.sender_name, path = %path.display(), "Sticker saved");
                handler.on_sticker_saved(&chat.sender_name, &path);
            }
            Err(e) => {
                tracing::warn!(sender = %chat.sender_name, error = %e, "Could not save sticker")
            }
        }
    }
}

fn save_sticker(dir: &Path, chat: &ChatMessage, sequence_number: u32) -> anyhow::Result<PathBuf> {
    let bytes = chat.sticker_bytes()?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("received_sticker_{sequence_number}.png"));
    std::fs::write(&path, bytes)?;
    Ok(path)
}
