//! Stop-and-wait reliable delivery over datagrams
//!
//! One sequenced message may be unacknowledged at a time. Every sequenced
//! datagram received is acknowledged to its source before anything else
//! happens to it, duplicates included, and a per-source cursor drops
//! repeats before they reach the application.
//!
//! A poll does not stop at one read. ACKs and duplicates surface nothing,
//! so the socket is read until a datagram yields an event or would block.
//! Each poll therefore returns at most one event, and the caller polls
//! again until it gets `None`.

mod tests;

use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use pokelink_protocol::{Frame, Message, MessageType};
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::config::TransportConfig;
use crate::socket::DatagramSocket;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Socket error: {0}")]
    Io(#[from] io::Error),
}

/// The single message awaiting acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOutbound {
    pub sequence_number: u32,
    /// Encoded datagram, resent unchanged
    pub payload: Vec<u8>,
    pub retry_count: u32,
    pub last_sent_at: Instant,
}

/// Highest sequence number accepted from one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundCursor {
    highest_seen_sequence: u32,
}

impl InboundCursor {
    pub fn highest_seen(&self) -> u32 {
        self.highest_seen_sequence
    }

    /// Record `sequence_number`, returning `false` for a duplicate.
    ///
    /// Zero doubles as "nothing seen yet", so whatever arrives while the
    /// cursor is zero is accepted.
    pub fn accept(&mut self, sequence_number: u32) -> bool {
        if self.highest_seen_sequence != 0 && sequence_number <= self.highest_seen_sequence {
            return false;
        }
        self.highest_seen_sequence = sequence_number;
        true
    }
}

/// A decoded message handed to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message: Message,
    pub sequence_number: u32,
    pub from: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(Delivery),
    /// Retries ran out for this sequence number
    ConnectionLost { sequence_number: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Spectator {
    addr: SocketAddr,
    inbound: InboundCursor,
}

/// Who sent a datagram
#[derive(Debug, Clone, Copy)]
enum Source {
    Peer,
    Spectator(usize),
}

/// Reliable transport over one datagram socket.
///
/// Must be polled on a fixed cadence: [`Transport::poll`] drives both
/// retransmission and receipt.
#[derive(Debug)]
pub struct Transport<S = UdpSocket> {
    socket: S,
    config: TransportConfig,
    peer: Option<SocketAddr>,
    spectators: Vec<Spectator>,
    next_sequence: u32,
    pending: Option<PendingOutbound>,
    inbound: InboundCursor,
    buf: Vec<u8>,
}

impl Transport<UdpSocket> {
    /// Bind a UDP socket. The only fatal error in the client.
    pub async fn bind(addr: SocketAddr, config: TransportConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        // Prime write readiness so the first send does not report WouldBlock
        socket.writable().await?;

        let transport = Self::with_socket(socket, config);
        tracing::info!(local = %transport.local_addr()?, "Listening");
        Ok(transport)
    }
}

impl<S: DatagramSocket> Transport<S> {
    pub fn with_socket(socket: S, config: TransportConfig) -> Self {
        let buf = vec![0; config.max_datagram];
        Self {
            socket,
            config,
            peer: None,
            spectators: Vec::new(),
            next_sequence: 1,
            pending: None,
            inbound: InboundCursor::default(),
            buf,
        }
    }

    /// Pin the remote endpoint
    pub fn configure_peer(&mut self, addr: SocketAddr) {
        if self.peer != Some(addr) {
            tracing::info!(peer = %addr, "Peer configured");
        }
        self.peer = Some(addr);
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    /// Sequence number the next send will use
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingOutbound> {
        self.pending.as_ref()
    }

    pub fn highest_seen_sequence(&self) -> u32 {
        self.inbound.highest_seen()
    }

    pub fn spectators(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.spectators.iter().map(|s| s.addr)
    }

    /// Send `message` with the next sequence number, returning that number.
    ///
    /// Tracking of any message still unacknowledged is abandoned.
    pub fn send(&mut self, message: &Message) -> u32 {
        self.send_at(message, Instant::now())
    }

    pub fn send_at(&mut self, message: &Message, now: Instant) -> u32 {
        let sequence_number = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1).max(1);

        let payload = message.to_frame().with_sequence(sequence_number).encode();

        if let Some(abandoned) = &self.pending {
            tracing::debug!(
                abandoned = abandoned.sequence_number,
                "Replacing unacknowledged message"
            );
        }

        self.transmit(&payload);
        tracing::debug!(
            sequence_number,
            kind = message.type_name(),
            bytes = payload.len(),
            "Sent"
        );

        self.pending = Some(PendingOutbound {
            sequence_number,
            payload,
            retry_count: 0,
            last_sent_at: now,
        });
        sequence_number
    }

    pub fn poll(&mut self) -> Option<TransportEvent> {
        self.poll_at(Instant::now())
    }

    /// One tick: the retry check, then the receive check.
    ///
    /// Datagrams that produce nothing for the application (ACKs, duplicates)
    /// are consumed in the same call until one does or the socket is empty.
    pub fn poll_at(&mut self, now: Instant) -> Option<TransportEvent> {
        if let Some(lost) = self.check_retry(now) {
            return Some(lost);
        }

        loop {
            let (len, from) = match self.socket.try_recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) => {
                    tracing::warn!(error = %e, "Receive failed");
                    return None;
                }
            };

            let frame = Frame::decode(&self.buf[..len]);
            if let Some(event) = self.process(frame, from) {
                return Some(event);
            }
        }
    }

    fn check_retry(&mut self, now: Instant) -> Option<TransportEvent> {
        let pending = self.pending.as_mut()?;
        if now.saturating_duration_since(pending.last_sent_at) <= self.config.retry_delay {
            return None;
        }

        let sequence_number = pending.sequence_number;
        if pending.retry_count >= self.config.max_retries {
            self.pending = None;
            tracing::warn!(
                sequence_number,
                retries = self.config.max_retries,
                "Connection lost, no acknowledgement"
            );
            return Some(TransportEvent::ConnectionLost { sequence_number });
        }

        pending.retry_count += 1;
        pending.last_sent_at = now;
        tracing::warn!(
            sequence_number,
            attempt = pending.retry_count,
            max = self.config.max_retries,
            "Timeout, retransmitting"
        );
        let payload = pending.payload.clone();
        self.transmit(&payload);
        None
    }

    fn process(&mut self, frame: Frame, from: SocketAddr) -> Option<TransportEvent> {
        let source = self.classify(&frame, from)?;

        if let Some(ack_number) = frame.ack_number() {
            match source {
                Source::Peer => self.acknowledge(ack_number),
                Source::Spectator(_) => {
                    tracing::trace!(%from, ack_number, "Ignoring spectator ACK")
                }
            }
            return None;
        }

        let sequence_number = frame.sequence_number()?;
        self.send_ack(sequence_number, from);

        let cursor = match source {
            Source::Peer => &mut self.inbound,
            Source::Spectator(i) => &mut self.spectators[i].inbound,
        };
        if !cursor.accept(sequence_number) {
            tracing::debug!(%from, sequence_number, "Dropping duplicate");
            return None;
        }

        let message = Message::from_frame(&frame)?;
        tracing::debug!(%from, sequence_number, kind = message.type_name(), "Received");
        Some(TransportEvent::Message(Delivery {
            message,
            sequence_number,
            from,
        }))
    }

    /// Match a datagram's source to the peer or a spectator, adopting or
    /// registering it when appropriate
    fn classify(&mut self, frame: &Frame, from: SocketAddr) -> Option<Source> {
        let spectator_request =
            frame.message_type() == Some(MessageType::SpectatorRequest.as_str());

        let peer = self.peer;
        match peer {
            Some(peer) if peer == from => Some(Source::Peer),
            _ if spectator_request || self.spectator_index(from).is_some() => {
                Some(Source::Spectator(self.register_spectator(from)))
            }
            None => {
                tracing::info!(peer = %from, "Peer connected");
                self.peer = Some(from);
                Some(Source::Peer)
            }
            Some(_) => {
                tracing::warn!(%from, "Dropping datagram from unknown source");
                None
            }
        }
    }

    fn spectator_index(&self, addr: SocketAddr) -> Option<usize> {
        self.spectators.iter().position(|s| s.addr == addr)
    }

    fn register_spectator(&mut self, addr: SocketAddr) -> usize {
        if let Some(i) = self.spectator_index(addr) {
            return i;
        }
        tracing::info!(spectator = %addr, "Spectator registered");
        self.spectators.push(Spectator {
            addr,
            inbound: InboundCursor::default(),
        });
        self.spectators.len() - 1
    }

    fn acknowledge(&mut self, ack_number: u32) {
        match &self.pending {
            Some(pending) if pending.sequence_number == ack_number => {
                tracing::debug!(ack_number, "Acknowledged");
                self.pending = None;
            }
            _ => tracing::debug!(ack_number, "Stale ACK"),
        }
    }

    fn send_ack(&self, sequence_number: u32, to: SocketAddr) {
        let payload = Message::Ack {
            ack_number: sequence_number,
        }
        .to_frame()
        .encode();
        if let Err(e) = self.socket.try_send_to(&payload, to) {
            tracing::warn!(%to, sequence_number, error = %e, "Failed to send ACK");
        }
    }

    /// Send to the peer and mirror to every spectator
    fn transmit(&self, payload: &[u8]) {
        match self.peer {
            Some(peer) => {
                if let Err(e) = self.socket.try_send_to(payload, peer) {
                    tracing::warn!(%peer, error = %e, "Send failed");
                }
            }
            None => tracing::warn!("No peer yet, message will be retried"),
        }

        for spectator in &self.spectators {
            if let Err(e) = self.socket.try_send_to(payload, spectator.addr) {
                tracing::debug!(spectator = %spectator.addr, error = %e, "Mirror failed");
            }
        }
    }
}
