#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::{Duration, Instant};

    use pokelink_protocol::{ChatMessage, Frame, Message};

    use crate::config::TransportConfig;
    use crate::socket::memory::{MemoryNetwork, MemorySocket};
    use crate::transport::{Delivery, Transport, TransportEvent};

    const ME: &str = "127.0.0.1:4000";
    const PEER: &str = "127.0.0.1:5000";
    const STRANGER: &str = "127.0.0.1:6000";
    const SPECTATOR: &str = "127.0.0.1:7000";

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    /// One transport under test at `ME`, with helpers to play the other side
    struct Harness {
        net: MemoryNetwork,
    }

    impl Harness {
        fn deliver(&self, from: &str, frame: Frame) {
            self.net.inject(addr(from), addr(ME), &frame);
        }

        fn deliver_seq(&self, from: &str, message: &Message, seq: u32) {
            self.deliver(from, message.to_frame().with_sequence(seq));
        }

        fn deliver_ack(&self, from: &str, ack_number: u32) {
            self.deliver(from, Message::Ack { ack_number }.to_frame());
        }

        fn take_sent(&self) -> Vec<(Frame, SocketAddr)> {
            self.net.take_sent_from(addr(ME))
        }
    }

    fn unpeered() -> (Transport<MemorySocket>, Harness) {
        let net = MemoryNetwork::new();
        let transport = Transport::with_socket(net.bind(addr(ME)), TransportConfig::default());
        (transport, Harness { net })
    }

    fn peered() -> (Transport<MemorySocket>, Harness) {
        let (mut transport, harness) = unpeered();
        transport.configure_peer(addr(PEER));
        (transport, harness)
    }

    fn chat(text: &str) -> Message {
        Message::Chat(ChatMessage::text("Joiner", text))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn delivered_seq(event: Option<TransportEvent>) -> Option<u32> {
        match event? {
            TransportEvent::Message(Delivery {
                sequence_number, ..
            }) => Some(sequence_number),
            TransportEvent::ConnectionLost { .. } => None,
        }
    }

    #[test]
    fn test_send_assigns_sequence_and_tracks_pending() {
        let (mut transport, wire) = peered();
        let now = Instant::now();

        assert_eq!(transport.send_at(&Message::HandshakeRequest, now), 1);
        assert_eq!(transport.send_at(&chat("hi"), now), 2);
        assert_eq!(transport.next_sequence(), 3);

        let pending = transport.pending().unwrap();
        assert_eq!(pending.sequence_number, 2);
        assert_eq!(pending.retry_count, 0);

        let sent = wire.take_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, addr(PEER));
        assert_eq!(sent[0].0.message_type(), Some("HANDSHAKE_REQUEST"));
        assert_eq!(sent[0].0.sequence_number(), Some(1));
        // sequence_number sits right after message_type
        let keys: Vec<&str> = sent[1].0.iter().map(|(k, _)| k).collect();
        assert_eq!(&keys[..2], &["message_type", "sequence_number"]);
    }

    #[test]
    fn test_ack_clears_pending_and_stops_retries() {
        let (mut transport, wire) = peered();
        let t0 = Instant::now();

        let seq = transport.send_at(&Message::CalculationConfirm, t0);
        wire.deliver_ack(PEER, seq);

        assert_eq!(transport.poll_at(t0 + ms(5)), None);
        assert!(!transport.has_pending());

        wire.take_sent();
        for step in 1..10 {
            assert_eq!(transport.poll_at(t0 + ms(600 * step)), None);
        }
        assert!(wire.take_sent().is_empty());
    }

    #[test]
    fn test_mismatched_or_foreign_ack_keeps_pending() {
        let (mut transport, wire) = peered();
        let t0 = Instant::now();

        let seq = transport.send_at(&Message::CalculationConfirm, t0);
        wire.deliver_ack(PEER, seq + 1);
        wire.deliver_ack(STRANGER, seq);
        transport.poll_at(t0);

        assert_eq!(transport.pending().map(|p| p.sequence_number), Some(seq));
    }

    #[test]
    fn test_retry_cap() {
        let (mut transport, wire) = peered();
        let config = TransportConfig::default();
        let t0 = Instant::now();

        let seq = transport.send_at(&Message::HandshakeRequest, t0);
        wire.take_sent();

        // Nothing before the delay has fully elapsed
        assert_eq!(transport.poll_at(t0 + config.retry_delay), None);
        assert!(wire.take_sent().is_empty());

        let step = config.retry_delay + ms(1);
        for attempt in 1..=config.max_retries {
            assert_eq!(transport.poll_at(t0 + step * attempt), None);

            let sent = wire.take_sent();
            assert_eq!(sent.len(), 1, "attempt {attempt}");
            assert_eq!(sent[0].0.sequence_number(), Some(seq));
            assert_eq!(transport.pending().unwrap().retry_count, attempt);
        }

        let lost = transport.poll_at(t0 + step * (config.max_retries + 1));
        assert_eq!(
            lost,
            Some(TransportEvent::ConnectionLost {
                sequence_number: seq
            })
        );
        assert!(!transport.has_pending());
        assert!(wire.take_sent().is_empty());

        // Nothing further once cleared
        assert_eq!(transport.poll_at(t0 + step * 10), None);
        assert!(wire.take_sent().is_empty());
    }

    #[test]
    fn test_new_send_replaces_pending() {
        let (mut transport, wire) = peered();
        let t0 = Instant::now();

        let first = transport.send_at(&chat("one"), t0);
        let second = transport.send_at(&chat("two"), t0);
        wire.deliver_ack(PEER, first);
        transport.poll_at(t0);

        // Late ACK for the abandoned message changes nothing
        assert_eq!(transport.pending().map(|p| p.sequence_number), Some(second));
    }

    #[test]
    fn test_sequenced_messages_are_acked_and_delivered() {
        let (mut transport, wire) = peered();
        wire.deliver_seq(PEER, &chat("hello"), 1);

        let event = transport.poll_at(Instant::now());

        assert_eq!(
            event,
            Some(TransportEvent::Message(Delivery {
                message: chat("hello"),
                sequence_number: 1,
                from: addr(PEER),
            }))
        );
        let sent = wire.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.message_type(), Some("ACK"));
        assert_eq!(sent[0].0.ack_number(), Some(1));
        assert_eq!(sent[0].0.sequence_number(), None);
        assert_eq!(sent[0].1, addr(PEER));
    }

    #[test]
    fn test_dedup_drops_repeats_but_still_acks() {
        let (mut transport, wire) = peered();
        let now = Instant::now();

        wire.deliver_seq(PEER, &chat("a"), 5);
        assert_eq!(delivered_seq(transport.poll_at(now)), Some(5));
        assert_eq!(transport.highest_seen_sequence(), 5);

        wire.deliver_seq(PEER, &chat("a"), 5);
        wire.deliver_seq(PEER, &chat("old"), 3);
        assert_eq!(transport.poll_at(now), None);

        let acks: Vec<u32> = wire
            .take_sent()
            .iter()
            .filter_map(|(f, _)| f.ack_number())
            .collect();
        assert_eq!(acks, vec![5, 5, 3]);

        wire.deliver_seq(PEER, &chat("b"), 6);
        assert_eq!(delivered_seq(transport.poll_at(now)), Some(6));
        assert_eq!(transport.highest_seen_sequence(), 6);
    }

    #[test]
    fn test_first_sequence_is_never_a_duplicate() {
        // A fresh cursor accepts any value, even a high one
        let (mut transport, wire) = peered();
        wire.deliver_seq(PEER, &chat("late start"), 40);
        assert_eq!(delivered_seq(transport.poll_at(Instant::now())), Some(40));

        // Zero never moves the cursor off zero, so repeats of it get through
        let (mut transport, wire) = peered();
        wire.deliver_seq(PEER, &chat("zero"), 0);
        wire.deliver_seq(PEER, &chat("zero"), 0);
        assert_eq!(delivered_seq(transport.poll_at(Instant::now())), Some(0));
        assert_eq!(delivered_seq(transport.poll_at(Instant::now())), Some(0));
        assert_eq!(transport.highest_seen_sequence(), 0);
    }

    #[test]
    fn test_messages_without_sequence_or_type() {
        let (mut transport, wire) = peered();

        // Neither ACK nor sequenced: ignored outright
        wire.deliver(PEER, Frame::with_type("CHAT_MESSAGE"));
        assert_eq!(transport.poll_at(Instant::now()), None);
        assert!(wire.take_sent().is_empty());

        // Sequenced but typeless: acknowledged, then nothing to surface
        wire.deliver(PEER, Frame::new().with("junk", 1).with_sequence(1));
        assert_eq!(transport.poll_at(Instant::now()), None);
        assert_eq!(wire.take_sent().len(), 1);
        assert_eq!(transport.highest_seen_sequence(), 1);
    }

    #[test]
    fn test_first_sender_becomes_peer() {
        let (mut transport, wire) = unpeered();
        assert_eq!(transport.peer(), None);

        wire.deliver_seq(PEER, &Message::HandshakeRequest, 1);
        assert_eq!(delivered_seq(transport.poll_at(Instant::now())), Some(1));
        assert_eq!(transport.peer(), Some(addr(PEER)));

        // Anyone else is dropped without an ACK
        wire.take_sent();
        wire.deliver_seq(STRANGER, &chat("let me in"), 1);
        assert_eq!(transport.poll_at(Instant::now()), None);
        assert!(wire.take_sent().is_empty());
    }

    #[test]
    fn test_configure_peer_is_idempotent() {
        let (mut transport, _wire) = peered();
        transport.configure_peer(addr(PEER));
        transport.configure_peer(addr(PEER));

        assert_eq!(transport.peer(), Some(addr(PEER)));
    }

    #[test]
    fn test_send_without_peer_is_retried_once_known() {
        let (mut transport, wire) = unpeered();
        let t0 = Instant::now();

        transport.send_at(&Message::HandshakeRequest, t0);
        assert!(wire.take_sent().is_empty());

        transport.configure_peer(addr(PEER));
        transport.poll_at(t0 + ms(501));
        let sent = wire.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, addr(PEER));
    }

    #[test]
    fn test_spectator_request_registers_and_mirrors() {
        let (mut transport, wire) = peered();
        let t0 = Instant::now();

        wire.deliver_seq(SPECTATOR, &Message::SpectatorRequest, 1);
        let event = transport.poll_at(t0);
        assert_eq!(
            event,
            Some(TransportEvent::Message(Delivery {
                message: Message::SpectatorRequest,
                sequence_number: 1,
                from: addr(SPECTATOR),
            }))
        );
        assert_eq!(transport.spectators().collect::<Vec<_>>(), vec![addr(SPECTATOR)]);
        assert_eq!(transport.peer(), Some(addr(PEER)));

        let acks = wire.take_sent();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].1, addr(SPECTATOR));

        // The spectator has its own cursor; the peer's first message still counts
        wire.deliver_seq(PEER, &chat("hi"), 1);
        assert_eq!(delivered_seq(transport.poll_at(t0)), Some(1));
        wire.take_sent();

        // Sends and retransmissions go to both
        transport.send_at(&Message::CalculationConfirm, t0);
        let targets: Vec<SocketAddr> = wire.take_sent().into_iter().map(|(_, to)| to).collect();
        assert_eq!(targets, vec![addr(PEER), addr(SPECTATOR)]);

        transport.poll_at(t0 + ms(501));
        assert_eq!(wire.take_sent().len(), 2);

        // Spectator ACKs never clear the peer's pending message
        let seq = transport.pending().unwrap().sequence_number;
        wire.deliver_ack(SPECTATOR, seq);
        transport.poll_at(t0 + ms(502));
        assert!(transport.has_pending());
    }

    #[test]
    fn test_spectator_request_before_peer_does_not_claim_peer() {
        let (mut transport, wire) = unpeered();

        wire.deliver_seq(SPECTATOR, &Message::SpectatorRequest, 1);
        transport.poll_at(Instant::now());
        assert_eq!(transport.peer(), None);

        wire.deliver_seq(PEER, &Message::HandshakeRequest, 1);
        transport.poll_at(Instant::now());
        assert_eq!(transport.peer(), Some(addr(PEER)));
    }

    #[test]
    fn test_spectator_duplicates_are_dropped() {
        let (mut transport, wire) = peered();
        let now = Instant::now();

        wire.deliver_seq(SPECTATOR, &Message::SpectatorRequest, 1);
        wire.deliver_seq(SPECTATOR, &Message::SpectatorRequest, 1);
        wire.deliver_seq(SPECTATOR, &chat("gg"), 2);

        assert_eq!(delivered_seq(transport.poll_at(now)), Some(1));
        assert_eq!(delivered_seq(transport.poll_at(now)), Some(2));
        assert_eq!(transport.poll_at(now), None);
        assert_eq!(transport.spectators().count(), 1);
    }
}
