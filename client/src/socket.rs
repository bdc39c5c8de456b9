//! Non-blocking datagram I/O
//!
//! The transport only needs three operations from a socket. Keeping them
//! behind [`DatagramSocket`] lets tests drive it with an in-memory double.

use std::io;
use std::net::SocketAddr;

/// A connectionless socket that never blocks.
///
/// Both `try_*` methods return `io::ErrorKind::WouldBlock` when nothing
/// can be done right now.
pub trait DatagramSocket {
    fn try_send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl DatagramSocket for tokio::net::UdpSocket {
    fn try_send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        tokio::net::UdpSocket::try_send_to(self, buf, target)
    }

    fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        tokio::net::UdpSocket::try_recv_from(self, buf)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        tokio::net::UdpSocket::local_addr(self)
    }
}

/// In-process datagram network for tests
#[cfg(test)]
pub(crate) mod memory {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::io;
    use std::net::SocketAddr;
    use std::rc::Rc;

    use pokelink_protocol::Frame;

    use super::DatagramSocket;

    type DropRule = Box<dyn FnMut(&Frame, SocketAddr, SocketAddr) -> bool>;

    #[derive(Default)]
    struct Wire {
        queues: HashMap<SocketAddr, VecDeque<(Vec<u8>, SocketAddr)>>,
        /// Every datagram sent: (frame, from, to)
        sent: Vec<(Frame, SocketAddr, SocketAddr)>,
        drop_rule: Option<DropRule>,
    }

    /// Shared medium; sockets bound on it deliver to each other instantly
    #[derive(Clone, Default)]
    pub struct MemoryNetwork {
        wire: Rc<RefCell<Wire>>,
    }

    impl MemoryNetwork {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn bind(&self, addr: SocketAddr) -> MemorySocket {
            self.wire.borrow_mut().queues.entry(addr).or_default();
            MemorySocket {
                local: addr,
                wire: Rc::clone(&self.wire),
            }
        }

        /// Place a datagram in `to`'s queue as if `from` had sent it
        pub fn inject(&self, from: SocketAddr, to: SocketAddr, frame: &Frame) {
            self.wire
                .borrow_mut()
                .queues
                .entry(to)
                .or_default()
                .push_back((frame.encode(), from));
        }

        /// Drain the record of datagrams sent by `from`
        pub fn take_sent_from(&self, from: SocketAddr) -> Vec<(Frame, SocketAddr)> {
            let mut wire = self.wire.borrow_mut();
            let (taken, kept) = std::mem::take(&mut wire.sent)
                .into_iter()
                .partition(|(_, src, _)| *src == from);
            wire.sent = kept;
            taken.into_iter().map(|(frame, _, to)| (frame, to)).collect()
        }

        /// Silently lose every datagram for which `rule(frame, from, to)` is true
        pub fn drop_when(&self, rule: impl FnMut(&Frame, SocketAddr, SocketAddr) -> bool + 'static) {
            self.wire.borrow_mut().drop_rule = Some(Box::new(rule));
        }
    }

    pub struct MemorySocket {
        local: SocketAddr,
        wire: Rc<RefCell<Wire>>,
    }

    impl DatagramSocket for MemorySocket {
        fn try_send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
            let mut wire = self.wire.borrow_mut();
            let frame = Frame::decode(buf);
            wire.sent.push((frame.clone(), self.local, target));

            let lost = match wire.drop_rule.as_mut() {
                Some(rule) => rule(&frame, self.local, target),
                None => false,
            };
            if !lost {
                if let Some(queue) = wire.queues.get_mut(&target) {
                    queue.push_back((buf.to_vec(), self.local));
                }
            }
            Ok(buf.len())
        }

        fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            let next = self
                .wire
                .borrow_mut()
                .queues
                .get_mut(&self.local)
                .and_then(|q| q.pop_front());
            match next {
                Some((bytes, from)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok((bytes.len(), from))
                }
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok(self.local)
        }
    }
}
