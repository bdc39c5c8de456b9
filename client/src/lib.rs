//! Peer-to-peer battle client over UDP
//!
//! ```text
//! pokelink-client
//! ├── socket     DatagramSocket seam over tokio's UdpSocket
//! ├── transport  stop-and-wait delivery: sequence, ACK, retry, dedup
//! ├── session    transport + battle + outbox, driven one tick at a time
//! ├── handler    callbacks for the display layer
//! ├── config     retry and polling parameters
//! └── cli        clap arguments for the binary
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pokelink_client::{Battle, Dex, Role, Session, Transport, TransportConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = TransportConfig::default();
//! let mut transport = Transport::bind("0.0.0.0:9999".parse()?, config).await?;
//! transport.configure_peer("127.0.0.1:8888".parse()?);
//!
//! let battle = Battle::new(Role::Joiner, "Blastoise", Dex::builtin());
//! let mut session = Session::new(transport, battle);
//! while !session.is_finished() {
//!     session.tick(&mut ());
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod handler;
pub mod session;
pub mod socket;
pub mod transport;

pub use config::TransportConfig;
pub use handler::Handler;
pub use session::{Command, Session, SessionError};
pub use socket::DatagramSocket;
pub use transport::{
    Delivery, InboundCursor, PendingOutbound, Transport, TransportError, TransportEvent,
};

pub use pokelink_battle::{
    Battle, BattleContext, BattleError, BattleState, DamageResolver, Dex, Role, Side,
};
pub use pokelink_protocol::{ChatContent, ChatMessage, Frame, Message};
