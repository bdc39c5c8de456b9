use std::time::Duration;

/// Retry and polling parameters for the reliable transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// How long an unacknowledged message waits before being resent
    pub retry_delay: Duration,
    /// Retransmissions before the peer is declared lost
    pub max_retries: u32,
    /// Cadence of the session loop
    pub poll_interval: Duration,
    /// Receive buffer size
    pub max_datagram: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(500),
            max_retries: 3,
            poll_interval: Duration::from_millis(10),
            max_datagram: 65_535,
        }
    }
}
