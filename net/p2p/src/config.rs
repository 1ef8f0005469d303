use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Wire encoding selection (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ssz,
    SszSnappy,
}

impl Encoding {
    /// The protocol suffix appended to every gossip topic and RPC protocol
    /// id (spec.md §4.9).
    pub fn protocol_suffix(&self) -> &'static str {
        match self {
            Encoding::Ssz => "ssz",
            Encoding::SszSnappy => "ssz_snappy",
        }
    }
}

/// Recognised configuration options (spec.md §6.4). Populated by the
/// embedding binary; CLI parsing is explicitly out of scope (spec.md §1).
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub data_dir: PathBuf,
    pub listen_address: IpAddr,
    pub tcp_port: u16,
    pub udp_port: u16,
    pub max_peers: usize,
    pub minimum_sync_peers: usize,
    pub bootstrap_nodes: Vec<String>,
    pub static_peers: Vec<String>,
    pub relay_node: Option<String>,
    pub encoding: Encoding,
    pub enable_discovery: bool,
    pub block_batch_limit: u64,
    pub block_batch_burst: u64,
    pub max_peers_to_sync: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            listen_address: IpAddr::from([0, 0, 0, 0]),
            tcp_port: 9000,
            udp_port: 9000,
            max_peers: 50,
            minimum_sync_peers: 3,
            bootstrap_nodes: Vec::new(),
            static_peers: Vec::new(),
            relay_node: None,
            encoding: Encoding::SszSnappy,
            enable_discovery: true,
            block_batch_limit: 64,
            block_batch_burst: 640,
            max_peers_to_sync: 5,
        }
    }
}

/// Interval constants used throughout the core. Kept together so that the
/// magic numbers named across spec.md §4 live in one place.
pub mod intervals {
    use super::Duration;

    /// §4.3 "ensure peer connections" static-dial retry task.
    pub const ENSURE_PEER_CONNECTIONS: Duration = Duration::from_secs(5);

    /// §4.10 peer-status maintenance cadence (~30 slots on mainnet).
    pub const STATUS_MAINTENANCE: Duration = Duration::from_secs(6 * 60);

    /// §4.1 bad-response score decay cadence.
    pub const BAD_RESPONSE_DECAY: Duration = Duration::from_secs(60 * 60);

    /// §4.1 block-provider score decay cadence.
    pub const BLOCK_PROVIDER_DECAY: Duration = Duration::from_secs(5 * 60);

    /// §4.3 drain delay before disconnecting after a failed handshake.
    pub const GOODBYE_DRAIN_DELAY: Duration = Duration::from_millis(50);

    /// §4.6 stream deadlines.
    pub const RPC_TTFB_TIMEOUT: Duration = Duration::from_secs(5);
    pub const RPC_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

    /// §4.7 Stage 1 retry interval when too few sync peers are available.
    pub const SYNC_PEER_REFRESH: Duration = Duration::from_secs(5);
}
