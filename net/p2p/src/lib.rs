//! Peer management, discovery, gossip subscription filtering and
//! request/response RPC for a beacon-chain node.
//!
//! This crate implements spec.md §4.1–§4.6, §4.9 and the supporting
//! ambient caches described in SPEC_FULL.md §C. It never touches the state
//! transition, fork choice, or block database — those are external
//! collaborators reached only through the traits in `sync::collaborators`.

pub mod config;
pub mod discovery;
pub mod error;
pub mod gossipsub;
pub mod metrics;
pub mod network_globals;
pub mod peer_manager;
pub mod rpc;
pub mod ttl_cache;

pub use config::NetworkConfig;
pub use network_globals::NetworkGlobals;
pub use peer_manager::peerdb::PeerDb;
pub use peer_manager::PeerManager;

pub use net_types::{
    ChainState, Checkpoint, ConnectionState, Direction, Epoch, ForkDigest, ForkVersion,
    GoodbyeReason, Hash256, PeerId, Slot, SubnetId, ATTESTATION_SUBNET_COUNT, SLOTS_PER_EPOCH,
};
