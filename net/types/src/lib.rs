//! Shared wire/domain types for the beacon-chain networking core.
//!
//! Deliberately thin: this crate carries no networking logic of its own. It
//! exists so that `p2p` and `sync` agree on one definition of a slot, an
//! epoch, a chain digest and the handful of error kinds that cross crate
//! boundaries.

mod error;
mod fork;
mod peer_id;
mod slot_epoch;

pub use error::{NetError, NetResult};
pub use fork::{ForkDigest, ForkVersion};
pub use peer_id::PeerId;
pub use slot_epoch::{Epoch, Slot};

use serde::{Deserialize, Serialize};

/// Number of slots in one epoch. Fixed for the lifetime of this crate; a
/// multi-preset implementation would make this part of a `ChainSpec`, which
/// is out of scope here (spec.md §1, state transition is an external
/// collaborator).
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Number of attestation-subnet gossip topics (spec.md GLOSSARY).
pub const ATTESTATION_SUBNET_COUNT: u64 = 64;

/// Wall-clock seconds per slot. Used only to derive "how far behind
/// genesis-relative wall clock is the local head" for Stage 2 head sync
/// (spec.md §4.7); the state-transition collaborator owns the
/// authoritative value for a live chain.
pub const SECONDS_PER_SLOT: u64 = 12;

/// A 32-byte digest, used for block roots, state roots and finalized roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const fn zero() -> Self {
        Hash256([0; 32])
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(b: [u8; 32]) -> Self {
        Hash256(b)
    }
}

/// A finality checkpoint: a (root, epoch) pair considered irreversible once
/// justified twice in a row by the fork-choice collaborator (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub root: Hash256,
    pub epoch: Epoch,
}

impl Checkpoint {
    pub fn new(root: Hash256, epoch: Epoch) -> Self {
        Self { root, epoch }
    }
}

/// A peer or local chain-state snapshot, exchanged by the Status RPC
/// (spec.md §3 "Chain state (status)", §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub fork_version: ForkVersion,
    pub finalized_root: Hash256,
    pub finalized_epoch: Epoch,
    pub head_root: Hash256,
    pub head_slot: Slot,
}

/// One of `ATTESTATION_SUBNET_COUNT` gossip subnets (spec.md GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubnetId(pub u64);

impl SubnetId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubnetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction in which a TCP connection to a peer was established
/// (spec.md §3 "Peer record").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
    Unknown,
}

/// Lifecycle state of a peer connection (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Reason code carried by the Goodbye RPC (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodbyeReason {
    ClientShutdown,
    IrrelevantNetwork,
    Fault,
    Unknown(u64),
}

impl From<u64> for GoodbyeReason {
    fn from(code: u64) -> Self {
        match code {
            1 => GoodbyeReason::ClientShutdown,
            2 => GoodbyeReason::IrrelevantNetwork,
            3 => GoodbyeReason::Fault,
            other => GoodbyeReason::Unknown(other),
        }
    }
}

impl From<GoodbyeReason> for u64 {
    fn from(reason: GoodbyeReason) -> Self {
        match reason {
            GoodbyeReason::ClientShutdown => 1,
            GoodbyeReason::IrrelevantNetwork => 2,
            GoodbyeReason::Fault => 3,
            GoodbyeReason::Unknown(code) => code,
        }
    }
}
