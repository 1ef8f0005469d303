//! Local and remote enrolment-record (ENR) fields relevant to this core
//! (spec.md §4.2, §3 "Gossip topic" / attestation-subnet bitfield).
//!
//! Grounded on the `Eth2Enr` extension trait named in the teacher's
//! `987d9760…behaviour-mod.rs` import (`crate::discovery::enr::Eth2Enr`):
//! rather than re-deriving eth2 semantics from a raw `discv5::Enr` at every
//! call site, the fields this core cares about are read through one small
//! trait.

use net_types::{ForkDigest, ForkVersion, PeerId};
use std::net::IpAddr;

/// A peer's attestation-subnet tracking bitfield (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttestationSubnets(pub u64);

impl AttestationSubnets {
    pub fn is_tracking(&self, subnet: u64) -> bool {
        subnet < 64 && (self.0 & (1 << subnet)) != 0
    }

    pub fn set(&mut self, subnet: u64) {
        if subnet < 64 {
            self.0 |= 1 << subnet;
        }
    }
}

/// The eth2-specific fields carried in an ENR, plus the addressing fields
/// every ENR carries (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct EnrolmentRecord {
    pub peer_id: PeerId,
    pub ip: Option<IpAddr>,
    pub udp_port: Option<u16>,
    pub tcp_port: Option<u16>,
    pub fork_digest: ForkDigest,
    pub next_fork_version: ForkVersion,
    pub next_fork_epoch: u64,
    pub attnets: AttestationSubnets,
}

impl EnrolmentRecord {
    /// Dial candidates must advertise a TCP port (spec.md §4.2).
    pub fn is_dial_candidate(&self) -> bool {
        self.tcp_port.is_some() && self.ip.is_some()
    }
}

/// Two peers are protocol-compatible iff their current fork digests match
/// (spec.md §4.2 "Fork-compatibility rule").
pub fn is_compatible(local: &EnrolmentRecord, remote: &EnrolmentRecord) -> bool {
    local.fork_digest == remote.fork_digest
}

/// True if the two records share a current digest but diverge on the next
/// scheduled upgrade — SHOULD be logged as a pending-divergence warning by
/// the caller (spec.md §4.2), but remains compatible *now*.
pub fn has_pending_divergence(local: &EnrolmentRecord, remote: &EnrolmentRecord) -> bool {
    is_compatible(local, remote)
        && (local.next_fork_version != remote.next_fork_version
            || local.next_fork_epoch != remote.next_fork_epoch)
}
