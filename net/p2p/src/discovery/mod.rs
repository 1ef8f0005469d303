//! UDP node discovery (spec.md §4.2).
//!
//! The wire-level discovery protocol and its UDP transport are an
//! explicit Non-goal (spec.md §1: "choosing a specific wire-multiplexing
//! library"); this module owns what sits above that line — ENR bookkeeping
//! and the eth2 fork-compatibility filter spec.md §4.2 requires — behind
//! the same seam-over-a-trait-boundary pattern the sync engine uses for its
//! RPC transport (`sync::range_sync::BlockRangeFetcher`). `observe` is
//! where a wired binary would feed in records surfaced by whatever
//! discovery protocol implementation it embeds.

pub mod enr;

use self::enr::{is_compatible, AttestationSubnets, EnrolmentRecord};
use net_types::{ForkDigest, ForkVersion, PeerId};
use parking_lot::RwLock;
use std::net::IpAddr;

/// Context needed to compute/validate fork compatibility and to build the
/// local record (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct ForkContext {
    pub current_fork_digest: ForkDigest,
    pub next_fork_version: ForkVersion,
    pub next_fork_epoch: u64,
}

/// Bootstrap/seed configuration for `start`.
pub struct DiscoveryConfig {
    pub local_ip: IpAddr,
    pub udp_port: u16,
    pub tcp_port: u16,
    pub private_key: Vec<u8>,
    pub bootnodes: Vec<EnrolmentRecord>,
}

/// The discovery listener (spec.md §4.2 `Listener`). Holds the local
/// enrolment record and a best-effort view of the routing table's
/// discovered records, fed in via `observe` by whatever underlying
/// discovery protocol a wired binary embeds; modelled here as an explicit
/// table so the fork-filtering logic is independently testable.
pub struct Listener {
    local: RwLock<EnrolmentRecord>,
    fork_context: RwLock<ForkContext>,
    table: RwLock<Vec<EnrolmentRecord>>,
    log: slog::Logger,
}

impl Listener {
    /// Starts the discovery listener, seeded by `bootnodes` (spec.md
    /// §4.2 `start`).
    pub fn start(config: DiscoveryConfig, fork_context: ForkContext, log: slog::Logger) -> Self {
        let local = EnrolmentRecord {
            peer_id: PeerId::from_bytes(config.private_key.clone()),
            ip: Some(config.local_ip),
            udp_port: Some(config.udp_port),
            tcp_port: Some(config.tcp_port),
            fork_digest: fork_context.current_fork_digest,
            next_fork_version: fork_context.next_fork_version,
            next_fork_epoch: fork_context.next_fork_epoch,
            attnets: AttestationSubnets::default(),
        };
        slog::info!(log, "Discovery started"; "udp_port" => config.udp_port, "peer_id" => %local.peer_id);
        Listener {
            local: RwLock::new(local),
            fork_context: RwLock::new(fork_context),
            table: RwLock::new(config.bootnodes),
            log,
        }
    }

    /// The local enrolment record (spec.md §4.2 `Listener::self`).
    pub fn local_enr(&self) -> EnrolmentRecord {
        self.local.read().clone()
    }

    /// Seeds the routing table view, e.g. with a batch of records freshly
    /// returned by the underlying discv5 lookup. Kept separate from
    /// `lookup_random` so tests can populate a table deterministically.
    pub fn observe(&self, records: Vec<EnrolmentRecord>) {
        self.table.write().extend(records);
    }

    /// Best-effort nearby peers, filtered to those compatible with our
    /// current fork digest and that advertise a dial-able TCP port
    /// (spec.md §4.2 `lookup_random`).
    pub fn lookup_random(&self) -> Vec<EnrolmentRecord> {
        let local = self.local.read().clone();
        self.table
            .read()
            .iter()
            .filter(|r| r.is_dial_candidate() && is_compatible(&local, r))
            .cloned()
            .collect()
    }

    /// Records tracking the given attestation subnet (spec.md §4.2
    /// `find_with_subnet`).
    pub fn find_with_subnet(&self, subnet_index: u64) -> Vec<EnrolmentRecord> {
        self.lookup_random()
            .into_iter()
            .filter(|r| r.attnets.is_tracking(subnet_index))
            .collect()
    }

    /// Updates the local record's subnet bitfield, e.g. after the gossip
    /// layer changes which subnets we track (spec.md §4.2 `refresh_enr`).
    pub fn refresh_enr(&self, att_subnets_bitfield: u64) {
        self.local.write().attnets = AttestationSubnets(att_subnets_bitfield);
    }

    /// Swaps in a new fork context at a scheduled upgrade boundary,
    /// updating the local record's digest too.
    pub fn update_fork_context(&self, fork_context: ForkContext) {
        let mut local = self.local.write();
        local.fork_digest = fork_context.current_fork_digest;
        local.next_fork_version = fork_context.next_fork_version;
        local.next_fork_epoch = fork_context.next_fork_epoch;
        *self.fork_context.write() = fork_context;
        slog::info!(self.log, "Fork context updated"; "digest" => %local.fork_digest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tcp: Option<u16>, digest: [u8; 4]) -> EnrolmentRecord {
        EnrolmentRecord {
            peer_id: PeerId::random(),
            ip: Some(IpAddr::from([127, 0, 0, 1])),
            udp_port: Some(9000),
            tcp_port: tcp,
            fork_digest: ForkDigest(digest),
            next_fork_version: ForkVersion([0; 4]),
            next_fork_epoch: u64::MAX,
            attnets: AttestationSubnets::default(),
        }
    }

    fn listener() -> Listener {
        let log = slog::Logger::root(slog::Discard, slog::o!());
        Listener::start(
            DiscoveryConfig {
                local_ip: IpAddr::from([0, 0, 0, 0]),
                udp_port: 9000,
                tcp_port: 9000,
                private_key: vec![1, 2, 3],
                bootnodes: vec![],
            },
            ForkContext {
                current_fork_digest: ForkDigest([1, 2, 3, 4]),
                next_fork_version: ForkVersion([0; 4]),
                next_fork_epoch: u64::MAX,
            },
            log,
        )
    }

    #[test]
    fn filters_no_tcp_port() {
        let listener = listener();
        listener.observe(vec![record(None, [1, 2, 3, 4])]);
        assert!(listener.lookup_random().is_empty());
    }

    #[test]
    fn filters_incompatible_fork() {
        let listener = listener();
        listener.observe(vec![record(Some(9001), [9, 9, 9, 9])]);
        assert!(listener.lookup_random().is_empty());
    }

    #[test]
    fn accepts_compatible_dial_candidate() {
        let listener = listener();
        listener.observe(vec![record(Some(9001), [1, 2, 3, 4])]);
        assert_eq!(listener.lookup_random().len(), 1);
    }

    #[test]
    fn find_with_subnet_filters() {
        let listener = listener();
        let mut r = record(Some(9001), [1, 2, 3, 4]);
        r.attnets.set(5);
        listener.observe(vec![r]);
        assert_eq!(listener.find_with_subnet(5).len(), 1);
        assert_eq!(listener.find_with_subnet(6).len(), 0);
    }
}
