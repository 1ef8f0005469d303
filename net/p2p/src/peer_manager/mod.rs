//! Dial policy and handshake orchestration (spec.md §4.3).
//!
//! Grounded on the teacher's `lighthouse_network::PeerManager`, which is
//! driven by the swarm and emits `PeerManagerEvent`s for the owning
//! `Behaviour`/service to act on (`987d9760…behaviour-mod.rs`). This
//! crate has no transport of its own, so the same event-queue shape is
//! used: callers push observed transport events in, and drain
//! `PeerManagerEvent`s out.

pub mod decay;
pub mod peerdb;
pub mod score;

use self::peerdb::{Address, PeerDb};
use crate::config::intervals;
use crate::ttl_cache::TtlCache;
use net_types::{ChainState, ConnectionState, Direction, GoodbyeReason, NetError, PeerId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Events the connection manager asks its owner to act on. Mirrors the
/// teacher's `PeerManagerEvent` shape: the manager itself never touches
/// the transport, it only decides policy.
#[derive(Debug, Clone)]
pub enum PeerManagerEvent {
    /// Dial this peer; enforced only once the caller has a concrete
    /// address to dial (discovery supplies that).
    DialPeer(PeerId),
    /// Disconnect, sending a Goodbye with the given reason first.
    Goodbye(PeerId, GoodbyeReason),
    /// Newly connected peer; run the Status RPC against it.
    RunStatusHandshake(PeerId),
    /// A peer's record was evicted from the store.
    PeerEvicted(PeerId),
}

/// Exclusion-list TTL: one hour, matching the bad-response decay cadence
/// so a banned peer gets a fair retry once its score has had a chance to
/// recover (SPEC_FULL.md §C).
const EXCLUSION_TTL: Duration = Duration::from_secs(60 * 60);
const EXCLUSION_CAPACITY: usize = 4096;

pub struct PeerManager {
    local_id: PeerId,
    db: Arc<PeerDb>,
    max_peers: usize,
    exclusion_list: Mutex<TtlCache<PeerId>>,
    events: Mutex<Vec<PeerManagerEvent>>,
    log: slog::Logger,
}

impl PeerManager {
    pub fn new(local_id: PeerId, db: Arc<PeerDb>, max_peers: usize, log: slog::Logger) -> Self {
        Self {
            local_id,
            db,
            max_peers,
            exclusion_list: Mutex::new(TtlCache::new(EXCLUSION_CAPACITY, EXCLUSION_TTL)),
            events: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn peer_db(&self) -> &Arc<PeerDb> {
        &self.db
    }

    fn push(&self, event: PeerManagerEvent) {
        self.events.lock().push(event);
    }

    /// Drains pending events for the owning service to process.
    pub fn poll_events(&self) -> Vec<PeerManagerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Dial policy (spec.md §4.3): refuse if at the peer cap, never dial
    /// self, never dial an excluded or bad peer.
    pub fn should_dial(&self, peer: &PeerId) -> bool {
        if peer == &self.local_id {
            return false;
        }
        if self.db.connected_count() >= self.max_peers {
            return false;
        }
        if self.exclusion_list.lock().contains(peer) {
            return false;
        }
        if self.db.is_bad_peer(peer) {
            return false;
        }
        true
    }

    /// Requests a dial if policy allows it; records the attempt either
    /// way so the caller can distinguish "policy refused" from "will
    /// dial".
    pub fn request_dial(&self, peer: PeerId, addr: Address) {
        if !self.should_dial(&peer) {
            slog::debug!(self.log, "Refusing to dial peer"; "peer" => %peer);
            return;
        }
        self.db.add(peer.clone(), Some(addr), Direction::Outbound);
        self.push(PeerManagerEvent::DialPeer(peer));
    }

    /// Called when the transport reports a connection (inbound or
    /// outbound) is now established. Immediately schedules the Status
    /// handshake (spec.md §4.3).
    pub fn on_connection_established(
        &self,
        peer: PeerId,
        addr: Option<Address>,
        direction: Direction,
    ) {
        self.db.add(peer.clone(), addr, direction);
        // ignore: unknown peer can't happen, we just added it.
        let _ = self
            .db
            .set_connection_state(&peer, ConnectionState::Connected);
        self.push(PeerManagerEvent::RunStatusHandshake(peer));
    }

    pub fn on_connection_closed(&self, peer: &PeerId) {
        // Disconnection transitions state only; history is preserved
        // until explicit eviction (spec.md §3 lifecycle).
        let _ = self
            .db
            .set_connection_state(peer, ConnectionState::Disconnected);
    }

    /// Validates a Status handshake result. On failure, flags the peer,
    /// schedules a Goodbye with a 50ms drain delay, and disconnects
    /// (spec.md §4.3, §4.6).
    pub fn handle_status_result(&self, peer: PeerId, result: Result<ChainState, NetError>) {
        match result {
            Ok(state) => {
                let _ = self.db.set_chain_state(&peer, state);
            }
            Err(err) => {
                let _ = self.db.set_validation_error(&peer, err.clone());
                let _ = self.db.increment_bad_responses(&peer);
                slog::debug!(self.log, "Status handshake failed"; "peer" => %peer, "error" => %err);
                self.push(PeerManagerEvent::Goodbye(peer, GoodbyeReason::Fault));
            }
        }
    }

    /// Exclude a peer from future dials for `EXCLUSION_TTL`.
    pub fn exclude(&self, peer: PeerId) {
        self.exclusion_list.lock().insert(peer);
    }

    /// Marks relay/bootstrap peers so scoring-based eviction skips them
    /// (spec.md §4.3).
    pub fn protect(&self, peer: &PeerId) {
        let _ = self.db.set_protected(peer, true);
    }

    pub fn evict(&self, peer: &PeerId) {
        if self.db.is_protected(peer) {
            return;
        }
        self.db.evict(peer);
        self.push(PeerManagerEvent::PeerEvicted(peer.clone()));
    }

    /// How long to wait after a Goodbye before dropping the connection
    /// (spec.md §4.3, §4.6).
    pub fn goodbye_drain_delay(&self) -> Duration {
        intervals::GOODBYE_DRAIN_DELAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_logger() -> slog::Logger {
        let drain = slog::Discard;
        slog::Logger::root(drain, slog::o!())
    }

    #[test]
    fn never_dials_self() {
        let local = PeerId::random();
        let db = Arc::new(PeerDb::new());
        let pm = PeerManager::new(local.clone(), db, 10, test_logger());
        assert!(!pm.should_dial(&local));
    }

    #[test]
    fn never_dials_bad_peer() {
        let local = PeerId::random();
        let db = Arc::new(PeerDb::new());
        let pm = PeerManager::new(local, db.clone(), 10, test_logger());
        let peer = PeerId::random();
        db.add(peer.clone(), None, Direction::Unknown);
        for _ in 0..3 {
            db.increment_bad_responses(&peer).unwrap();
        }
        assert!(!pm.should_dial(&peer));
    }

    #[test]
    fn refuses_dial_at_cap() {
        let local = PeerId::random();
        let db = Arc::new(PeerDb::new());
        let pm = PeerManager::new(local, db.clone(), 1, test_logger());
        let p1 = PeerId::random();
        pm.on_connection_established(p1, None, Direction::Inbound);
        let p2 = PeerId::random();
        assert!(!pm.should_dial(&p2));
    }

    #[test]
    fn status_failure_schedules_goodbye() {
        let local = PeerId::random();
        let db = Arc::new(PeerDb::new());
        let pm = PeerManager::new(local, db, 10, test_logger());
        let peer = PeerId::random();
        pm.on_connection_established(peer.clone(), None, Direction::Inbound);
        let _ = pm.poll_events();
        pm.handle_status_result(peer.clone(), Err(NetError::WrongForkDigest));
        let events = pm.poll_events();
        assert!(matches!(events.as_slice(), [PeerManagerEvent::Goodbye(p, GoodbyeReason::Fault)] if *p == peer));
    }

    #[test]
    fn protected_peer_not_evicted() {
        let local = PeerId::random();
        let db = Arc::new(PeerDb::new());
        let pm = PeerManager::new(local, db.clone(), 10, test_logger());
        let peer = PeerId::random();
        db.add(peer.clone(), None, Direction::Outbound);
        pm.protect(&peer);
        pm.evict(&peer);
        assert!(db.contains(&peer));
    }
}
