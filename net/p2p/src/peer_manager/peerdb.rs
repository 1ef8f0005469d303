//! In-memory peer registry and multi-axis scorer (spec.md §4.1).
//!
//! Grounded on the teacher's `lighthouse_network::PeerManager`'s internal
//! `PeerDB` (referenced by name in `987d9760…behaviour-mod.rs`): a single
//! `RwLock`-guarded map, shared-lock reads and exclusive-lock writes, no
//! implicit removal on disconnect.

use super::score::{self, ScoreAxes};
use fnv::FnvHashMap;
use net_types::{
    ChainState, ConnectionState, Direction, Epoch, Hash256, NetError, NetResult, PeerId, Slot,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;

/// A peer's network address. Modelled as an opaque string (the host
/// transport's multiaddress) since multiaddr parsing is not part of this
/// core's concern (spec.md §1 Non-goals: wire-multiplexing library choice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address(pub String);

/// Canonical per-peer record (spec.md §3 "Peer record").
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub address: Option<Address>,
    pub direction: Direction,
    pub connection_state: ConnectionState,
    pub chain_state: Option<ChainState>,
    pub chain_state_updated_at: Option<Instant>,
    pub bad_responses: u32,
    pub processed_batches: u64,
    pub last_validation_error: Option<NetError>,
    /// Relay/bootstrap peers are exempt from scoring-based eviction
    /// (spec.md §4.3).
    pub protected: bool,
}

impl PeerRecord {
    fn new(address: Option<Address>, direction: Direction) -> Self {
        Self {
            address,
            direction,
            connection_state: ConnectionState::Disconnected,
            chain_state: None,
            chain_state_updated_at: None,
            bad_responses: 0,
            processed_batches: 0,
            last_validation_error: None,
            protected: false,
        }
    }

    fn axes(&self, max_known_head_slot: Slot, local_head_slot: Slot) -> ScoreAxes {
        ScoreAxes {
            bad_responses: self.bad_responses,
            processed_batches: self.processed_batches,
            head_slot: self.chain_state.map(|s| s.head_slot),
            max_known_head_slot,
            local_head_slot,
            last_error_terminal: self
                .last_validation_error
                .as_ref()
                .map(score::is_terminal)
                .unwrap_or(false),
        }
    }
}

#[derive(Default)]
struct Inner {
    peers: FnvHashMap<PeerId, PeerRecord>,
}

/// Thread-safe peer store. All public operations acquire the single
/// readers-writer lock described in spec.md §5.
pub struct PeerDb {
    inner: RwLock<Inner>,
}

impl Default for PeerDb {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerDb {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Registers a newly observed peer (first dial attempt or inbound
    /// connection). A second `add` for the same id is a no-op update of
    /// address/direction rather than a fresh record, preserving
    /// bad-response history (spec.md §3 lifecycle).
    pub fn add(&self, peer: PeerId, addr: Option<Address>, direction: Direction) {
        let mut inner = self.inner.write();
        inner
            .peers
            .entry(peer)
            .and_modify(|p| {
                p.address = addr.clone();
                p.direction = direction;
            })
            .or_insert_with(|| PeerRecord::new(addr, direction));
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.inner.read().peers.contains_key(peer)
    }

    /// Permanently removes a peer's record. Never called implicitly on
    /// disconnect (spec.md §3 lifecycle).
    pub fn evict(&self, peer: &PeerId) {
        self.inner.write().peers.remove(peer);
    }

    pub fn set_chain_state(&self, peer: &PeerId, state: ChainState) -> NetResult<()> {
        let mut inner = self.inner.write();
        let record = inner.peers.get_mut(peer).ok_or(NetError::PeerUnknown)?;
        record.chain_state = Some(state);
        record.chain_state_updated_at = Some(Instant::now());
        Ok(())
    }

    pub fn set_validation_error(&self, peer: &PeerId, err: NetError) -> NetResult<()> {
        let mut inner = self.inner.write();
        let record = inner.peers.get_mut(peer).ok_or(NetError::PeerUnknown)?;
        record.last_validation_error = Some(err);
        Ok(())
    }

    pub fn chain_state(&self, peer: &PeerId) -> NetResult<Option<ChainState>> {
        let inner = self.inner.read();
        let record = inner.peers.get(peer).ok_or(NetError::PeerUnknown)?;
        Ok(record.chain_state)
    }

    pub fn chain_state_age(&self, peer: &PeerId) -> NetResult<Option<std::time::Duration>> {
        let inner = self.inner.read();
        let record = inner.peers.get(peer).ok_or(NetError::PeerUnknown)?;
        Ok(record.chain_state_updated_at.map(|t| t.elapsed()))
    }

    pub fn connection_state(&self, peer: &PeerId) -> NetResult<ConnectionState> {
        let inner = self.inner.read();
        inner
            .peers
            .get(peer)
            .map(|p| p.connection_state)
            .ok_or(NetError::PeerUnknown)
    }

    pub fn set_connection_state(&self, peer: &PeerId, state: ConnectionState) -> NetResult<()> {
        let mut inner = self.inner.write();
        let record = inner.peers.get_mut(peer).ok_or(NetError::PeerUnknown)?;
        record.connection_state = state;
        Ok(())
    }

    pub fn set_protected(&self, peer: &PeerId, protected: bool) -> NetResult<()> {
        let mut inner = self.inner.write();
        let record = inner.peers.get_mut(peer).ok_or(NetError::PeerUnknown)?;
        record.protected = protected;
        Ok(())
    }

    pub fn is_protected(&self, peer: &PeerId) -> bool {
        self.inner
            .read()
            .peers
            .get(peer)
            .map(|p| p.protected)
            .unwrap_or(false)
    }

    pub fn increment_bad_responses(&self, peer: &PeerId) -> NetResult<u32> {
        let mut inner = self.inner.write();
        let record = inner.peers.get_mut(peer).ok_or(NetError::PeerUnknown)?;
        record.bad_responses = record.bad_responses.saturating_add(1);
        crate::metrics::inc_bad_responses();
        Ok(record.bad_responses)
    }

    pub fn bad_responses(&self, peer: &PeerId) -> NetResult<u32> {
        let inner = self.inner.read();
        inner
            .peers
            .get(peer)
            .map(|p| p.bad_responses)
            .ok_or(NetError::PeerUnknown)
    }

    pub fn increment_processed_batches(&self, peer: &PeerId) -> NetResult<()> {
        let mut inner = self.inner.write();
        let record = inner.peers.get_mut(peer).ok_or(NetError::PeerUnknown)?;
        record.processed_batches = record.processed_batches.saturating_add(1);
        crate::metrics::inc_processed_batches();
        Ok(())
    }

    /// True once a peer's bad-response count has reached the threshold
    /// (spec.md §4.1).
    pub fn is_bad_peer(&self, peer: &PeerId) -> bool {
        self.inner
            .read()
            .peers
            .get(peer)
            .map(|p| p.bad_responses >= score::BAD_RESPONSE_THRESHOLD)
            .unwrap_or(false)
    }

    fn max_known_head_slot(peers: &FnvHashMap<PeerId, PeerRecord>) -> Slot {
        peers
            .values()
            .filter_map(|p| p.chain_state.map(|s| s.head_slot))
            .max()
            .unwrap_or(Slot::new(0))
    }

    /// Multi-axis score, rounded to 4 decimal digits (spec.md §4.1). Score
    /// of an unknown peer is 0, matching the testable property in spec.md
    /// §8.
    pub fn score(&self, peer: &PeerId, local_head_slot: Slot) -> f64 {
        let inner = self.inner.read();
        let Some(record) = inner.peers.get(peer) else {
            return 0.0;
        };
        if record.chain_state.is_none() {
            return 0.0;
        }
        let max_head = Self::max_known_head_slot(&inner.peers);
        score::combine(record.axes(max_head, local_head_slot))
    }

    /// Peers sorted descending by block-provider contribution, used by the
    /// sync engine to prefer proven block sources (spec.md §4.1
    /// `sorted_by_block_provider_score`).
    pub fn sorted_by_block_provider_score(&self, peers: &[PeerId]) -> Vec<PeerId> {
        let inner = self.inner.read();
        let mut scored: Vec<(PeerId, u64)> = peers
            .iter()
            .filter_map(|p| {
                inner
                    .peers
                    .get(p)
                    .map(|rec| (p.clone(), rec.processed_batches))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.into_iter().map(|(p, _)| p).collect()
    }

    /// Groups connected peers by finalized root, picks the most-voted
    /// root, and returns up to `max_peers` peers whose finalized epoch is
    /// at least that root's epoch (spec.md §4.1 `best_finalized`).
    ///
    /// Ties in vote count are broken deterministically by comparing the
    /// candidate roots' raw bytes, satisfying the "deterministic within a
    /// single call" requirement without depending on map iteration order.
    pub fn best_finalized(
        &self,
        max_peers: usize,
        _local_head_epoch: Epoch,
    ) -> Option<(Hash256, Epoch, Vec<PeerId>)> {
        let inner = self.inner.read();
        let mut votes: HashMap<Hash256, (Epoch, u64)> = HashMap::new();
        for record in inner.peers.values() {
            if record.connection_state != ConnectionState::Connected {
                continue;
            }
            if let Some(state) = record.chain_state {
                let entry = votes
                    .entry(state.finalized_root)
                    .or_insert((state.finalized_epoch, 0));
                entry.0 = entry.0.max(state.finalized_epoch);
                entry.1 += 1;
            }
        }
        let (&best_root, &(best_epoch, _)) = votes
            .iter()
            .max_by(|a, b| a.1 .1.cmp(&b.1 .1).then_with(|| b.0 .0.cmp(&a.0 .0)))?;

        let mut peers: Vec<PeerId> = inner
            .peers
            .iter()
            .filter(|(_, r)| {
                r.connection_state == ConnectionState::Connected
                    && r.chain_state
                        .map(|s| s.finalized_epoch >= best_epoch)
                        .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect();
        peers.sort();
        peers.truncate(max_peers);
        Some((best_root, best_epoch, peers))
    }

    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.inner
            .read()
            .peers
            .iter()
            .filter(|(_, r)| r.connection_state == ConnectionState::Connected)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn connected_count(&self) -> usize {
        self.inner
            .read()
            .peers
            .values()
            .filter(|r| r.connection_state == ConnectionState::Connected)
            .count()
    }

    /// Bad-response score decay (spec.md §4.1, `intervals::BAD_RESPONSE_DECAY`
    /// cadence). Called by the single score-decay timer task (SPEC_FULL.md
    /// §C).
    pub fn decay_bad_responses(&self) {
        let mut inner = self.inner.write();
        for record in inner.peers.values_mut() {
            record.bad_responses = record.bad_responses.saturating_sub(1);
        }
    }

    /// Block-provider score decay (spec.md §4.1,
    /// `intervals::BLOCK_PROVIDER_DECAY` cadence): halves the processed-batch
    /// count so a peer's historical contribution matters less than its
    /// recent one, without forgetting it outright.
    pub fn decay_block_provider(&self) {
        let mut inner = self.inner.write();
        for record in inner.peers.values_mut() {
            record.processed_batches /= 2;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.read().peers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_state(head_slot: u64, finalized_epoch: u64) -> ChainState {
        ChainState {
            fork_version: net_types::ForkVersion([0; 4]),
            finalized_root: Hash256::zero(),
            finalized_epoch: Epoch::new(finalized_epoch),
            head_root: Hash256::zero(),
            head_slot: Slot::new(head_slot),
        }
    }

    #[test]
    fn unknown_peer_errors() {
        let db = PeerDb::new();
        let peer = PeerId::random();
        assert_eq!(db.bad_responses(&peer), Err(NetError::PeerUnknown));
        assert_eq!(db.score(&peer, Slot::new(0)), 0.0);
    }

    #[test]
    fn at_most_one_record_per_peer() {
        let db = PeerDb::new();
        let peer = PeerId::random();
        db.add(peer.clone(), Some(Address("a".into())), Direction::Outbound);
        db.add(peer.clone(), Some(Address("b".into())), Direction::Inbound);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn bad_peer_threshold() {
        let db = PeerDb::new();
        let peer = PeerId::random();
        db.add(peer.clone(), Some(Address("a".into())), Direction::Outbound);
        db.set_chain_state(&peer, chain_state(10, 1)).unwrap();
        for _ in 0..3 {
            db.increment_bad_responses(&peer).unwrap();
        }
        assert!(db.is_bad_peer(&peer));
        assert_eq!(db.score(&peer, Slot::new(0)), score::BAD_PEER_SCORE);
    }

    #[test]
    fn zero_batches_boosted() {
        let db = PeerDb::new();
        let peer = PeerId::random();
        db.add(peer.clone(), Some(Address("a".into())), Direction::Outbound);
        db.set_chain_state(&peer, chain_state(10, 1)).unwrap();
        let zero_score = db.score(&peer, Slot::new(10));
        db.increment_processed_batches(&peer).unwrap();
        let one_score = db.score(&peer, Slot::new(10));
        assert!(zero_score > one_score);
    }

    #[test]
    fn eviction_removes_record() {
        let db = PeerDb::new();
        let peer = PeerId::random();
        db.add(peer.clone(), Some(Address("a".into())), Direction::Outbound);
        db.evict(&peer);
        assert!(!db.contains(&peer));
    }

    #[test]
    fn best_finalized_majority_wins() {
        let db = PeerDb::new();
        let root_a = Hash256([1; 32]);
        let root_b = Hash256([2; 32]);
        let mut ids = vec![];
        for i in 0..3u8 {
            let peer = PeerId::random();
            db.add(peer.clone(), Some(Address(format!("a{i}"))), Direction::Outbound);
            db.set_connection_state(&peer, ConnectionState::Connected)
                .unwrap();
            let root = if i < 2 { root_a } else { root_b };
            db.set_chain_state(
                &peer,
                ChainState {
                    fork_version: net_types::ForkVersion([0; 4]),
                    finalized_root: root,
                    finalized_epoch: Epoch::new(5),
                    head_root: Hash256::zero(),
                    head_slot: Slot::new(200),
                },
            )
            .unwrap();
            ids.push(peer);
        }
        let (root, epoch, peers) = db.best_finalized(10, Epoch::new(0)).unwrap();
        assert_eq!(root, root_a);
        assert_eq!(epoch, Epoch::new(5));
        assert_eq!(peers.len(), 2);
    }
}
