//! Pending-block queue: slot → block awaiting its ancestor, plus the
//! seen-root set that dedupes re-delivery (spec.md §4.8 "Pending
//! blocks").
//!
//! Both maps share a single mutex because every mutation touches them
//! together (spec.md §5 "Pending-block map and seen-block set: one mutex
//! shared between them").

use crate::collaborators::{BlockDb, BlockReceiver, HeadFetcher};
use crate::range_sync::BlockRootFetcher;
use net_types::{Epoch, Hash256, NetError, PeerId, Slot};
use p2p::peer_manager::peerdb::PeerDb;
use p2p::rpc::RpcBlock;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct Inner {
    pending: HashMap<Slot, RpcBlock>,
    seen: HashSet<Hash256>,
}

pub struct PendingBlocks {
    inner: Mutex<Inner>,
    peer_db: Arc<PeerDb>,
}

impl PendingBlocks {
    pub fn new(peer_db: Arc<PeerDb>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                seen: HashSet::new(),
            }),
            peer_db,
        }
    }

    /// Queues a block whose parent is not yet known. Returns `false` if
    /// this root was already queued (spec.md §8 idempotence law:
    /// processing the same block twice yields exactly one delivery).
    pub fn insert(&self, block: RpcBlock) -> bool {
        let mut inner = self.inner.lock();
        if !inner.seen.insert(block.root) {
            return false;
        }
        inner.pending.insert(block.slot, block);
        p2p::metrics::set_pending_queue_size(inner.pending.len());
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every queued block. Called when a resync is triggered (spec.md
    /// §4.7 "Resync"): the finalized-epoch sync restarting makes any
    /// still-pending entry's ancestry moot, since it will re-arrive (or be
    /// superseded) through the range-sync path.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.pending.clear();
        inner.seen.clear();
        p2p::metrics::set_pending_queue_size(0);
    }

    /// Drops every entry whose slot's epoch is at or behind finality, and
    /// cascades to anything transitively descending from a removed entry
    /// (spec.md §4.8 step 3).
    fn prune(&self, inner: &mut Inner, finalized_epoch: Epoch) {
        let stale: Vec<Slot> = inner
            .pending
            .iter()
            .filter(|(slot, _)| slot.epoch() <= finalized_epoch)
            .map(|(slot, _)| *slot)
            .collect();
        let mut to_remove: HashSet<Hash256> = stale
            .iter()
            .filter_map(|slot| inner.pending.get(slot).map(|b| b.root))
            .collect();
        for slot in &stale {
            inner.pending.remove(slot);
        }
        // Cascade: anything whose parent was just removed is itself
        // removed, repeating until a pass removes nothing.
        loop {
            let cascaded: Vec<Slot> = inner
                .pending
                .iter()
                .filter(|(_, block)| to_remove.contains(&block.parent_root))
                .map(|(slot, _)| *slot)
                .collect();
            if cascaded.is_empty() {
                break;
            }
            for slot in cascaded {
                if let Some(block) = inner.pending.remove(&slot) {
                    to_remove.insert(block.root);
                }
            }
        }
        for root in to_remove {
            inner.seen.remove(&root);
        }
    }

    /// One processing tick (spec.md §4.8 step 1-2), run on a
    /// `⌊seconds-per-slot / 3⌋` cadence by the owning service.
    pub async fn tick(
        &self,
        head_fetcher: &dyn HeadFetcher,
        block_db: &dyn BlockDb,
        receiver: &dyn BlockReceiver,
        root_fetcher: &dyn BlockRootFetcher,
        log: &slog::Logger,
    ) -> Result<(), NetError> {
        let (_, finalized_epoch) = head_fetcher.finalized_checkpoint();
        let mut slots: Vec<Slot> = {
            let mut inner = self.inner.lock();
            self.prune(&mut inner, finalized_epoch);
            p2p::metrics::set_pending_queue_size(inner.pending.len());
            inner.pending.keys().copied().collect()
        };
        slots.sort();

        for slot in slots.drain(..) {
            let (block, parent_pending) = {
                let inner = self.inner.lock();
                let Some(block) = inner.pending.get(&slot).cloned() else {
                    continue; // pruned or delivered by an earlier iteration
                };
                (block.clone(), inner.seen.contains(&block.parent_root))
            };
            if parent_pending {
                // A later tick resolves this once the ancestor lands.
                continue;
            }
            if block_db.has_block(&block.parent_root) {
                receiver.receive_block(&block)?;
                let mut inner = self.inner.lock();
                inner.pending.remove(&slot);
                inner.seen.remove(&block.root);
                p2p::metrics::set_pending_queue_size(inner.pending.len());
            } else {
                self.request_parent(&block, root_fetcher, log).await;
            }
        }
        Ok(())
    }

    async fn request_parent(
        &self,
        block: &RpcBlock,
        root_fetcher: &dyn BlockRootFetcher,
        log: &slog::Logger,
    ) {
        let connected = self.peer_db.connected_peers();
        let Some(peer) = pick_random(&connected) else {
            slog::debug!(log, "no peer available to request missing parent";
                "root" => %block.parent_root);
            return;
        };
        if let Err(err) = root_fetcher
            .request_blocks_by_root(peer.clone(), vec![block.parent_root])
            .await
        {
            slog::debug!(log, "blocks_by_root parent request failed";
                "peer" => %peer, "error" => %err);
            let _ = self.peer_db.increment_bad_responses(&peer);
        }
    }
}

fn pick_random(peers: &[PeerId]) -> Option<PeerId> {
    peers.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{ready, BoxFuture};
    use net_types::ForkVersion;
    use std::sync::Mutex as StdMutex;

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn block(slot: u64, parent_slot: u64) -> RpcBlock {
        RpcBlock {
            slot: Slot::new(slot),
            parent_root: Hash256([parent_slot as u8; 32]),
            root: Hash256([slot as u8; 32]),
            body: vec![],
        }
    }

    struct FixedHead {
        finalized_epoch: Epoch,
    }
    impl HeadFetcher for FixedHead {
        fn head_slot(&self) -> Slot {
            Slot::new(0)
        }
        fn head_root(&self) -> Hash256 {
            Hash256::zero()
        }
        fn finalized_checkpoint(&self) -> (Hash256, Epoch) {
            (Hash256::zero(), self.finalized_epoch)
        }
        fn current_fork_version(&self) -> ForkVersion {
            ForkVersion([0; 4])
        }
        fn genesis_time(&self) -> u64 {
            0
        }
        fn genesis_validators_root(&self) -> Hash256 {
            Hash256::zero()
        }
    }

    struct KnownRoots(HashSet<Hash256>);
    impl BlockDb for KnownRoots {
        fn has_block(&self, root: &Hash256) -> bool {
            self.0.contains(root)
        }
        fn has_state(&self, _root: &Hash256) -> bool {
            false
        }
    }

    struct RecordingReceiver {
        delivered: StdMutex<Vec<Slot>>,
    }
    impl BlockReceiver for RecordingReceiver {
        fn receive_block(&self, block: &RpcBlock) -> Result<(), NetError> {
            self.delivered.lock().unwrap().push(block.slot);
            Ok(())
        }
    }

    struct NoopRootFetcher;
    impl BlockRootFetcher for NoopRootFetcher {
        fn request_blocks_by_root(
            &self,
            _peer: PeerId,
            _roots: Vec<Hash256>,
        ) -> BoxFuture<'_, Result<Vec<RpcBlock>, NetError>> {
            Box::pin(ready(Ok(Vec::new())))
        }
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let queue = PendingBlocks::new(Arc::new(PeerDb::new()));
        assert!(queue.insert(block(5, 4)));
        assert!(!queue.insert(block(5, 4)));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn resolves_in_order_once_ancestors_land() {
        // Scenario 4 (spec.md §8): b0 (known parent), b2 (parent = b1,
        // unknown), b1 arrives later; after enough ticks the receiver
        // sees exactly b0, b1, b2 in that order.
        let peer_db = Arc::new(PeerDb::new());
        let queue = PendingBlocks::new(peer_db);
        let head = FixedHead {
            finalized_epoch: Epoch::new(0),
        };
        let receiver = RecordingReceiver {
            delivered: StdMutex::new(Vec::new()),
        };
        let root_fetcher = NoopRootFetcher;
        let log = test_logger();

        let b0 = block(10, 0); // parent is genesis, known up front
        let b1 = block(11, 10);
        let b2 = block(12, 11);

        let mut known = KnownRoots(HashSet::new());
        known.0.insert(Hash256::zero());

        queue.insert(b0.clone());
        queue.insert(b2.clone());
        queue.tick(&head, &known, &receiver, &root_fetcher, &log).await.unwrap();
        // b0's parent (genesis) is known -> delivered immediately.
        // b2's parent (b1's root) is neither known-in-db nor pending yet,
        // so it is requested, not delivered.
        assert_eq!(receiver.delivered.lock().unwrap().clone(), vec![b0.slot]);
        known.0.insert(b0.root);

        queue.insert(b1.clone());
        queue.tick(&head, &known, &receiver, &root_fetcher, &log).await.unwrap();
        known.0.insert(b1.root);
        queue.tick(&head, &known, &receiver, &root_fetcher, &log).await.unwrap();

        assert_eq!(
            receiver.delivered.lock().unwrap().clone(),
            vec![b0.slot, b1.slot, b2.slot]
        );
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn finality_prunes_and_cascades() {
        let peer_db = Arc::new(PeerDb::new());
        let queue = PendingBlocks::new(peer_db.clone());
        let root_fetcher = NoopRootFetcher;
        let log = test_logger();
        let known = KnownRoots(HashSet::new());
        let receiver = RecordingReceiver {
            delivered: StdMutex::new(Vec::new()),
        };

        // slot 10 is in epoch 0; a child at slot 11 depends on it.
        let parent = block(10, 0);
        let child = block(11, 10);
        queue.insert(parent);
        queue.insert(child);
        assert_eq!(queue.len(), 2);

        let head = FixedHead {
            finalized_epoch: Epoch::new(0),
        };
        queue.tick(&head, &known, &receiver, &root_fetcher, &log).await.unwrap();
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn pick_random_handles_empty_peer_list() {
        assert!(pick_random(&[]).is_none());
        let peer = PeerId::random();
        assert_eq!(pick_random(&[peer.clone()]), Some(peer));
    }
}
