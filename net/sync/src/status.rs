//! Peer-status maintenance: periodic Status re-handshakes and the
//! resync trigger (spec.md §4.10).

use crate::collaborators::HeadFetcher;
use futures::future::BoxFuture;
use net_types::{ChainState, NetError, PeerId};
use p2p::config::intervals;
use p2p::peer_manager::peerdb::PeerDb;
use p2p::peer_manager::PeerManager;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The outbound half of a Status re-handshake. Actual stream I/O lives in
/// `p2p::rpc`; this is the seam the maintenance task drives it through.
pub trait StatusFetcher: Send + Sync {
    fn request_status(&self, peer: PeerId) -> BoxFuture<'_, Result<ChainState, NetError>>;
}

/// Asks the owning service to start Stage 1 again (spec.md §4.7
/// "Resync").
pub trait ResyncTrigger: Send + Sync {
    fn trigger_resync(&self);
}

/// One pass over connected peers (spec.md §4.10): any peer whose
/// chain-state is older than `STATUS_MAINTENANCE` gets re-statused: if
/// the node is not currently syncing and the peer set's best finalized
/// start-slot now exceeds the local head, a resync is triggered.
pub async fn run_once(
    peer_db: &Arc<PeerDb>,
    peer_manager: &PeerManager,
    head_fetcher: &dyn HeadFetcher,
    status_fetcher: &dyn StatusFetcher,
    is_syncing: bool,
    resync: &dyn ResyncTrigger,
) {
    for peer in peer_db.connected_peers() {
        let stale = peer_db
            .chain_state_age(&peer)
            .ok()
            .flatten()
            .map(|age| age >= intervals::STATUS_MAINTENANCE)
            .unwrap_or(true);
        if !stale {
            continue;
        }
        let result = status_fetcher.request_status(peer.clone()).await;
        peer_manager.handle_status_result(peer, result);
    }

    if is_syncing {
        return;
    }
    let local_head = head_fetcher.head_slot();
    if let Some((_, best_epoch, _)) =
        peer_db.best_finalized(usize::MAX, local_head.epoch())
    {
        if best_epoch.start_slot() > local_head {
            resync.trigger_resync();
        }
    }
}

/// Runs [`run_once`] on the `STATUS_MAINTENANCE` cadence until cancelled,
/// the way the single score-decay timer task is driven (spec.md §9
/// "Background decay timer... a single timer task per scorer instance,
/// cancellable by the root context").
pub async fn run(
    peer_db: Arc<PeerDb>,
    peer_manager: Arc<PeerManager>,
    head_fetcher: Arc<dyn HeadFetcher>,
    status_fetcher: Arc<dyn StatusFetcher>,
    is_syncing: Arc<dyn Fn() -> bool + Send + Sync>,
    resync: Arc<dyn ResyncTrigger>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(intervals::STATUS_MAINTENANCE);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_once(
                    &peer_db,
                    &peer_manager,
                    head_fetcher.as_ref(),
                    status_fetcher.as_ref(),
                    is_syncing(),
                    resync.as_ref(),
                )
                .await;
            }
            _ = cancel.cancelled() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::ready;
    use net_types::{ConnectionState, Direction, Epoch, ForkVersion, Hash256, Slot};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    struct FixedHead(Slot);
    impl HeadFetcher for FixedHead {
        fn head_slot(&self) -> Slot {
            self.0
        }
        fn head_root(&self) -> Hash256 {
            Hash256::zero()
        }
        fn finalized_checkpoint(&self) -> (Hash256, Epoch) {
            (Hash256::zero(), Epoch::new(0))
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

    struct AlwaysFails;
    impl StatusFetcher for AlwaysFails {
        fn request_status(&self, _peer: PeerId) -> BoxFuture<'_, Result<ChainState, NetError>> {
            Box::pin(ready(Err(NetError::Timeout)))
        }
    }

    struct FlagResync(AtomicBool);
    impl ResyncTrigger for FlagResync {
        fn trigger_resync(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn status(finalized_epoch: u64, head_slot: u64) -> ChainState {
        ChainState {
            fork_version: ForkVersion([0; 4]),
            finalized_root: Hash256::zero(),
            finalized_epoch: Epoch::new(finalized_epoch),
            head_root: Hash256::zero(),
            head_slot: Slot::new(head_slot),
        }
    }

    #[tokio::test]
    async fn stale_peer_gets_re_statused_and_flagged_on_failure() {
        let db = Arc::new(PeerDb::new());
        let peer = PeerId::random();
        db.add(peer.clone(), None, Direction::Outbound);
        db.set_connection_state(&peer, ConnectionState::Connected)
            .unwrap();
        db.set_chain_state(&peer, status(0, 10)).unwrap();

        let manager = PeerManager::new(PeerId::random(), db.clone(), 50, test_logger());
        let head = FixedHead(Slot::new(10));
        let resync = FlagResync(AtomicBool::new(false));

        run_once(&db, &manager, &head, &AlwaysFails, false, &resync).await;
        assert!(db.bad_responses(&peer).unwrap() >= 1);
    }

    #[tokio::test]
    async fn resync_triggers_when_finality_outpaces_local_head() {
        let db = Arc::new(PeerDb::new());
        let peer = PeerId::random();
        db.add(peer.clone(), None, Direction::Outbound);
        db.set_connection_state(&peer, ConnectionState::Connected)
            .unwrap();
        db.set_chain_state(&peer, status(5, 200)).unwrap();

        let manager = PeerManager::new(PeerId::random(), db.clone(), 50, test_logger());
        let head = FixedHead(Slot::new(1)); // far behind epoch 5's start slot
        let resync = FlagResync(AtomicBool::new(false));

        struct Ok200;
        impl StatusFetcher for Ok200 {
            fn request_status(&self, _peer: PeerId) -> BoxFuture<'_, Result<ChainState, NetError>> {
                Box::pin(ready(Ok(status(5, 200))))
            }
        }

        run_once(&db, &manager, &head, &Ok200, false, &resync).await;
        assert!(resync.0.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn no_resync_while_already_syncing() {
        let db = Arc::new(PeerDb::new());
        let peer = PeerId::random();
        db.add(peer.clone(), None, Direction::Outbound);
        db.set_connection_state(&peer, ConnectionState::Connected)
            .unwrap();
        db.set_chain_state(&peer, status(5, 200)).unwrap();

        let manager = PeerManager::new(PeerId::random(), db.clone(), 50, test_logger());
        let head = FixedHead(Slot::new(1));
        let resync = FlagResync(AtomicBool::new(false));

        struct Ok200;
        impl StatusFetcher for Ok200 {
            fn request_status(&self, _peer: PeerId) -> BoxFuture<'_, Result<ChainState, NetError>> {
                Box::pin(ready(Ok(status(5, 200))))
            }
        }

        run_once(&db, &manager, &head, &Ok200, true, &resync).await;
        assert!(!resync.0.load(Ordering::SeqCst));
    }
}
