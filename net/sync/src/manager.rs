//! Service wiring: composes the range-sync engine, the pending queues and
//! peer-status maintenance into one supervised task hierarchy (spec.md §5,
//! §7 "User-visible behavior").
//!
//! Every long-running duty is its own task, communicating through the
//! shared `PeerDb`/`PendingBlocks` locks and a single root
//! `CancellationToken`, per spec.md §5's scheduling model.

use crate::collaborators::{
    Attestation, AttestationValidator, BlockDb, BlockReceiver, HeadFetcher,
};
use crate::pending_attestations::PendingAttestations;
use crate::pending_blocks::PendingBlocks;
use crate::range_sync::{self, BlockRangeFetcher, BlockRootFetcher};
use crate::status::{self, ResyncTrigger, StatusFetcher};
use net_types::{NetError, SECONDS_PER_SLOT};
use p2p::config::NetworkConfig;
use p2p::peer_manager::peerdb::PeerDb;
use p2p::peer_manager::PeerManager;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Overall service status (spec.md §7): `syncing`, `running`, or the name
/// of whatever runtime error derailed it. Errors here are never fatal —
/// only a bad private-key file or unavailable listening port aborts
/// startup, and that happens before a `SyncManager` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Syncing,
    Running,
    Error(String),
}

/// The external collaborators a running sync service needs. Bundled so
/// `SyncManager::spawn` takes one argument instead of seven (spec.md §6.2).
pub struct Collaborators {
    pub head_fetcher: Arc<dyn HeadFetcher>,
    pub block_db: Arc<dyn BlockDb>,
    pub receiver: Arc<dyn BlockReceiver>,
    pub range_fetcher: Arc<dyn BlockRangeFetcher>,
    pub root_fetcher: Arc<dyn BlockRootFetcher>,
    pub attestation_validator: Arc<dyn AttestationValidator>,
    pub status_fetcher: Arc<dyn StatusFetcher>,
}

/// Wraps the caller's block-receiver so every delivered block also flushes
/// its bucket of pending attestations (spec.md §4.8 "Pending attestations":
/// reinjected once the referenced block arrives, regardless of whether it
/// arrived via range sync or the pending-block queue).
struct DeliveringReceiver {
    inner: Arc<dyn BlockReceiver>,
    pending_attestations: Arc<PendingAttestations>,
    validator: Arc<dyn AttestationValidator>,
    log: slog::Logger,
}

impl BlockReceiver for DeliveringReceiver {
    fn receive_block(&self, block: &p2p::rpc::RpcBlock) -> Result<(), NetError> {
        self.inner.receive_block(block)?;
        self.pending_attestations
            .flush(&block.root, self.validator.as_ref(), &self.log);
        Ok(())
    }
}

struct NotifyResync {
    notify: Arc<Notify>,
    pending_blocks: Arc<PendingBlocks>,
}

impl ResyncTrigger for NotifyResync {
    fn trigger_resync(&self) {
        self.pending_blocks.clear();
        self.notify.notify_one();
    }
}

pub struct SyncManager {
    peer_db: Arc<PeerDb>,
    peer_manager: Arc<PeerManager>,
    pending_blocks: Arc<PendingBlocks>,
    pending_attestations: Arc<PendingAttestations>,
    status: Arc<Mutex<Status>>,
    cancel: CancellationToken,
    log: slog::Logger,
}

impl SyncManager {
    pub fn new(peer_db: Arc<PeerDb>, peer_manager: Arc<PeerManager>, log: slog::Logger) -> Self {
        Self {
            pending_blocks: Arc::new(PendingBlocks::new(peer_db.clone())),
            pending_attestations: Arc::new(PendingAttestations::new()),
            peer_db,
            peer_manager,
            status: Arc::new(Mutex::new(Status::Syncing)),
            cancel: CancellationToken::new(),
            log,
        }
    }

    pub fn status(&self) -> Status {
        self.status.lock().clone()
    }

    pub fn pending_attestations(&self) -> &Arc<PendingAttestations> {
        &self.pending_attestations
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Spawns the full task hierarchy: the sync loop, the pending-block
    /// resolver, peer-status maintenance, and the peer-score decay timer.
    /// Returns their join handles so the embedding binary can await clean
    /// shutdown.
    pub fn spawn(self: Arc<Self>, config: NetworkConfig, collaborators: Collaborators) -> Vec<JoinHandle<()>> {
        let resync_notify = Arc::new(Notify::new());

        let sync_task = tokio::spawn(self.clone().run_sync_loop(
            config.clone(),
            collaborators.head_fetcher.clone(),
            collaborators.block_db.clone(),
            collaborators.receiver.clone(),
            collaborators.range_fetcher.clone(),
            collaborators.attestation_validator.clone(),
            resync_notify.clone(),
        ));

        let pending_task = tokio::spawn(self.clone().run_pending_blocks_loop(
            collaborators.head_fetcher.clone(),
            collaborators.block_db.clone(),
            collaborators.receiver.clone(),
            collaborators.attestation_validator.clone(),
            collaborators.root_fetcher.clone(),
        ));

        let status_task = tokio::spawn(self.clone().run_status_loop(
            collaborators.head_fetcher.clone(),
            collaborators.status_fetcher.clone(),
            resync_notify,
        ));

        let decay_task = tokio::spawn(p2p::peer_manager::decay::run(
            self.peer_db.clone(),
            self.cancel.clone(),
        ));

        vec![sync_task, pending_task, status_task, decay_task]
    }

    fn delivering_receiver(
        &self,
        inner: Arc<dyn BlockReceiver>,
        validator: Arc<dyn AttestationValidator>,
    ) -> DeliveringReceiver {
        DeliveringReceiver {
            inner,
            pending_attestations: self.pending_attestations.clone(),
            validator,
            log: self.log.clone(),
        }
    }

    async fn run_sync_loop(
        self: Arc<Self>,
        config: NetworkConfig,
        head_fetcher: Arc<dyn HeadFetcher>,
        block_db: Arc<dyn BlockDb>,
        receiver: Arc<dyn BlockReceiver>,
        range_fetcher: Arc<dyn BlockRangeFetcher>,
        attestation_validator: Arc<dyn AttestationValidator>,
        resync_notify: Arc<Notify>,
    ) {
        let delivering = self.delivering_receiver(receiver, attestation_validator);

        loop {
            *self.status.lock() = Status::Syncing;

            let finalized_result = range_sync::sync_finalized(
                &config,
                &self.peer_db,
                head_fetcher.as_ref(),
                block_db.as_ref(),
                &delivering,
                range_fetcher.as_ref(),
                &self.cancel,
                &self.log,
            )
            .await;

            match finalized_result {
                Ok(()) => {
                    let head_result = range_sync::sync_head(
                        &config,
                        &self.peer_db,
                        head_fetcher.as_ref(),
                        &delivering,
                        range_fetcher.as_ref(),
                        &self.cancel,
                    )
                    .await;
                    match head_result {
                        Ok(()) => *self.status.lock() = Status::Running,
                        Err(NetError::ContextCancelled) => return,
                        Err(err) => {
                            slog::debug!(self.log, "head sync round failed"; "error" => %err);
                            *self.status.lock() = Status::Error(err.to_string());
                        }
                    }
                }
                Err(NetError::ContextCancelled) => return,
                Err(err) => {
                    slog::debug!(self.log, "finalized sync round failed"; "error" => %err);
                    *self.status.lock() = Status::Error(err.to_string());
                }
            }

            tokio::select! {
                _ = resync_notify.notified() => continue,
                _ = self.cancel.cancelled() => return,
            }
        }
    }

    async fn run_pending_blocks_loop(
        self: Arc<Self>,
        head_fetcher: Arc<dyn HeadFetcher>,
        block_db: Arc<dyn BlockDb>,
        receiver: Arc<dyn BlockReceiver>,
        attestation_validator: Arc<dyn AttestationValidator>,
        root_fetcher: Arc<dyn BlockRootFetcher>,
    ) {
        let delivering = self.delivering_receiver(receiver, attestation_validator);
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            (SECONDS_PER_SLOT / 3).max(1),
        ));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self
                        .pending_blocks
                        .tick(head_fetcher.as_ref(), block_db.as_ref(), &delivering, root_fetcher.as_ref(), &self.log)
                        .await
                    {
                        slog::debug!(self.log, "pending-block tick failed"; "error" => %err);
                    }
                }
                _ = self.cancel.cancelled() => return,
            }
        }
    }

    async fn run_status_loop(
        self: Arc<Self>,
        head_fetcher: Arc<dyn HeadFetcher>,
        status_fetcher: Arc<dyn StatusFetcher>,
        resync_notify: Arc<Notify>,
    ) {
        let status = self.status.clone();
        let is_syncing: Arc<dyn Fn() -> bool + Send + Sync> =
            Arc::new(move || matches!(*status.lock(), Status::Syncing));
        let resync = Arc::new(NotifyResync {
            notify: resync_notify,
            pending_blocks: self.pending_blocks.clone(),
        });
        status::run(
            self.peer_db.clone(),
            self.peer_manager.clone(),
            head_fetcher,
            status_fetcher,
            is_syncing,
            resync,
            self.cancel.clone(),
        )
        .await;
    }
}
