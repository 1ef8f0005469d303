//! The initial-sync engine: Stage 1 finalized-epoch sync and Stage 2 head
//! sync (spec.md §4.7).

mod fetch;
mod stripe;

pub use fetch::BlockRangeFetcher;

use crate::collaborators::{BlockDb, BlockReceiver, HeadFetcher};
use net_types::{Hash256, NetError, PeerId, Slot, SECONDS_PER_SLOT};
use p2p::config::{intervals, NetworkConfig};
use p2p::peer_manager::peerdb::PeerDb;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Head-sync requests at most this many slots per round (spec.md §4.7
/// Stage 2).
const HEAD_SYNC_BATCH_SIZE: u64 = 256;

/// Brings the local head up to `start_slot_of(best_finalized_epoch + 1)`
/// by repeatedly striping batches across shuffled peers (spec.md §4.7
/// Stage 1). Returns once the local head has caught up to finality, or an
/// error if cancelled.
pub async fn sync_finalized(
    config: &NetworkConfig,
    peer_db: &Arc<PeerDb>,
    head_fetcher: &dyn HeadFetcher,
    block_db: &dyn BlockDb,
    receiver: &dyn BlockReceiver,
    fetcher: &dyn BlockRangeFetcher,
    cancel: &CancellationToken,
    log: &slog::Logger,
) -> Result<(), NetError> {
    let mut last_empty_requests: u64 = 0;
    let mut known_roots = std::collections::HashSet::new();
    known_roots.insert(head_fetcher.head_root());
    // The cursor tracks the next request's start independently of
    // `head_fetcher`: the skip-forward logic below advances it past empty
    // ranges that the local head never reaches because no block was
    // produced there (spec.md §4.7 step 6).
    let mut cursor: Option<Slot> = None;
    let mut last_peer_count: Option<usize> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(NetError::ContextCancelled);
        }
        let local_head = head_fetcher.head_slot();
        let Some((_, best_epoch, mut peers)) =
            peer_db.best_finalized(config.max_peers_to_sync, local_head.epoch())
        else {
            if wait_or_cancel(intervals::SYNC_PEER_REFRESH, cancel).await {
                return Err(NetError::ContextCancelled);
            }
            continue;
        };
        if peers.len() < config.minimum_sync_peers {
            if wait_or_cancel(intervals::SYNC_PEER_REFRESH, cancel).await {
                return Err(NetError::ContextCancelled);
            }
            continue;
        }

        let target = (best_epoch + 1).start_slot();
        if local_head >= target {
            return Ok(());
        }

        peers.shuffle(&mut rand::thread_rng());
        let peer_count = peers.len() as u64;
        // A changed peer set invalidates the skip-forward counter (spec.md
        // §9 open question: reset on peer-set change as well as on any
        // non-empty batch).
        if last_peer_count != Some(peers.len()) {
            last_empty_requests = 0;
        }
        last_peer_count = Some(peers.len());

        let base = cursor.unwrap_or(local_head + 1).max(local_head + 1);
        if base > target {
            // The skip-forward logic has run past finality: already done.
            return Ok(());
        }

        // Inclusive of `target` itself: the loop only stops once
        // `local_head_slot >= target` (spec.md §4.7 step 1), so `target`
        // must actually be requested and delivered, not just approached.
        let range = config
            .block_batch_limit
            .min(target.as_u64().saturating_sub(base.as_u64()) + 1);
        let slots: Vec<Slot> = (0..range).map(|i| base + i).collect();

        let head_root = head_fetcher.head_root();
        let result = fetch::fetch_batch(peers.clone(), slots, head_root, fetcher, peer_db, log)
            .await;

        let mut blocks = match result {
            Ok(blocks) => blocks,
            Err(err) => {
                slog::debug!(log, "sync batch failed, will retry"; "error" => %err);
                last_empty_requests = last_empty_requests.saturating_add(1);
                cursor = Some(base + range * last_empty_requests * peer_count);
                continue;
            }
        };
        blocks.sort_by_key(|b| b.slot);
        blocks.dedup_by_key(|b| b.slot);

        if blocks.is_empty() {
            last_empty_requests = last_empty_requests.saturating_add(1);
            cursor = Some(base + range * last_empty_requests * peer_count);
            continue;
        }
        last_empty_requests = 0;
        cursor = Some(base + range);

        for block in &blocks {
            if known_roots.contains(&block.parent_root) || block_db.has_block(&block.parent_root)
            {
                receiver.receive_block(block)?;
                known_roots.insert(block.root);
            }
            // Else: missing-parent block, ignored here; it re-arrives via
            // the pending-block queue (spec.md §4.7 step 5, §4.8).
        }
    }
}

/// Repeatedly requests small batches from the single best-head peer until
/// a response is empty (spec.md §4.7 Stage 2). Any request failure is
/// fatal for this round; the caller retries on the next resync.
pub async fn sync_head(
    config: &NetworkConfig,
    peer_db: &Arc<PeerDb>,
    head_fetcher: &dyn HeadFetcher,
    receiver: &dyn BlockReceiver,
    fetcher: &dyn BlockRangeFetcher,
    cancel: &CancellationToken,
) -> Result<(), NetError> {
    let (best_root, best_epoch, peers) = peer_db
        .best_finalized(config.max_peers_to_sync, head_fetcher.head_slot().epoch())
        .ok_or(NetError::NoPeers)?;
    let best_peer = peer_db
        .sorted_by_block_provider_score(&peers)
        .into_iter()
        .next()
        .ok_or(NetError::NoPeers)?;

    loop {
        if cancel.is_cancelled() {
            return Err(NetError::ContextCancelled);
        }
        let local_head = head_fetcher.head_slot();
        let slots_since_genesis = current_slot_estimate(head_fetcher.genesis_time())
            .saturating_sub(local_head.as_u64());
        let count = (slots_since_genesis + 1).min(HEAD_SYNC_BATCH_SIZE).max(1);

        let request = p2p::rpc::BlocksByRangeRequest {
            head_block_root: best_root,
            start_slot: local_head + 1,
            step: 1,
            count,
        };
        let response = fetcher
            .request_blocks_by_range(best_peer.clone(), request.clone())
            .await;
        let mut blocks = match fetch::validate_response(&request, response) {
            Ok(blocks) => blocks,
            Err(err) => {
                let _ = peer_db.increment_bad_responses(&best_peer);
                return Err(err);
            }
        };
        if blocks.is_empty() {
            return Ok(());
        }
        blocks.sort_by_key(|b| b.slot);
        for block in &blocks {
            receiver.receive_block(block)?;
        }
        let _ = best_epoch;
    }
}

fn current_slot_estimate(genesis_time: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(genesis_time);
    now.saturating_sub(genesis_time) / SECONDS_PER_SLOT
}

/// Waits for `duration` or cancellation, whichever comes first. Returns
/// `true` if the cancellation fired.
async fn wait_or_cancel(duration: std::time::Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}

/// Minimal fetcher the caller of `sync_head`/`sync_finalized` composes
/// over. Re-exported here so callers only need one import for the
/// range-sync seam plus the blocks_by_root seam pending-block recovery
/// uses (spec.md §4.8).
pub trait BlockRootFetcher: Send + Sync {
    fn request_blocks_by_root(
        &self,
        peer: PeerId,
        roots: Vec<Hash256>,
    ) -> futures::future::BoxFuture<'_, Result<Vec<p2p::rpc::RpcBlock>, NetError>>;
}
