//! The score-decay timer (spec.md §9 "Background decay timer... a single
//! timer task per scorer instance, cancellable by the root context").
//!
//! One `PeerDb` gets exactly one decay loop; running two would double the
//! decay rate against the documented cadences in `config::intervals`. Both
//! axes decay on that single timer, ticking at the finer
//! `BLOCK_PROVIDER_DECAY` cadence; the coarser `BAD_RESPONSE_DECAY` axis
//! fires every `BAD_RESPONSE_DECAY / BLOCK_PROVIDER_DECAY`-th tick.

use super::peerdb::PeerDb;
use crate::config::intervals;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(peer_db: Arc<PeerDb>, cancel: CancellationToken) {
    let ticks_per_bad_response_decay = (intervals::BAD_RESPONSE_DECAY.as_secs()
        / intervals::BLOCK_PROVIDER_DECAY.as_secs())
    .max(1);
    let mut ticker = tokio::time::interval(intervals::BLOCK_PROVIDER_DECAY);
    let mut tick_count: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                peer_db.decay_block_provider();
                tick_count += 1;
                if tick_count % ticks_per_bad_response_decay == 0 {
                    peer_db.decay_bad_responses();
                }
            }
            _ = cancel.cancelled() => return,
        }
    }
}
