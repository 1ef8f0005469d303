//! Slot striping for the round-robin batch fetcher (spec.md §4.7 step 3).
//!
//! Given `n` peers and a contiguous slot range, bucket `i` gets every
//! `n`-th slot starting at `base + i`: exactly the `start = base + i, step
//! = n, count = floor(range/n) (+1 for the first `range mod n` peers)`
//! rule, expressed as index-modulo bucketing so fail-over can re-stripe an
//! arbitrary (non-contiguous) residual slot set the same way.

use net_types::{PeerId, Slot};

/// One peer's share of a batch: a strictly increasing, evenly-spaced
/// sequence of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub peer: PeerId,
    pub start: Slot,
    pub step: u64,
    pub count: u64,
}

/// Buckets `slots` round-robin across `peers`, skipping any peer whose
/// resulting share would be empty (spec.md §4.7: "count is clamped to ≥
/// 1; if the computed count equals 0 the peer is skipped").
///
/// When `slots` is itself a contiguous ascending range this reproduces
/// the `start = base + i, step = n` formula exactly, because bucket `i`
/// collects `slots[i], slots[i + n], slots[i + 2n], ...`.
pub fn stripe(slots: &[Slot], peers: &[PeerId]) -> Vec<Share> {
    let n = peers.len();
    if n == 0 || slots.is_empty() {
        return Vec::new();
    }
    let mut buckets: Vec<Vec<Slot>> = vec![Vec::new(); n];
    for (idx, slot) in slots.iter().enumerate() {
        buckets[idx % n].push(*slot);
    }
    peers
        .iter()
        .zip(buckets.into_iter())
        .filter_map(|(peer, bucket)| {
            if bucket.is_empty() {
                return None;
            }
            let start = bucket[0];
            let step = if bucket.len() > 1 {
                bucket[1] - bucket[0]
            } else {
                n as u64
            };
            Some(Share {
                peer: peer.clone(),
                start,
                step,
                count: bucket.len() as u64,
            })
        })
        .collect()
}

/// The explicit slot list a `Share` covers, in ascending order.
pub fn share_slots(share: &Share) -> Vec<Slot> {
    (0..share.count)
        .map(|i| share.start + i * share.step)
        .collect()
}
