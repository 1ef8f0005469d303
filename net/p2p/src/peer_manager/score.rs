//! Weighted-sum peer scoring (spec.md §4.1).
//!
//! The magic numbers below (bad-response threshold, decay counts, the
//! weights combining the block-provider and peer-status axes) are not
//! pinned by spec.md to a canonical source; per spec.md §9's open
//! questions this is treated the same way as the gossip score parameters'
//! inherited gist constants — a documented policy choice, not a derived
//! value. See DESIGN.md.

use net_types::{NetError, Slot};

pub const BAD_RESPONSE_THRESHOLD: u32 = 3;
pub const BAD_PEER_SCORE: f64 = -100.0;
pub const MAX_SCORE: f64 = 100.0;

/// Score contribution per completed batch of blocks served.
const PROCESSED_BATCH_WEIGHT: f64 = 5.0;
/// Relative weight of the block-provider axis in the combined score.
const BLOCK_PROVIDER_WEIGHT: f64 = 1.0;
/// Relative weight of the peer-status axis in the combined score.
const PEER_STATUS_WEIGHT: f64 = 1.0;

/// True for error kinds that permanently disqualify a peer (spec.md §4.1
/// peer-status axis: "a terminal kind, e.g. wrong fork digest").
pub fn is_terminal(err: &NetError) -> bool {
    matches!(err, NetError::WrongForkDigest)
}

pub struct ScoreAxes {
    pub bad_responses: u32,
    pub processed_batches: u64,
    pub head_slot: Option<Slot>,
    pub max_known_head_slot: Slot,
    pub local_head_slot: Slot,
    pub last_error_terminal: bool,
}

/// Combines the block-provider and peer-status axes into a single score,
/// rounded to 4 decimal digits. The bad-responses axis and terminal
/// validation errors are handled by `PeerDb::score`'s short-circuit before
/// this is reached in the bad case, but are re-checked here defensively so
/// this function is correct in isolation (e.g. for tests that construct
/// `ScoreAxes` directly).
pub fn combine(axes: ScoreAxes) -> f64 {
    if axes.bad_responses >= BAD_RESPONSE_THRESHOLD || axes.last_error_terminal {
        return BAD_PEER_SCORE;
    }

    let block_provider_score = if axes.processed_batches == 0 {
        MAX_SCORE
    } else {
        axes.processed_batches as f64 * PROCESSED_BATCH_WEIGHT
    };

    let peer_status_score = match axes.head_slot {
        None => 0.0,
        Some(head_slot) => {
            if head_slot < axes.local_head_slot || axes.max_known_head_slot.as_u64() == 0 {
                0.0
            } else {
                (head_slot.as_u64() as f64 / axes.max_known_head_slot.as_u64() as f64) * MAX_SCORE
            }
        }
    };

    let combined =
        BLOCK_PROVIDER_WEIGHT * block_provider_score + PEER_STATUS_WEIGHT * peer_status_score;
    round4(combined)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_responses_short_circuit() {
        let axes = ScoreAxes {
            bad_responses: 3,
            processed_batches: 50,
            head_slot: Some(Slot::new(100)),
            max_known_head_slot: Slot::new(100),
            local_head_slot: Slot::new(0),
            last_error_terminal: false,
        };
        assert_eq!(combine(axes), BAD_PEER_SCORE);
    }

    #[test]
    fn lagging_peer_gets_zero_status_component() {
        let axes = ScoreAxes {
            bad_responses: 0,
            processed_batches: 1,
            head_slot: Some(Slot::new(5)),
            max_known_head_slot: Slot::new(100),
            local_head_slot: Slot::new(10),
            last_error_terminal: false,
        };
        assert_eq!(combine(axes), round4(PROCESSED_BATCH_WEIGHT));
    }

    #[test]
    fn rounds_to_four_decimals() {
        assert_eq!(round4(1.0 / 3.0), 0.3333);
    }
}
