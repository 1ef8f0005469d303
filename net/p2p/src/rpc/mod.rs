//! Request/response RPC: status, goodbye, blocks-by-range, blocks-by-root,
//! chunk framing, and rate limiting (spec.md §4.6).

pub mod codec;
pub mod methods;
pub mod protocol;
pub mod rate_limiter;

pub use methods::{BlocksByRangeRequest, BlocksByRootRequest, ChunkStatus, RpcBlock, StatusMessage};
pub use protocol::Protocol;
pub use rate_limiter::RateLimiter;

use net_types::{ChainState, Epoch, NetError, Slot};

/// Validates a received Status handshake payload (spec.md §4.6 `status`,
/// §8 boundary behavior: `finalized_epoch == current_epoch - 1` accepted,
/// `== current_epoch` rejected).
pub fn validate_status(
    remote: &ChainState,
    our_fork_version: net_types::ForkVersion,
    current_epoch: Epoch,
) -> Result<(), NetError> {
    if remote.fork_version != our_fork_version {
        return Err(NetError::WrongForkDigest);
    }
    // The maximum possible finalized epoch "for the current time" is the
    // epoch strictly before the current one: a just-started current
    // epoch cannot yet be finalized.
    let max_possible = if current_epoch.as_u64() == 0 {
        Epoch::new(0)
    } else {
        current_epoch - 1
    };
    if remote.finalized_epoch > max_possible {
        return Err(NetError::InvalidEpoch);
    }
    Ok(())
}

/// A `blocks_by_range` request with `count == 0` must be refused locally
/// before any network I/O (spec.md §8 boundary behavior).
pub fn validate_request_count(count: u64) -> Result<(), NetError> {
    if count == 0 {
        Err(NetError::StepError)
    } else {
        Ok(())
    }
}
