//! Request/response payload types (spec.md §4.6) and the validation rules
//! applied to a `blocks_by_range` response by its receiver.

use net_types::{ChainState, Hash256, NetError, Slot};

/// Exchanged on every connection and periodically thereafter (spec.md §3,
/// §4.6 `status`).
pub type StatusMessage = ChainState;

/// `blocks_by_range` request (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlocksByRangeRequest {
    pub head_block_root: Hash256,
    pub start_slot: Slot,
    pub step: u64,
    pub count: u64,
}

impl BlocksByRangeRequest {
    /// The highest slot that can legally appear in a response to this
    /// request (spec.md §4.6, §8 boundary behavior).
    pub fn max_slot(&self) -> Slot {
        self.start_slot + self.step.saturating_mul(self.count.saturating_sub(1))
    }
}

/// `blocks_by_root` request: a list of block roots (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlocksByRootRequest {
    pub roots: Vec<Hash256>,
}

/// One byte status code prefixing every RPC response chunk (spec.md
/// §4.6 "Chunk framing").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Success = 0,
    InvalidRequest = 1,
    ServerError = 2,
}

impl ChunkStatus {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ChunkStatus::Success),
            1 => Some(ChunkStatus::InvalidRequest),
            2 => Some(ChunkStatus::ServerError),
            _ => None,
        }
    }
}

/// Minimal block representation this core needs: just enough to validate
/// ordering against a request. The actual block body is opaque bytes
/// handed unmodified to the `BlockReceiver` collaborator (spec.md §6.2).
#[derive(Debug, Clone)]
pub struct RpcBlock {
    pub slot: Slot,
    pub parent_root: Hash256,
    pub root: Hash256,
    pub body: Vec<u8>,
}

/// Validates a `blocks_by_range` response against its originating
/// request, chunk by chunk, as the receiver must (spec.md §4.6
/// "Received-block validation", §8 invariants).
///
/// `previous_slot` is the slot of the last chunk already accepted for
/// this response (`None` before the first chunk).
pub fn validate_chunk(
    request: &BlocksByRangeRequest,
    previous_slot: Option<Slot>,
    chunk_index: u64,
    block: &RpcBlock,
) -> Result<(), NetError> {
    if chunk_index >= request.count {
        return Err(NetError::InvalidFetchedData);
    }
    if let Some(prev) = previous_slot {
        if block.slot <= prev {
            return Err(NetError::InvalidFetchedData);
        }
    }
    if block.slot < request.start_slot {
        return Err(NetError::InvalidFetchedData);
    }
    let offset = block.slot - request.start_slot;
    if request.step == 0 || offset % request.step != 0 {
        return Err(NetError::InvalidFetchedData);
    }
    if block.slot > request.max_slot() {
        return Err(NetError::InvalidFetchedData);
    }
    Ok(())
}
