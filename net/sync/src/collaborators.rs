//! External collaborator contracts (spec.md §6.2).
//!
//! Everything in this module is a trait: the state transition, fork
//! choice, block database and attestation pool are explicitly out of
//! scope (spec.md §1) and are consumed here only as black boxes. Grounded
//! on the teacher's pattern of depending on `BeaconChainTypes: EthSpec`
//! associated-type bundles rather than concrete structs, so the sync
//! engine and pending-queue processor can be unit tested against fakes.

use net_types::{Epoch, ForkVersion, Hash256, NetError, Slot};
use p2p::rpc::RpcBlock;

/// A minimal attestation representation: enough to route it through the
/// pending-attestation queue and the dedup pipeline. Full attestation
/// validation lives in the external state-transition collaborator.
#[derive(Debug, Clone)]
pub struct Attestation {
    pub beacon_block_root: Hash256,
    pub body: Vec<u8>,
    pub aggregated: bool,
}

/// `receive_block` — called synchronously by the sync engine and the
/// pending-queue processor (spec.md §6.2).
pub trait BlockReceiver: Send + Sync {
    fn receive_block(&self, block: &RpcBlock) -> Result<(), NetError>;
}

/// Read-only view of local chain progress (spec.md §6.2 `Head-fetcher`).
pub trait HeadFetcher: Send + Sync {
    fn head_slot(&self) -> Slot;
    fn head_root(&self) -> Hash256;
    fn finalized_checkpoint(&self) -> (Hash256, Epoch);
    fn current_fork_version(&self) -> ForkVersion;
    fn genesis_time(&self) -> u64;
    fn genesis_validators_root(&self) -> Hash256;
}

/// Read-only block/state existence checks (spec.md §6.2 `Block-db`).
pub trait BlockDb: Send + Sync {
    fn has_block(&self, root: &Hash256) -> bool;
    fn has_state(&self, root: &Hash256) -> bool;
}

/// Aggregated/unaggregated attestation storage (spec.md §6.2
/// `Attestation-pool`).
pub trait AttestationPool: Send + Sync {
    fn has_aggregated(&self, att: &Attestation) -> bool;
    fn save_aggregated(&self, att: Attestation);
    fn save_unaggregated(&self, att: Attestation);
}

/// Re-injects a flushed attestation through the same validation pipeline
/// used for gossip, without rebroadcast (spec.md §4.8 "Pending
/// attestations").
pub trait AttestationValidator: Send + Sync {
    fn validate_and_import(&self, att: Attestation) -> Result<(), NetError>;
}
