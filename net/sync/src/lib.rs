//! Initial-sync engine, pending queues and peer-status maintenance
//! (spec.md §4.7, §4.8, §4.10).
//!
//! Consumes `p2p` for peer scoring, rate limiting and wire types, and
//! depends on the state-transition / block-db / fork-choice collaborators
//! only through the traits in `collaborators` (spec.md §6.2).

pub mod collaborators;
pub mod manager;
pub mod pending_attestations;
pub mod pending_blocks;
pub mod range_sync;
pub mod status;

pub use collaborators::{
    Attestation, AttestationPool, AttestationValidator, BlockDb, BlockReceiver, HeadFetcher,
};
pub use manager::{Collaborators, Status, SyncManager};
