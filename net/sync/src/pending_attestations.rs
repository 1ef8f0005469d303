//! Pending attestation queue, indexed by the beacon-block root they
//! reference (spec.md §4.8 "Pending attestations").
//!
//! When a block's bucket is flushed the attestations are reinjected
//! through the same validation pipeline used for gossip, but without
//! rebroadcast — modelled here as the [`AttestationValidator`]
//! collaborator, so this queue stays agnostic to how gossip
//! re-publication is avoided downstream.

use crate::collaborators::{Attestation, AttestationValidator};
use net_types::Hash256;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct PendingAttestations {
    buckets: Mutex<HashMap<Hash256, Vec<Attestation>>>,
}

impl PendingAttestations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, att: Attestation) {
        self.buckets
            .lock()
            .entry(att.beacon_block_root)
            .or_default()
            .push(att);
    }

    pub fn len(&self) -> usize {
        self.buckets.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes and reinjects every attestation waiting on `block_root`,
    /// called once the pending-block queue delivers that block (spec.md
    /// §4.8).
    pub fn flush(&self, block_root: &Hash256, validator: &dyn AttestationValidator, log: &slog::Logger) {
        let bucket = self.buckets.lock().remove(block_root).unwrap_or_default();
        for att in bucket {
            if let Err(err) = validator.validate_and_import(att) {
                slog::debug!(log, "reinjected attestation failed validation";
                    "block_root" => %block_root, "error" => %err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_types::NetError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn attestation(root: Hash256) -> Attestation {
        Attestation {
            beacon_block_root: root,
            body: vec![],
            aggregated: false,
        }
    }

    struct CountingValidator {
        imported: AtomicUsize,
    }
    impl AttestationValidator for CountingValidator {
        fn validate_and_import(&self, _att: Attestation) -> Result<(), NetError> {
            self.imported.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn buckets_by_block_root_and_flushes_only_that_bucket() {
        let queue = PendingAttestations::new();
        let root_a = Hash256([1; 32]);
        let root_b = Hash256([2; 32]);
        queue.insert(attestation(root_a));
        queue.insert(attestation(root_a));
        queue.insert(attestation(root_b));
        assert_eq!(queue.len(), 3);

        let validator = CountingValidator {
            imported: AtomicUsize::new(0),
        };
        queue.flush(&root_a, &validator, &test_logger());
        assert_eq!(validator.imported.load(Ordering::SeqCst), 2);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn flushing_unknown_root_is_a_no_op() {
        let queue = PendingAttestations::new();
        let validator = CountingValidator {
            imported: AtomicUsize::new(0),
        };
        queue.flush(&Hash256::zero(), &validator, &test_logger());
        assert_eq!(validator.imported.load(Ordering::SeqCst), 0);
    }
}
