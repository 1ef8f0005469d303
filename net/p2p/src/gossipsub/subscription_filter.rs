//! Topic subscribability and incoming-subscription filtering (spec.md
//! §4.4).
//!
//! Grounded on the teacher's gossipsub subscription-filter pattern
//! (`beacon_node/lighthouse_network/gossipsub` workspace member): a small
//! stateful filter initialised exactly once by a state-feed event, after
//! which every subsequent call is a pure function of (current digest,
//! previous digest, topic).

use super::topics::GossipTopic;
use net_types::{ForkDigest, Hash256, NetError};

/// A single `Initialized` event from the external state-feed collaborator
/// (spec.md §6.2), carrying what's needed to derive both fork digests.
#[derive(Debug, Clone, Copy)]
pub struct Initialized {
    pub start_time: u64,
    pub genesis_validators_root: Hash256,
}

/// Computes the current and previous fork digests at initialization time.
/// This is a thin seam over the external crypto collaborator's
/// fork-digest computation (spec.md §6.2); the real computation
/// (`hash(fork_version ++ genesis_validators_root)[..4]`) lives outside
/// this core's scope.
pub trait ForkDigestComputer: Send + Sync {
    fn current_fork_digest(&self, genesis_validators_root: Hash256, start_time: u64)
        -> ForkDigest;
    fn previous_fork_digest(
        &self,
        genesis_validators_root: Hash256,
        start_time: u64,
    ) -> Option<ForkDigest>;
}

const MAX_SUBSCRIPTIONS_PER_REQUEST: usize = 100;
const ENCODING_SUFFIX: &str = "ssz_snappy";

/// The subscription filter, uninitialized until the state-feed publishes
/// `Initialized` exactly once (spec.md §4.4, §9 "feed subscribers"
/// redesign note: consume one event then stop listening).
pub struct SubscriptionFilter {
    digests: Option<(ForkDigest, Option<ForkDigest>)>,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionFilter {
    pub fn new() -> Self {
        Self { digests: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.digests.is_some()
    }

    /// Consumes the one `Initialized` event this filter will ever see.
    pub fn initialize(&mut self, event: Initialized, computer: &dyn ForkDigestComputer) {
        let current =
            computer.current_fork_digest(event.genesis_validators_root, event.start_time);
        let previous =
            computer.previous_fork_digest(event.genesis_validators_root, event.start_time);
        self.digests = Some((current, previous));
    }

    /// True iff `topic` is subscribable right now (spec.md §4.4
    /// `can_subscribe`).
    pub fn can_subscribe(&self, topic: &str) -> bool {
        let Some((current, previous)) = self.digests else {
            return false;
        };
        let Some(parsed) = GossipTopic::parse(topic) else {
            return false;
        };
        if parsed.encoding_suffix != ENCODING_SUFFIX {
            return false;
        }
        parsed.fork_digest == current || Some(parsed.fork_digest) == previous
    }

    /// Deduplicates (preserving first occurrence) and validates an
    /// incoming subscription-RPC's topic list (spec.md §4.4
    /// `filter_incoming_subscriptions`).
    pub fn filter_incoming_subscriptions(
        &self,
        subscriptions: &[String],
    ) -> Result<Vec<String>, NetError> {
        if subscriptions.len() > MAX_SUBSCRIPTIONS_PER_REQUEST {
            return Err(NetError::DecodeFailure("too many subscriptions".into()));
        }
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for topic in subscriptions {
            if !self.can_subscribe(topic) {
                continue;
            }
            if seen.insert(topic.clone()) {
                out.push(topic.clone());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDigests {
        current: ForkDigest,
        previous: Option<ForkDigest>,
    }

    impl ForkDigestComputer for FixedDigests {
        fn current_fork_digest(&self, _: Hash256, _: u64) -> ForkDigest {
            self.current
        }
        fn previous_fork_digest(&self, _: Hash256, _: u64) -> Option<ForkDigest> {
            self.previous
        }
    }

    fn initialized_filter(current: [u8; 4], previous: Option<[u8; 4]>) -> SubscriptionFilter {
        let mut filter = SubscriptionFilter::new();
        let computer = FixedDigests {
            current: ForkDigest(current),
            previous: previous.map(ForkDigest),
        };
        filter.initialize(
            Initialized {
                start_time: 0,
                genesis_validators_root: Hash256::zero(),
            },
            &computer,
        );
        filter
    }

    #[test]
    fn uninitialized_rejects_everything() {
        let filter = SubscriptionFilter::new();
        assert!(!filter.can_subscribe("/eth2/01020304/beacon_block/ssz_snappy"));
    }

    #[test]
    fn accepts_current_digest_block_topic() {
        let filter = initialized_filter([1, 2, 3, 4], None);
        assert!(filter.can_subscribe("/eth2/01020304/beacon_block/ssz_snappy"));
    }

    #[test]
    fn accepts_previous_digest_in_grace_window() {
        let filter = initialized_filter([1, 2, 3, 4], Some([5, 6, 7, 8]));
        assert!(filter.can_subscribe("/eth2/05060708/beacon_block/ssz_snappy"));
    }

    #[test]
    fn rejects_two_digests_back() {
        // Only current/previous are ever tracked; anything else is unknown
        // to the filter and therefore rejected.
        let filter = initialized_filter([1, 2, 3, 4], Some([5, 6, 7, 8]));
        assert!(!filter.can_subscribe("/eth2/090a0b0c/beacon_block/ssz_snappy"));
    }

    #[test]
    fn rejects_wrong_encoding() {
        let filter = initialized_filter([1, 2, 3, 4], None);
        assert!(!filter.can_subscribe("/eth2/01020304/beacon_block/ssz"));
    }

    #[test]
    fn rejects_malformed_topic() {
        let filter = initialized_filter([1, 2, 3, 4], None);
        assert!(!filter.can_subscribe("/eth2/01020304/beacon_block/extra/ssz_snappy"));
        assert!(!filter.can_subscribe("not-a-topic"));
    }

    #[test]
    fn accepts_subnet_in_range() {
        let filter = initialized_filter([1, 2, 3, 4], None);
        assert!(filter.can_subscribe("/eth2/01020304/beacon_attestation_63/ssz_snappy"));
        assert!(!filter.can_subscribe("/eth2/01020304/beacon_attestation_64/ssz_snappy"));
    }

    #[test]
    fn dedups_preserving_first() {
        let filter = initialized_filter([1, 2, 3, 4], None);
        let subs = vec![
            "/eth2/01020304/beacon_block/ssz_snappy".to_string(),
            "/eth2/01020304/beacon_block/ssz_snappy".to_string(),
            "/eth2/01020304/voluntary_exit/ssz_snappy".to_string(),
        ];
        let result = filter.filter_incoming_subscriptions(&subs).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn rejects_too_many_subscriptions() {
        let filter = initialized_filter([1, 2, 3, 4], None);
        let subs: Vec<String> = (0..101)
            .map(|_| "/eth2/01020304/beacon_block/ssz_snappy".to_string())
            .collect();
        assert!(filter.filter_incoming_subscriptions(&subs).is_err());
    }
}
