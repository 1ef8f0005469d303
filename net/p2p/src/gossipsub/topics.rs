//! Gossip topic structure and the finite set of recognised message kinds
//! (spec.md §3 "Gossip topic").
//!
//! Replaces "dynamic-type gossip message dispatch via reflection" (spec.md
//! §9 redesign note) with a tagged union over a constant topic-kind table;
//! `GossipKind::parse` is the one place topic strings become typed kinds.

use net_types::{ForkDigest, SubnetId, ATTESTATION_SUBNET_COUNT};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GossipKind {
    BeaconBlock,
    BeaconAggregateAndProof,
    BeaconAttestation(SubnetId),
    VoluntaryExit,
    ProposerSlashing,
    AttesterSlashing,
}

impl GossipKind {
    /// Parses the single middle topic-kind segment of a topic string
    /// (spec.md §4.4 rules 2 and 6). The subnet index for per-committee
    /// attestation topics is embedded in that one segment as
    /// `beacon_attestation_<index>`, which is what keeps the overall
    /// topic at exactly 5 `/`-separated parts per rule 2 — it is not a
    /// separate path segment.
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "beacon_block" => Some(GossipKind::BeaconBlock),
            "beacon_aggregate_and_proof" => Some(GossipKind::BeaconAggregateAndProof),
            "voluntary_exit" => Some(GossipKind::VoluntaryExit),
            "proposer_slashing" => Some(GossipKind::ProposerSlashing),
            "attester_slashing" => Some(GossipKind::AttesterSlashing),
            other => {
                let idx = other.strip_prefix("beacon_attestation_")?;
                let idx: u64 = idx.parse().ok()?;
                if idx < ATTESTATION_SUBNET_COUNT {
                    Some(GossipKind::BeaconAttestation(SubnetId::new(idx)))
                } else {
                    None
                }
            }
        }
    }

    pub fn segment(&self) -> String {
        match self {
            GossipKind::BeaconBlock => "beacon_block".to_string(),
            GossipKind::BeaconAggregateAndProof => "beacon_aggregate_and_proof".to_string(),
            GossipKind::VoluntaryExit => "voluntary_exit".to_string(),
            GossipKind::ProposerSlashing => "proposer_slashing".to_string(),
            GossipKind::AttesterSlashing => "attester_slashing".to_string(),
            GossipKind::BeaconAttestation(subnet) => format!("beacon_attestation_{}", subnet.0),
        }
    }
}

/// A fully-qualified gossip topic (spec.md §3):
/// `/eth2/<fork-digest-hex>/<topic-kind>[/<subnet-index>]/<encoding-suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GossipTopic {
    pub fork_digest: ForkDigest,
    pub kind: GossipKind,
    pub encoding_suffix: String,
}

impl fmt::Display for GossipTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/eth2/{}/{}/{}",
            self.fork_digest.to_hex(),
            self.kind.segment(),
            self.encoding_suffix
        )
    }
}

impl GossipTopic {
    /// Parses a raw topic string without regard to which fork digests are
    /// currently acceptable — that policy lives in `subscription_filter`.
    pub fn parse(topic: &str) -> Option<Self> {
        // Must start with '/', giving a leading empty segment.
        if !topic.starts_with('/') {
            return None;
        }
        let parts: Vec<&str> = topic.split('/').collect();
        // ["", "eth2", <digest>, <kind...>, <encoding>]
        if parts.len() != 5 {
            return None;
        }
        if !parts[0].is_empty() || parts[1] != "eth2" {
            return None;
        }
        let fork_digest = ForkDigest::from_hex(parts[2])?;
        let kind = GossipKind::parse(parts[3])?;
        let encoding_suffix = parts[4].to_string();
        Some(GossipTopic {
            fork_digest,
            kind,
            encoding_suffix,
        })
    }
}
