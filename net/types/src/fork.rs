use serde::{Deserialize, Serialize};

/// The four-byte current-fork version, set by chain configuration and
/// bumped at each scheduled upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ForkVersion(pub [u8; 4]);

/// A 4-byte fork digest: `hash(fork_version ++ genesis_validators_root)[..4]`.
/// Two peers are gossip/RPC-compatible iff their current digests are equal
/// (spec.md §3 "Fork digest").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ForkDigest(pub [u8; 4]);

impl ForkDigest {
    /// Lowercase hex without a `0x` prefix, matching the representation
    /// embedded in gossip topic strings (spec.md §4.4 rule 4).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 4] = bytes.try_into().ok()?;
        Some(ForkDigest(arr))
    }
}

impl std::fmt::Display for ForkDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
