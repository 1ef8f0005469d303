use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque peer identifier, derived from a peer's public key (spec.md §3).
///
/// The networking core treats this as opaque bytes; the host transport
/// library (libp2p in the teacher's stack) is responsible for deriving it
/// from a multihash of the peer's public key and for everything related to
/// dialing the underlying multiaddress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        PeerId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Builds a random peer id. Only ever used by tests and the bootstrap
    /// identity generator; production peer ids come from the transport's
    /// handshake.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut buf = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut buf);
        PeerId(buf.to_vec())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}
