//! RPC protocol identifiers and stream deadlines (spec.md §4.6).

use crate::config::Encoding;
use std::time::Duration;

/// Maximum allowed body length for a single chunk (spec.md §4.6, §4.9).
pub const MAX_RPC_SIZE: usize = 1024 * 1024;

pub const TTFB_TIMEOUT: Duration = Duration::from_secs(5);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Status,
    Goodbye,
    BlocksByRange,
    BlocksByRoot,
}

impl Protocol {
    fn name(&self) -> &'static str {
        match self {
            Protocol::Status => "status",
            Protocol::Goodbye => "goodbye",
            Protocol::BlocksByRange => "beacon_blocks_by_range",
            Protocol::BlocksByRoot => "beacon_blocks_by_root",
        }
    }

    /// `/eth2/beacon_chain/req/<name>/1/<encoding-suffix>` (spec.md §4.6).
    pub fn protocol_id(&self, encoding: Encoding) -> String {
        format!(
            "/eth2/beacon_chain/req/{}/1/{}",
            self.name(),
            encoding.protocol_suffix()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_id_format() {
        assert_eq!(
            Protocol::Status.protocol_id(Encoding::SszSnappy),
            "/eth2/beacon_chain/req/status/1/ssz_snappy"
        );
        assert_eq!(
            Protocol::BlocksByRange.protocol_id(Encoding::Ssz),
            "/eth2/beacon_chain/req/beacon_blocks_by_range/1/ssz"
        );
    }
}
