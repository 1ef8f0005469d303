//! SSZ+snappy body compression (spec.md §4.9 `ssz_snappy`).
//!
//! SSZ serialization itself is the external crypto/SSZ collaborator's
//! concern (spec.md §6.2); this module only wraps the already-serialized
//! bytes in a snappy frame, the way the teacher's RPC codec layers
//! `snap::raw::{Encoder, Decoder}` under its SSZ (de)serialization.

use net_types::NetError;
use snap::raw::{Decoder, Encoder};

pub fn compress(data: &[u8]) -> Result<Vec<u8>, NetError> {
    Encoder::new()
        .compress_vec(data)
        .map_err(|e| NetError::DecodeFailure(e.to_string()))
}

/// `expected_len` is the declared uncompressed length from the varint
/// prefix; used to pre-size the output buffer and as a sanity check.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>, NetError> {
    let mut decoder = Decoder::new();
    let decompressed = decoder
        .decompress_vec(data)
        .map_err(|e| NetError::DecodeFailure(e.to_string()))?;
    if decompressed.len() != expected_len {
        return Err(NetError::DecodeFailure(
            "decompressed length mismatch".into(),
        ));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = vec![7u8; 4096];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }
}
