//! Length-prefixed, optionally snappy-compressed encoding (spec.md §4.9)
//! and the chunk-response framing built on top of it (spec.md §4.6
//! "Chunk framing").

pub mod ssz_snappy;

use crate::config::Encoding;
use crate::rpc::methods::ChunkStatus;
use crate::rpc::protocol::MAX_RPC_SIZE;
use net_types::NetError;

/// Encodes a payload with its length prefix (spec.md §4.9
/// `encode_with_length`).
pub fn encode_with_length(encoding: Encoding, payload: &[u8]) -> Result<Vec<u8>, NetError> {
    let body = match encoding {
        Encoding::Ssz => payload.to_vec(),
        Encoding::SszSnappy => ssz_snappy::compress(payload)?,
    };
    let mut out = Vec::with_capacity(body.len() + 5);
    let mut buf = unsigned_varint::encode::usize_buffer();
    out.extend_from_slice(unsigned_varint::encode::usize(payload.len(), &mut buf));
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decodes a length-prefixed payload, refusing anything whose declared
/// length exceeds either `max` or the global cap (spec.md §4.9
/// `decode_with_length`).
pub fn decode_with_length(
    encoding: Encoding,
    max: usize,
    data: &[u8],
) -> Result<Vec<u8>, NetError> {
    let cap = max.min(MAX_RPC_SIZE);
    let (len, rest) = unsigned_varint::decode::usize(data)
        .map_err(|e| NetError::DecodeFailure(e.to_string()))?;
    if len > cap {
        return Err(NetError::DecodeFailure(format!(
            "declared length {len} exceeds cap {cap}"
        )));
    }
    match encoding {
        Encoding::Ssz => {
            if rest.len() != len {
                return Err(NetError::DecodeFailure("length mismatch".into()));
            }
            Ok(rest.to_vec())
        }
        Encoding::SszSnappy => ssz_snappy::decompress(rest, len),
    }
}

/// Frames one response chunk (spec.md §4.6 "Chunk framing"): a status
/// byte, then on success a length-prefixed encoded body, or on error a
/// length-prefixed UTF-8 reason string.
pub fn frame_chunk(
    encoding: Encoding,
    status: ChunkStatus,
    payload: &[u8],
) -> Result<Vec<u8>, NetError> {
    let mut out = vec![status.to_byte()];
    match status {
        ChunkStatus::Success => {
            if payload.len() > MAX_RPC_SIZE {
                return Err(NetError::InvalidFetchedData);
            }
            out.extend(encode_with_length(encoding, payload)?);
        }
        ChunkStatus::InvalidRequest | ChunkStatus::ServerError => {
            out.extend(encode_with_length(Encoding::Ssz, payload)?);
        }
    }
    Ok(out)
}

/// Parses one response chunk back into its status and decoded body.
pub fn parse_chunk(
    encoding: Encoding,
    max: usize,
    data: &[u8],
) -> Result<(ChunkStatus, Vec<u8>), NetError> {
    let (&status_byte, rest) = data
        .split_first()
        .ok_or_else(|| NetError::DecodeFailure("empty chunk".into()))?;
    let status =
        ChunkStatus::from_byte(status_byte).ok_or_else(|| NetError::DecodeFailure("bad status byte".into()))?;
    let body = match status {
        ChunkStatus::Success => decode_with_length(encoding, max, rest)?,
        ChunkStatus::InvalidRequest | ChunkStatus::ServerError => {
            decode_with_length(Encoding::Ssz, max, rest)?
        }
    };
    Ok((status, body))
}
