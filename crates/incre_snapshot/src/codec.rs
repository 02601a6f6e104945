//! Framed, versioned byte format for persisted state.
//!
//! Layout: 4 magic bytes, a 4-byte little-endian header length, a bincode
//! header (format version, kind tag, payload checksum), then the bincode
//! payload. Any mismatch decodes to a [`CorruptStateError`] so an old or
//! damaged state file degrades to "no previous state" instead of being misread.

use incre_common::{ContentHash, IncreResult, InternalError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CorruptStateError;

/// Magic bytes identifying persisted incremental state.
const STATE_MAGIC: [u8; 4] = *b"INCR";

/// Current state format version. Increment on breaking changes to the header
/// or to any persisted payload type.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Bytes before the header: magic plus header length.
const PREFIX_LEN: usize = 8;

/// Header written in front of every payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateHeader {
    format_version: u32,
    kind: String,
    checksum: ContentHash,
}

/// Encodes `value` under the given kind tag.
///
/// Failing to encode one of this crate's own types is a bug, hence
/// [`InternalError`].
pub fn encode<S: Serialize>(kind: &str, value: &S) -> IncreResult<Vec<u8>> {
    let config = bincode::config::standard();
    let payload = bincode::serde::encode_to_vec(value, config)
        .map_err(|e| InternalError::new(format!("failed to encode '{kind}' state: {e}")))?;

    let header = StateHeader {
        format_version: STATE_FORMAT_VERSION,
        kind: kind.to_string(),
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, config)
        .map_err(|e| InternalError::new(format!("failed to encode state header: {e}")))?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| InternalError::new("state header does not fit a u32 length"))?;

    let mut output = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + payload.len());
    output.extend_from_slice(&STATE_MAGIC);
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decodes a value previously written by [`encode`] with the same kind tag.
pub fn decode<S: DeserializeOwned>(kind: &str, bytes: &[u8]) -> Result<S, CorruptStateError> {
    if bytes.len() < PREFIX_LEN {
        return Err(CorruptStateError::Truncated { len: bytes.len() });
    }
    if bytes[..4] != STATE_MAGIC {
        return Err(CorruptStateError::BadMagic);
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[4..PREFIX_LEN]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let payload_start = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| *end <= bytes.len())
        .ok_or(CorruptStateError::Truncated { len: bytes.len() })?;

    let config = bincode::config::standard();
    let (header, _): (StateHeader, usize) =
        bincode::serde::decode_from_slice(&bytes[PREFIX_LEN..payload_start], config).map_err(
            |e| CorruptStateError::Decode {
                reason: format!("header: {e}"),
            },
        )?;

    if header.format_version != STATE_FORMAT_VERSION {
        return Err(CorruptStateError::VersionMismatch {
            expected: STATE_FORMAT_VERSION,
            actual: header.format_version,
        });
    }
    if header.kind != kind {
        return Err(CorruptStateError::KindMismatch {
            expected: kind.to_string(),
            actual: header.kind,
        });
    }

    let payload = &bytes[payload_start..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CorruptStateError::ChecksumMismatch {
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let (value, consumed): (S, usize) = bincode::serde::decode_from_slice(payload, config)
        .map_err(|e| CorruptStateError::Decode {
            reason: e.to_string(),
        })?;
    if consumed != payload.len() {
        return Err(CorruptStateError::TrailingBytes {
            count: payload.len() - consumed,
        });
    }
    Ok(value)
}
