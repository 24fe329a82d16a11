//! Region log record format
//!
//! ```text
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Payload          | (JSON-encoded LogEntry)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of payload)
//! +------------------+
//! ```
//!
//! A record cut short at the end of the file is a torn tail left by a crash
//! during append. A complete record whose checksum does not match is
//! corruption.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Fixed bytes around every payload (length prefix + checksum).
pub const RECORD_OVERHEAD: usize = 8;

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum LogEntry<K, V> {
    Put { key: K, value: V },
    Delete { key: K },
}

/// Computes a CRC32 (IEEE) checksum over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Payload longer than the length prefix can describe.
#[derive(Debug, PartialEq, Eq)]
pub struct PayloadTooLarge {
    pub len: usize,
}

fn length_prefix(len: usize) -> Result<u32, PayloadTooLarge> {
    u32::try_from(len).map_err(|_| PayloadTooLarge { len })
}

/// Frames a payload as a complete record.
pub fn encode_record(payload: &[u8]) -> Result<Vec<u8>, PayloadTooLarge> {
    let prefix = length_prefix(payload.len())?;
    let mut out = Vec::with_capacity(payload.len() + RECORD_OVERHEAD);
    out.extend_from_slice(&prefix.to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&compute_checksum(payload).to_le_bytes());
    Ok(out)
}

/// Result of decoding the record starting at a given offset.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// A verified payload and the offset of the following record
    Record { payload: &'a [u8], next: usize },
    /// Fewer bytes remain than the record needs
    TornTail,
    /// Clean end of log
    End,
}

/// Checksum mismatch on a complete record.
#[derive(Debug, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub expected: u32,
    pub actual: u32,
}

/// Decodes the record at `offset` in `buf`.
pub fn decode_record(buf: &[u8], offset: usize) -> Result<Decoded<'_>, ChecksumMismatch> {
    let remaining = buf.len().saturating_sub(offset);
    if remaining == 0 {
        return Ok(Decoded::End);
    }
    if remaining < 4 {
        return Ok(Decoded::TornTail);
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&buf[offset..offset + 4]);
    let payload_len = u32::from_le_bytes(len_bytes) as usize;

    if remaining < payload_len.saturating_add(RECORD_OVERHEAD) {
        return Ok(Decoded::TornTail);
    }

    let payload_start = offset + 4;
    let payload_end = payload_start + payload_len;
    let payload = &buf[payload_start..payload_end];

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&buf[payload_end..payload_end + 4]);
    let expected = u32::from_le_bytes(crc_bytes);
    let actual = compute_checksum(payload);
    if expected != actual {
        return Err(ChecksumMismatch { expected, actual });
    }

    Ok(Decoded::Record {
        payload,
        next: payload_end + 4,
    })
}
