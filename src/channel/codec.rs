//! Record file encoding
//!
//! Each record file holds exactly one encoded envelope:
//!
//! ```text
//! +------------------+
//! | Magic "MRKV"     | (4 bytes)
//! +------------------+
//! | Format Version   | (u8)
//! +------------------+
//! | Body Length      | (u32 LE)
//! +------------------+
//! | Body             | (JSON-encoded envelope)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum is CRC32 (IEEE) over all bytes except the checksum itself.

use super::envelope::Envelope;
use super::errors::{ChannelError, ChannelResult};

/// File magic for record files.
pub const RECORD_MAGIC: [u8; 4] = *b"MRKV";

/// Current record format version.
pub const FORMAT_VERSION: u8 = 1;

const HEADER_SIZE: usize = 4 + 1 + 4;
const CHECKSUM_SIZE: usize = 4;

/// Encoder/decoder for record envelopes.
pub struct RecordCodec;

impl RecordCodec {
    /// Encode an envelope into a framed, checksummed buffer.
    pub fn encode(envelope: &Envelope) -> ChannelResult<Vec<u8>> {
        let body = serde_json::to_vec(envelope).map_err(|e| {
            ChannelError::invalid_input(format!("Envelope is not encodable: {}", e))
        })?;
        let body_len = u32::try_from(body.len()).map_err(|_| {
            ChannelError::invalid_input(format!("Envelope too large: {} bytes", body.len()))
        })?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + body.len() + CHECKSUM_SIZE);
        buf.extend_from_slice(&RECORD_MAGIC);
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&body);

        let checksum = crc32fast::hash(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());

        Ok(buf)
    }

    /// Decode and verify a framed envelope.
    pub fn decode(data: &[u8]) -> ChannelResult<Envelope> {
        if data.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(ChannelError::data_corruption(format!(
                "Record too short: {} bytes",
                data.len()
            )));
        }

        if data[0..4] != RECORD_MAGIC {
            return Err(ChannelError::data_corruption("Bad record magic"));
        }

        if data[4] != FORMAT_VERSION {
            return Err(ChannelError::data_corruption(format!(
                "Unknown record format version: {}",
                data[4]
            )));
        }

        let body_len = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;
        let expected_len = HEADER_SIZE + body_len + CHECKSUM_SIZE;
        if data.len() != expected_len {
            return Err(ChannelError::data_corruption(format!(
                "Record length mismatch: expected {} bytes, got {}",
                expected_len,
                data.len()
            )));
        }

        let checksum_offset = HEADER_SIZE + body_len;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = crc32fast::hash(&data[..checksum_offset]);
        if computed != stored {
            return Err(ChannelError::data_corruption(format!(
                "Checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            )));
        }

        serde_json::from_slice(&data[HEADER_SIZE..checksum_offset])
            .map_err(|e| ChannelError::data_corruption(format!("Invalid envelope body: {}", e)))
    }
}
