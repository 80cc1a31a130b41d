use super::{RegionSnapshot, SnapshotCodec};
use crate::core::{Result, StoreError};
use serde::{Deserialize, Serialize};

const MAGIC: &[u8; 4] = b"RGNS";
pub const BINARY_FORMAT_VERSION: u16 = 1;

/// Current on-disk format: MessagePack with named fields behind a short
/// magic header, so fields may appear in any order on read.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryRegionCodec;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u16,
    snapshot: &'a RegionSnapshot,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u16,
    snapshot: RegionSnapshot,
}

impl BinaryRegionCodec {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotCodec for BinaryRegionCodec {
    fn file_extension(&self) -> &'static str {
        ".abackup"
    }

    fn encode(&self, snapshot: &RegionSnapshot) -> Result<Vec<u8>> {
        let envelope = EnvelopeRef {
            format_version: BINARY_FORMAT_VERSION,
            snapshot,
        };
        let body = rmp_serde::to_vec_named(&envelope)
            .map_err(|e| StoreError::Encode(format!("Failed to serialize snapshot: {}", e)))?;
        let mut out = Vec::with_capacity(MAGIC.len() + body.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RegionSnapshot> {
        let body = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| StoreError::Decode("missing region snapshot header".to_string()))?;
        let envelope: Envelope = rmp_serde::from_slice(body)
            .map_err(|e| StoreError::Decode(format!("Failed to deserialize snapshot: {}", e)))?;
        if envelope.format_version != BINARY_FORMAT_VERSION {
            return Err(StoreError::Decode(format!(
                "Unsupported snapshot format version {}",
                envelope.format_version
            )));
        }
        Ok(envelope.snapshot)
    }
}
