use super::RegionSnapshot;
use crate::core::{Result, StoreError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{Level, event};

/// Encoding of a [`RegionSnapshot`] to and from bytes.
///
/// `load` and `save` never raise: a missing or unreadable file is `None`, a
/// failed write is `false`, and the caller picks the fallback.
pub trait SnapshotCodec: Send + Sync {
    /// Extension including the leading dot, e.g. `.abackup`.
    fn file_extension(&self) -> &'static str;

    fn encode(&self, snapshot: &RegionSnapshot) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<RegionSnapshot>;

    fn load(&self, path: &Path) -> Option<RegionSnapshot> {
        if !path.exists() {
            return None;
        }
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                event!(Level::WARN, path = %path.display(), error = %err, "snapshot read failed");
                return None;
            }
        };
        match self.decode(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                event!(Level::WARN, path = %path.display(), error = %err, "snapshot decode failed");
                None
            }
        }
    }

    /// Writes to exactly `path`; atomic replacement is the caller's concern.
    fn save(&self, path: &Path, snapshot: &RegionSnapshot) -> bool {
        match self.encode(snapshot).and_then(|bytes| write_synced(path, &bytes)) {
            Ok(()) => true,
            Err(err) => {
                event!(Level::ERROR, path = %path.display(), error = %err, "snapshot write failed");
                false
            }
        }
    }
}

/// Writes `bytes` to `path` and syncs before returning.
pub fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| StoreError::Io(format!("Failed to create {}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .map_err(|e| StoreError::Io(format!("Failed to write snapshot: {}", e)))?;
    writer
        .flush()
        .map_err(|e| StoreError::Io(format!("Failed to flush snapshot: {}", e)))?;
    writer
        .get_mut()
        .sync_all()
        .map_err(|e| StoreError::Io(format!("Failed to sync snapshot: {}", e)))?;
    Ok(())
}
