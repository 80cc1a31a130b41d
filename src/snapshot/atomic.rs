use super::{RegionSnapshot, SnapshotCodec};
use crate::core::{Result, StoreError};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Pairs a snapshot path with its `.tmp` sibling.
///
/// The codec only ever writes the temp path; the target is replaced by a
/// single rename once the temp file is complete, so readers of the target
/// see either the old snapshot or the new one.
#[derive(Debug, Clone)]
pub struct AtomicTarget {
    target: PathBuf,
    temp: PathBuf,
}

impl AtomicTarget {
    pub fn new<P: AsRef<Path>>(target: P) -> Self {
        let target = target.as_ref().to_path_buf();
        let mut temp: OsString = target.clone().into_os_string();
        temp.push(".tmp");
        Self {
            target,
            temp: PathBuf::from(temp),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp(&self) -> &Path {
        &self.temp
    }

    /// Removes a temp file left behind by an interrupted save.
    pub fn clear_stale(&self) -> Result<()> {
        remove_if_exists(&self.temp)
    }

    /// Encodes into the temp path. On failure the temp file is removed and the
    /// target is untouched.
    pub fn stage(&self, codec: &dyn SnapshotCodec, snapshot: &RegionSnapshot) -> Result<()> {
        self.clear_stale()?;
        if let Some(parent) = self.temp.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Io(format!("Failed to create snapshot directory: {}", e))
                })?;
            }
        }
        if codec.save(&self.temp, snapshot) {
            return Ok(());
        }
        self.discard();
        Err(StoreError::Encode(format!(
            "codec failed to write {}",
            self.temp.display()
        )))
    }

    /// Moves the staged temp file onto the target.
    pub fn commit(&self) -> Result<()> {
        fs::rename(&self.temp, &self.target).map_err(|e| {
            StoreError::Io(format!(
                "Failed to move {} onto {}: {}",
                self.temp.display(),
                self.target.display(),
                e
            ))
        })
    }

    pub fn discard(&self) {
        let _ = fs::remove_file(&self.temp);
    }

    pub fn write(&self, codec: &dyn SnapshotCodec, snapshot: &RegionSnapshot) -> Result<()> {
        self.stage(codec, snapshot)?;
        self.commit()
    }
}

pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}
