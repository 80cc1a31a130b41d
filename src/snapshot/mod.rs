//! At-rest representation of one region and the codecs that read and write it.

pub mod atomic;
pub mod binary;
pub mod codec;
pub mod legacy;

pub use atomic::AtomicTarget;
pub use binary::BinaryRegionCodec;
pub use codec::SnapshotCodec;
pub use legacy::LegacyArchiveCodec;

use crate::core::{ParcelData, RegionInfo, SceneObjectGroup, TerrainMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four terrain buffers carried by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainKind {
    Terrain,
    RevertTerrain,
    Water,
    RevertWater,
}

impl TerrainKind {
    pub const ALL: [TerrainKind; 4] = [
        TerrainKind::Terrain,
        TerrainKind::RevertTerrain,
        TerrainKind::Water,
        TerrainKind::RevertWater,
    ];
}

impl fmt::Display for TerrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerrainKind::Terrain => "terrain",
            TerrainKind::RevertTerrain => "revert terrain",
            TerrainKind::Water => "water",
            TerrainKind::RevertWater => "revert water",
        };
        f.write_str(name)
    }
}

/// Everything persisted for one region at save time.
///
/// Built fresh for every save and dropped once written; on load it is decoded
/// once and handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub region_info: RegionInfo,
    #[serde(default)]
    pub groups: Vec<SceneObjectGroup>,
    #[serde(default)]
    pub terrain: Option<Vec<u8>>,
    #[serde(default)]
    pub revert_terrain: Option<Vec<u8>>,
    #[serde(default)]
    pub water: Option<Vec<u8>>,
    #[serde(default)]
    pub revert_water: Option<Vec<u8>>,
    #[serde(default)]
    pub parcels: Vec<ParcelData>,
}

impl RegionSnapshot {
    pub fn new(region_info: RegionInfo) -> Self {
        Self {
            region_info,
            groups: Vec::new(),
            terrain: None,
            revert_terrain: None,
            water: None,
            revert_water: None,
            parcels: Vec::new(),
        }
    }

    pub fn buffer(&self, kind: TerrainKind) -> Option<&[u8]> {
        let slot = match kind {
            TerrainKind::Terrain => &self.terrain,
            TerrainKind::RevertTerrain => &self.revert_terrain,
            TerrainKind::Water => &self.water,
            TerrainKind::RevertWater => &self.revert_water,
        };
        slot.as_deref()
    }

    pub fn set_buffer(&mut self, kind: TerrainKind, bytes: Vec<u8>) {
        let slot = match kind {
            TerrainKind::Terrain => &mut self.terrain,
            TerrainKind::RevertTerrain => &mut self.revert_terrain,
            TerrainKind::Water => &mut self.water,
            TerrainKind::RevertWater => &mut self.revert_water,
        };
        *slot = Some(bytes);
    }

    /// Decodes one terrain buffer, discarding it when the grid does not match
    /// the region's X size or the buffer is malformed.
    pub fn terrain_map(&self, kind: TerrainKind) -> Option<TerrainMap> {
        let bytes = self.buffer(kind)?;
        let map = TerrainMap::from_bytes(bytes).ok()?;
        let expected = usize::try_from(self.region_info.size_x).ok()?;
        (map.size() == expected).then_some(map)
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            region_name: self.region_info.region_name.clone(),
            groups: self.groups.len(),
            parcels: self.parcels.len(),
            terrain_bytes: TerrainKind::ALL
                .iter()
                .filter_map(|kind| self.buffer(*kind))
                .map(<[u8]>::len)
                .sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub region_name: String,
    pub groups: usize,
    pub parcels: usize,
    pub terrain_bytes: usize,
}

impl fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region '{}': {} object groups, {} parcels, {} terrain bytes",
            self.region_name, self.groups, self.parcels, self.terrain_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_map_checks_region_size() {
        let info = RegionInfo::new("Alpha").with_size(4, 4);
        let mut snapshot = RegionSnapshot::new(info);
        snapshot.set_buffer(TerrainKind::Terrain, TerrainMap::new(4).to_bytes());
        snapshot.set_buffer(TerrainKind::RevertTerrain, TerrainMap::new(2).to_bytes());

        assert!(snapshot.terrain_map(TerrainKind::Terrain).is_some());
        assert!(snapshot.terrain_map(TerrainKind::RevertTerrain).is_none());
        assert!(snapshot.terrain_map(TerrainKind::Water).is_none());
    }

    #[test]
    fn test_summary() {
        let mut snapshot = RegionSnapshot::new(RegionInfo::new("Alpha"));
        snapshot.set_buffer(TerrainKind::Water, vec![0; 8]);
        snapshot.parcels.push(ParcelData::new(1, "Plot"));
        let summary = snapshot.summary();
        assert_eq!(summary.parcels, 1);
        assert_eq!(summary.terrain_bytes, 8);
        assert!(summary.to_string().contains("Alpha"));
    }
}
