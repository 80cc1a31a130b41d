//! Read-only support for the older archive layout, kept so regions saved
//! before the binary format still load.

use super::{RegionSnapshot, SnapshotCodec, TerrainKind};
use crate::core::{
    ObjectFlags, ParcelData, ParcelFlags, RegionInfo, Result, SceneObjectGroup, SceneObjectPart,
    StoreError, TerrainMap,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyArchiveCodec;

impl LegacyArchiveCodec {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Archive {
    archive_version: u32,
    region: ArchiveRegion,
    #[serde(default)]
    objects: Vec<ArchiveGroup>,
    #[serde(default)]
    parcels: Vec<ArchiveParcel>,
    #[serde(default)]
    terrain: ArchiveTerrain,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArchiveRegion {
    #[serde(rename = "RegionID")]
    region_id: Uuid,
    region_name: String,
    region_loc_x: i32,
    region_loc_y: i32,
    region_size_x: i32,
    region_size_y: i32,
    #[serde(default)]
    region_type: String,
    #[serde(default)]
    see_into_this_sim_from_neighbor: bool,
    #[serde(default)]
    infinite_region: bool,
    #[serde(default)]
    object_capacity: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArchiveGroup {
    #[serde(rename = "GroupID")]
    group_id: Uuid,
    #[serde(rename = "OwnerID", default)]
    owner_id: Uuid,
    absolute_position: [f32; 3],
    #[serde(default)]
    is_attachment: bool,
    parts: Vec<ArchivePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArchivePart {
    #[serde(rename = "UUID")]
    uuid: Uuid,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    offset_position: [f32; 3],
    #[serde(default)]
    flags: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArchiveParcel {
    #[serde(rename = "GlobalID")]
    global_id: Uuid,
    #[serde(rename = "LocalID")]
    local_id: i32,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "OwnerID", default)]
    owner_id: Uuid,
    #[serde(rename = "GroupID", default)]
    group_id: Uuid,
    #[serde(default)]
    is_group_owned: bool,
    #[serde(default)]
    sale_price: i32,
    #[serde(rename = "AuthBuyerID", default)]
    auth_buyer_id: Uuid,
    #[serde(default)]
    area: i32,
    #[serde(default)]
    flags: u32,
    #[serde(default)]
    bitmap: Vec<u8>,
}

/// Heightmaps are stored as flat sample arrays in this layout.
#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ArchiveTerrain {
    heightmap: Option<Vec<i16>>,
    revert_heightmap: Option<Vec<i16>>,
    water: Option<Vec<i16>>,
    revert_water: Option<Vec<i16>>,
}

const ARCHIVE_VERSIONS: [u32; 2] = [1, 2];

fn samples_to_buffer(kind: TerrainKind, samples: Vec<i16>) -> Result<Vec<u8>> {
    let size = samples.len().isqrt();
    let map = TerrainMap::from_heights(size, samples)
        .map_err(|e| StoreError::Decode(format!("archive {}: {}", kind, e)))?;
    Ok(map.to_bytes())
}

impl From<ArchiveRegion> for RegionInfo {
    fn from(region: ArchiveRegion) -> Self {
        RegionInfo {
            region_id: region.region_id,
            region_name: region.region_name,
            loc_x: region.region_loc_x,
            loc_y: region.region_loc_y,
            size_x: region.region_size_x,
            size_y: region.region_size_y,
            region_type: region.region_type,
            see_into_from_neighbors: region.see_into_this_sim_from_neighbor,
            infinite_region: region.infinite_region,
            object_capacity: region.object_capacity,
        }
    }
}

impl From<ArchiveGroup> for SceneObjectGroup {
    fn from(group: ArchiveGroup) -> Self {
        SceneObjectGroup {
            group_id: group.group_id,
            owner_id: group.owner_id,
            position: group.absolute_position,
            is_attachment: group.is_attachment,
            parts: group
                .parts
                .into_iter()
                .map(|part| SceneObjectPart {
                    part_id: part.uuid,
                    name: part.name,
                    description: part.description,
                    offset: part.offset_position,
                    flags: ObjectFlags(part.flags),
                })
                .collect(),
            has_changed: false,
        }
    }
}

impl From<ArchiveParcel> for ParcelData {
    fn from(parcel: ArchiveParcel) -> Self {
        ParcelData {
            global_id: parcel.global_id,
            local_id: parcel.local_id,
            name: parcel.name,
            description: parcel.description,
            owner_id: parcel.owner_id,
            group_id: parcel.group_id,
            is_group_owned: parcel.is_group_owned,
            sale_price: parcel.sale_price,
            auth_buyer_id: parcel.auth_buyer_id,
            area: parcel.area,
            flags: ParcelFlags(parcel.flags),
            bitmap: parcel.bitmap,
        }
    }
}

impl SnapshotCodec for LegacyArchiveCodec {
    fn file_extension(&self) -> &'static str {
        ".backup"
    }

    fn encode(&self, _snapshot: &RegionSnapshot) -> Result<Vec<u8>> {
        Err(StoreError::Unsupported(
            "legacy archive format is read-only".to_string(),
        ))
    }

    fn decode(&self, bytes: &[u8]) -> Result<RegionSnapshot> {
        let archive: Archive = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Decode(format!("parse region archive: {}", e)))?;
        if !ARCHIVE_VERSIONS.contains(&archive.archive_version) {
            return Err(StoreError::Decode(format!(
                "Unsupported region archive version {}",
                archive.archive_version
            )));
        }

        let mut snapshot = RegionSnapshot::new(archive.region.into());
        snapshot.groups = archive.objects.into_iter().map(Into::into).collect();
        snapshot.parcels = archive.parcels.into_iter().map(Into::into).collect();

        let ArchiveTerrain {
            heightmap,
            revert_heightmap,
            water,
            revert_water,
        } = archive.terrain;
        let buffers = [
            (TerrainKind::Terrain, heightmap),
            (TerrainKind::RevertTerrain, revert_heightmap),
            (TerrainKind::Water, water),
            (TerrainKind::RevertWater, revert_water),
        ];
        for (kind, samples) in buffers {
            if let Some(samples) = samples {
                snapshot.set_buffer(kind, samples_to_buffer(kind, samples)?);
            }
        }
        Ok(snapshot)
    }
}
