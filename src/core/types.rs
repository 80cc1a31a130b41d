use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Width of one grid cell in base units. Region locations are stored in
/// base units and entered or displayed in region units.
pub const REGION_SIZE: i32 = 256;

/// Identity and configuration of a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub region_id: Uuid,
    pub region_name: String,
    /// World X coordinate in base units.
    pub loc_x: i32,
    /// World Y coordinate in base units.
    pub loc_y: i32,
    pub size_x: i32,
    pub size_y: i32,
    pub region_type: String,
    pub see_into_from_neighbors: bool,
    pub infinite_region: bool,
    pub object_capacity: u32,
}

impl RegionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            region_name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, grid_x: i32, grid_y: i32) -> Self {
        self.loc_x = grid_x * REGION_SIZE;
        self.loc_y = grid_y * REGION_SIZE;
        self
    }

    pub fn with_size(mut self, size_x: i32, size_y: i32) -> Self {
        self.size_x = size_x;
        self.size_y = size_y;
        self
    }

    /// Location in region units.
    pub fn grid_location(&self) -> (i32, i32) {
        (self.loc_x / REGION_SIZE, self.loc_y / REGION_SIZE)
    }
}

impl Default for RegionInfo {
    fn default() -> Self {
        Self {
            region_id: Uuid::new_v4(),
            region_name: String::new(),
            loc_x: 0,
            loc_y: 0,
            size_x: REGION_SIZE,
            size_y: REGION_SIZE,
            region_type: String::new(),
            see_into_from_neighbors: true,
            infinite_region: false,
            object_capacity: 0,
        }
    }
}

/// Prim flag bits carried on the root part of an object group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectFlags(pub u32);

impl ObjectFlags {
    pub const NONE: ObjectFlags = ObjectFlags(0);
    pub const PHYSICS: ObjectFlags = ObjectFlags(1 << 0);
    pub const PHANTOM: ObjectFlags = ObjectFlags(1 << 10);
    pub const TEMPORARY_ON_REZ: ObjectFlags = ObjectFlags(1 << 29);
    pub const TEMPORARY: ObjectFlags = ObjectFlags(1 << 30);

    pub fn contains(self, other: ObjectFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: ObjectFlags) -> ObjectFlags {
        ObjectFlags(self.0 | other.0)
    }
}

/// One prim of an object group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObjectPart {
    pub part_id: Uuid,
    pub name: String,
    pub description: String,
    pub offset: [f32; 3],
    pub flags: ObjectFlags,
}

impl SceneObjectPart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            part_id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            offset: [0.0; 3],
            flags: ObjectFlags::NONE,
        }
    }
}

/// A dynamic object group present in the region. The first part is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObjectGroup {
    pub group_id: Uuid,
    pub owner_id: Uuid,
    pub position: [f32; 3],
    pub is_attachment: bool,
    pub parts: Vec<SceneObjectPart>,
    /// Set by the live scene when the group changed since it was last captured.
    /// Never persisted.
    #[serde(skip)]
    pub has_changed: bool,
}

impl SceneObjectGroup {
    pub fn new(root: SceneObjectPart) -> Self {
        Self {
            group_id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            position: [128.0, 128.0, 25.0],
            is_attachment: false,
            parts: vec![root],
            has_changed: false,
        }
    }

    pub fn root(&self) -> Option<&SceneObjectPart> {
        self.parts.first()
    }

    pub fn root_flags(&self) -> ObjectFlags {
        self.root().map(|part| part.flags).unwrap_or_default()
    }

    /// Attachments and temporary objects never reach disk.
    pub fn is_transient(&self) -> bool {
        let flags = self.root_flags();
        self.is_attachment
            || flags.contains(ObjectFlags::TEMPORARY)
            || flags.contains(ObjectFlags::TEMPORARY_ON_REZ)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelFlags(pub u32);

impl ParcelFlags {
    pub const ALLOW_FLY: ParcelFlags = ParcelFlags(1 << 0);
    pub const ALLOW_BUILD: ParcelFlags = ParcelFlags(1 << 6);
    pub const FOR_SALE: ParcelFlags = ParcelFlags(1 << 14);
    pub const PUBLIC_ACCESS: ParcelFlags = ParcelFlags(1 << 15);

    pub fn contains(self, other: ParcelFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A land parcel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelData {
    pub global_id: Uuid,
    pub local_id: i32,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub group_id: Uuid,
    pub is_group_owned: bool,
    pub sale_price: i32,
    pub auth_buyer_id: Uuid,
    pub area: i32,
    pub flags: ParcelFlags,
    /// Ownership bitmap, one bit per 4x4 meter cell.
    pub bitmap: Vec<u8>,
}

impl ParcelData {
    pub fn new(local_id: i32, name: impl Into<String>) -> Self {
        Self {
            global_id: Uuid::new_v4(),
            local_id,
            name: name.into(),
            description: String::new(),
            owner_id: Uuid::nil(),
            group_id: Uuid::nil(),
            is_group_owned: false,
            sale_price: 0,
            auth_buyer_id: Uuid::nil(),
            area: 0,
            flags: ParcelFlags::default(),
            bitmap: Vec::new(),
        }
    }

    pub fn is_for_sale(&self) -> bool {
        self.flags.contains(ParcelFlags::FOR_SALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_location_round_trip() {
        let info = RegionInfo::new("Alpha").with_location(1000, 1001);
        assert_eq!(info.loc_x, 256_000);
        assert_eq!(info.loc_y, 256_256);
        assert_eq!(info.grid_location(), (1000, 1001));
    }

    #[test]
    fn test_transient_objects() {
        let ordinary = SceneObjectGroup::new(SceneObjectPart::new("box"));
        assert!(!ordinary.is_transient());

        let mut attachment = SceneObjectGroup::new(SceneObjectPart::new("hat"));
        attachment.is_attachment = true;
        assert!(attachment.is_transient());

        let mut temp_part = SceneObjectPart::new("bullet");
        temp_part.flags = ObjectFlags::PHYSICS.with(ObjectFlags::TEMPORARY_ON_REZ);
        assert!(SceneObjectGroup::new(temp_part).is_transient());

        let mut temp_part = SceneObjectPart::new("spark");
        temp_part.flags = ObjectFlags::TEMPORARY;
        assert!(SceneObjectGroup::new(temp_part).is_transient());
    }

    #[test]
    fn test_transient_checks_root_only() {
        let mut child = SceneObjectPart::new("child");
        child.flags = ObjectFlags::TEMPORARY;
        let mut group = SceneObjectGroup::new(SceneObjectPart::new("root"));
        group.parts.push(child);
        assert!(!group.is_transient());
    }
}
