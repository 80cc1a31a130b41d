use super::{
    EntitySource, GridRegistrar, HostError, HostResult, LoadingSignal, ParcelSource,
    ScriptStateSink, TerrainSource,
};
use crate::core::{ParcelData, RegionInfo, SceneObjectGroup, TerrainMap};
use crate::snapshot::{RegionSnapshot, TerrainKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Default)]
struct RegionState {
    terrain: HashMap<TerrainKind, TerrainMap>,
    parcels: Vec<ParcelData>,
    groups: Vec<SceneObjectGroup>,
}

/// Live region state held in memory. Serves every collaborator role the
/// store needs, and can be rebuilt from a loaded snapshot.
#[derive(Default)]
pub struct InMemoryRegion {
    state: RwLock<RegionState>,
    bulk_loading: AtomicBool,
    script_flushes: AtomicUsize,
    registrations: Mutex<Vec<RegionInfo>>,
}

impl InMemoryRegion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces live state with the contents of a loaded snapshot. Terrain
    /// buffers whose grid does not match the region size are skipped.
    pub fn apply_snapshot(&self, snapshot: &RegionSnapshot) -> HostResult<()> {
        let mut state = self.state.write()?;
        state.terrain.clear();
        for kind in TerrainKind::ALL {
            if let Some(map) = snapshot.terrain_map(kind) {
                state.terrain.insert(kind, map);
            }
        }
        state.parcels = snapshot.parcels.clone();
        state.groups = snapshot.groups.clone();
        Ok(())
    }

    pub fn set_terrain(&self, kind: TerrainKind, map: TerrainMap) -> HostResult<()> {
        self.state.write()?.terrain.insert(kind, map);
        Ok(())
    }

    pub fn add_parcel(&self, parcel: ParcelData) -> HostResult<()> {
        self.state.write()?.parcels.push(parcel);
        Ok(())
    }

    /// Adds a group and flags it as changed.
    pub fn add_group(&self, mut group: SceneObjectGroup) -> HostResult<Uuid> {
        group.has_changed = true;
        let id = group.group_id;
        self.state.write()?.groups.push(group);
        Ok(id)
    }

    pub fn group(&self, group_id: Uuid) -> HostResult<Option<SceneObjectGroup>> {
        let state = self.state.read()?;
        Ok(state
            .groups
            .iter()
            .find(|group| group.group_id == group_id)
            .cloned())
    }

    pub fn group_count(&self) -> usize {
        self.state.read().map(|state| state.groups.len()).unwrap_or(0)
    }

    pub fn set_bulk_loading(&self, loading: bool) {
        self.bulk_loading.store(loading, Ordering::SeqCst);
    }

    pub fn script_flushes(&self) -> usize {
        self.script_flushes.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> Vec<RegionInfo> {
        self.registrations
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

impl TerrainSource for InMemoryRegion {
    fn terrain(&self, kind: TerrainKind) -> HostResult<Option<TerrainMap>> {
        Ok(self.state.read()?.terrain.get(&kind).cloned())
    }
}

impl ParcelSource for InMemoryRegion {
    fn parcels(&self) -> HostResult<Vec<ParcelData>> {
        Ok(self.state.read()?.parcels.clone())
    }
}

impl EntitySource for InMemoryRegion {
    fn entities(&self) -> HostResult<Vec<SceneObjectGroup>> {
        Ok(self.state.read()?.groups.clone())
    }

    fn clear_changed(&self, group_ids: &[Uuid]) -> HostResult<()> {
        let mut state = self.state.write()?;
        for group in state.groups.iter_mut() {
            if group_ids.contains(&group.group_id) {
                group.has_changed = false;
            }
        }
        Ok(())
    }
}

impl LoadingSignal for InMemoryRegion {
    fn is_bulk_loading(&self) -> bool {
        self.bulk_loading.load(Ordering::SeqCst)
    }
}

impl ScriptStateSink for InMemoryRegion {
    fn save_state_saves(&self) -> HostResult<()> {
        self.script_flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl GridRegistrar for InMemoryRegion {
    fn register_region(&self, info: &RegionInfo) -> HostResult<()> {
        if info.region_name.is_empty() {
            return Err(HostError::Failed("region has no name".to_string()));
        }
        self.registrations
            .lock()
            .map_err(HostError::from)?
            .push(info.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneObjectPart;

    #[test]
    fn test_apply_snapshot_replaces_state() {
        let region = InMemoryRegion::new();
        region
            .add_group(SceneObjectGroup::new(SceneObjectPart::new("old")))
            .unwrap();

        let mut snapshot = RegionSnapshot::new(RegionInfo::new("Alpha").with_size(2, 2));
        snapshot.set_buffer(TerrainKind::Terrain, TerrainMap::new(2).to_bytes());
        snapshot.set_buffer(TerrainKind::Water, TerrainMap::new(3).to_bytes());
        snapshot.parcels.push(ParcelData::new(1, "Lot"));
        region.apply_snapshot(&snapshot).unwrap();

        assert_eq!(region.group_count(), 0);
        assert_eq!(region.parcels().unwrap().len(), 1);
        assert!(region.terrain(TerrainKind::Terrain).unwrap().is_some());
        assert!(region.terrain(TerrainKind::Water).unwrap().is_none());
    }

    #[test]
    fn test_clear_changed() {
        let region = InMemoryRegion::new();
        let first = region
            .add_group(SceneObjectGroup::new(SceneObjectPart::new("a")))
            .unwrap();
        let second = region
            .add_group(SceneObjectGroup::new(SceneObjectPart::new("b")))
            .unwrap();

        region.clear_changed(&[first]).unwrap();
        assert!(!region.group(first).unwrap().unwrap().has_changed);
        assert!(region.group(second).unwrap().unwrap().has_changed);
    }

    #[test]
    fn test_register_requires_name() {
        let region = InMemoryRegion::new();
        assert!(region.register_region(&RegionInfo::default()).is_err());
        region.register_region(&RegionInfo::new("Alpha")).unwrap();
        assert_eq!(region.registrations().len(), 1);
    }
}
