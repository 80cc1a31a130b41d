//! Collaborators the store reads live region state from.
//!
//! Each read returns its own typed outcome so the store can drop a single
//! failing piece from a snapshot instead of abandoning the whole save.

pub mod console;
pub mod memory;

pub use console::ConsoleMetadataProvider;
pub use memory::InMemoryRegion;

use crate::core::{ParcelData, RegionInfo, Result, SceneObjectGroup, StoreError, TerrainMap};
use crate::snapshot::TerrainKind;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator failed: {0}")]
    Failed(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;

impl From<HostError> for StoreError {
    fn from(err: HostError) -> Self {
        StoreError::Host(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for HostError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Failed(err.to_string())
    }
}

pub trait TerrainSource: Send + Sync {
    /// `Ok(None)` when the region has no map of that kind.
    fn terrain(&self, kind: TerrainKind) -> HostResult<Option<TerrainMap>>;
}

pub trait ParcelSource: Send + Sync {
    fn parcels(&self) -> HostResult<Vec<ParcelData>>;
}

pub trait EntitySource: Send + Sync {
    /// Every live object group, transient ones included.
    fn entities(&self) -> HostResult<Vec<SceneObjectGroup>>;

    /// Marks the given groups as captured.
    fn clear_changed(&self, group_ids: &[Uuid]) -> HostResult<()>;
}

/// True while something is loading objects in bulk and the live object set
/// is not consistent enough to snapshot.
pub trait LoadingSignal: Send + Sync {
    fn is_bulk_loading(&self) -> bool;
}

pub trait ScriptStateSink: Send + Sync {
    fn save_state_saves(&self) -> HostResult<()>;
}

pub trait GridRegistrar: Send + Sync {
    fn register_region(&self, info: &RegionInfo) -> HostResult<()>;
}

/// Produces region metadata when no snapshot exists or an operator asks to
/// edit it. `existing` seeds the defaults.
pub trait MetadataProvider: Send + Sync {
    fn resolve(&self, existing: Option<&RegionInfo>) -> Result<RegionInfo>;
}

/// The set of collaborators wired into a store. Missing collaborators are
/// treated as "nothing to capture".
#[derive(Clone, Default)]
pub struct HostServices {
    pub terrain: Option<Arc<dyn TerrainSource>>,
    pub parcels: Option<Arc<dyn ParcelSource>>,
    pub entities: Option<Arc<dyn EntitySource>>,
    pub loading: Option<Arc<dyn LoadingSignal>>,
    pub scripts: Vec<Arc<dyn ScriptStateSink>>,
    pub registrar: Option<Arc<dyn GridRegistrar>>,
}

impl HostServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires one in-memory region as every collaborator.
    pub fn from_region(region: Arc<InMemoryRegion>) -> Self {
        let terrain: Arc<dyn TerrainSource> = region.clone();
        let parcels: Arc<dyn ParcelSource> = region.clone();
        let entities: Arc<dyn EntitySource> = region.clone();
        let loading: Arc<dyn LoadingSignal> = region.clone();
        let scripts: Arc<dyn ScriptStateSink> = region.clone();
        let registrar: Arc<dyn GridRegistrar> = region;
        Self {
            terrain: Some(terrain),
            parcels: Some(parcels),
            entities: Some(entities),
            loading: Some(loading),
            scripts: vec![scripts],
            registrar: Some(registrar),
        }
    }

    pub fn with_terrain(mut self, terrain: Arc<dyn TerrainSource>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn with_parcels(mut self, parcels: Arc<dyn ParcelSource>) -> Self {
        self.parcels = Some(parcels);
        self
    }

    pub fn with_entities(mut self, entities: Arc<dyn EntitySource>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_loading_signal(mut self, loading: Arc<dyn LoadingSignal>) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn with_script_sink(mut self, sink: Arc<dyn ScriptStateSink>) -> Self {
        self.scripts.push(sink);
        self
    }

    pub fn with_registrar(mut self, registrar: Arc<dyn GridRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn is_bulk_loading(&self) -> bool {
        self.loading
            .as_ref()
            .is_some_and(|signal| signal.is_bulk_loading())
    }
}
