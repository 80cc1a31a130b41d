// ============================================================================
// simstore: durable snapshots for a simulated region
// ============================================================================

//! Keeps one simulated region on disk.
//!
//! The host owns the live region. A [`SnapshotStore`] pulls terrain, parcels
//! and objects from the host through the collaborator traits in [`host`],
//! writes them as a single snapshot file, and restores them on the next start.
//!
//! ```no_run
//! use simstore::{ConsoleMetadataProvider, HostServices, InMemoryRegion, SnapshotStore, StoreConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> simstore::Result<()> {
//! let region = Arc::new(InMemoryRegion::new());
//! let store = SnapshotStore::builder(Arc::new(ConsoleMetadataProvider::stdio()))
//!     .host(HostServices::from_region(region.clone()))
//!     .build();
//!
//! store.initialize(StoreConfig::new().store_directory("regions"))?;
//! let loaded = store.load()?;
//! println!("{} (new: {})", loaded.info.region_name, loaded.is_new_region);
//!
//! store.mark_dirty();
//! store.force_save();
//! store.shutdown_save();
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod host;
pub mod snapshot;
pub mod store;

pub use core::{
    ObjectFlags, ParcelData, ParcelFlags, REGION_SIZE, RegionInfo, Result, SceneObjectGroup,
    SceneObjectPart, StoreError, TerrainMap,
};
pub use host::{
    ConsoleMetadataProvider, EntitySource, GridRegistrar, HostError, HostResult, HostServices,
    InMemoryRegion, LoadingSignal, MetadataProvider, ParcelSource, ScriptStateSink, TerrainSource,
};
pub use snapshot::{
    AtomicTarget, BinaryRegionCodec, LegacyArchiveCodec, RegionSnapshot, SnapshotCodec,
    SnapshotSummary, TerrainKind,
};
pub use store::{
    Clock, FixedClock, LoadSource, LoadedRegion, ManualScheduler, SaveKind, SaveOutcome,
    SaveScheduler, SaveTimer, SkipReason, SnapshotStore, SnapshotStoreBuilder, StoreConfig,
    StoreState, StoreStatus, SystemClock, TimerKind, TokioScheduler,
};
