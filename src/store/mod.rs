//! Region snapshot store: load on startup, timed and forced saves, shutdown
//! save and historical backups.

pub mod clock;
pub mod config;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::StoreConfig;
pub use scheduler::{ManualScheduler, SaveScheduler, SaveTimer, TimerKind, TokioScheduler};

use crate::core::{ParcelData, RegionInfo, Result, SceneObjectGroup, StoreError, TerrainMap};
use crate::host::{HostServices, MetadataProvider};
use crate::snapshot::atomic::remove_if_exists;
use crate::snapshot::{
    AtomicTarget, BinaryRegionCodec, LegacyArchiveCodec, RegionSnapshot, SnapshotCodec,
    TerrainKind,
};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tracing::{Level, event, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Loaded,
    Idle,
    Saving,
    ShuttingDown,
    Closed,
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreState::Uninitialized => "uninitialized",
            StoreState::Loaded => "loaded",
            StoreState::Idle => "idle",
            StoreState::Saving => "saving",
            StoreState::ShuttingDown => "shutting down",
            StoreState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// What triggered a guarded save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Routine,
    Historical,
    Forced,
    Shutdown,
}

impl SaveKind {
    pub fn is_historical(self) -> bool {
        self == SaveKind::Historical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotDirty,
    Disabled,
    BulkLoadInProgress,
    ShuttingDown,
    RegionDeleted,
    NoRegion,
    AlreadyClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    Skipped(SkipReason),
    Failed(String),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

/// Where `load` found the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Current,
    Legacy,
    Bootstrap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRegion {
    pub info: RegionInfo,
    pub is_new_region: bool,
    pub source: LoadSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub state: StoreState,
    pub dirty: bool,
    pub backups_enabled: bool,
    pub map_tile_needs_generated: bool,
    pub previous_copy_taken: bool,
    pub current_path: PathBuf,
}

#[derive(Default)]
struct Timers {
    routine: Option<Box<dyn SaveTimer>>,
    historical: Option<Box<dyn SaveTimer>>,
}

impl Timers {
    fn close_all(&mut self) {
        for timer in [self.routine.take(), self.historical.take()].into_iter().flatten() {
            timer.close();
        }
    }
}

/// Persists one region to a single snapshot file.
///
/// Every save trigger funnels into one critical section, so at most one save
/// runs at a time. The live region state belongs to the host; the store pulls
/// a fresh copy for each save and drops it once written.
pub struct SnapshotStore {
    self_ref: Weak<SnapshotStore>,
    config: RwLock<StoreConfig>,
    codec: Arc<dyn SnapshotCodec>,
    legacy_codec: Option<Arc<dyn SnapshotCodec>>,
    host: HostServices,
    metadata: Arc<dyn MetadataProvider>,
    scheduler: Option<Arc<dyn SaveScheduler>>,
    clock: Arc<dyn Clock>,
    region: RwLock<Option<RegionInfo>>,
    loaded: Mutex<Option<RegionSnapshot>>,
    timers: Mutex<Timers>,
    save_lock: Mutex<()>,
    state: Mutex<StoreState>,
    dirty: AtomicBool,
    shutdown: AtomicBool,
    deleted: AtomicBool,
    backups_enabled: AtomicBool,
    previous_copy_taken: AtomicBool,
    map_tile_needs_generated: AtomicBool,
    not_saving_notice: AtomicBool,
}

pub struct SnapshotStoreBuilder {
    metadata: Arc<dyn MetadataProvider>,
    config: StoreConfig,
    codec: Arc<dyn SnapshotCodec>,
    legacy_codec: Option<Arc<dyn SnapshotCodec>>,
    host: HostServices,
    scheduler: Option<Arc<dyn SaveScheduler>>,
    clock: Arc<dyn Clock>,
}

impl SnapshotStoreBuilder {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn codec(mut self, codec: Arc<dyn SnapshotCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn legacy_codec(mut self, codec: Option<Arc<dyn SnapshotCodec>>) -> Self {
        self.legacy_codec = codec;
        self
    }

    pub fn host(mut self, host: HostServices) -> Self {
        self.host = host;
        self
    }

    /// Without a scheduler no timers are armed and the host drives ticks itself.
    pub fn scheduler(mut self, scheduler: Arc<dyn SaveScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Arc<SnapshotStore> {
        Arc::new_cyclic(|self_ref| SnapshotStore {
            self_ref: self_ref.clone(),
            config: RwLock::new(self.config),
            codec: self.codec,
            legacy_codec: self.legacy_codec,
            host: self.host,
            metadata: self.metadata,
            scheduler: self.scheduler,
            clock: self.clock,
            region: RwLock::new(None),
            loaded: Mutex::new(None),
            timers: Mutex::new(Timers::default()),
            save_lock: Mutex::new(()),
            state: Mutex::new(StoreState::Uninitialized),
            dirty: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            deleted: AtomicBool::new(false),
            backups_enabled: AtomicBool::new(true),
            previous_copy_taken: AtomicBool::new(false),
            map_tile_needs_generated: AtomicBool::new(false),
            not_saving_notice: AtomicBool::new(true),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SnapshotStore {
    pub fn builder(metadata: Arc<dyn MetadataProvider>) -> SnapshotStoreBuilder {
        SnapshotStoreBuilder {
            metadata,
            config: StoreConfig::default(),
            codec: Arc::new(BinaryRegionCodec::new()),
            legacy_codec: Some(Arc::new(LegacyArchiveCodec::new())),
            host: HostServices::default(),
            scheduler: None,
            clock: Arc::new(SystemClock),
        }
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Applies a save policy and arms the routine and historical timers it
    /// enables. Calling it again replaces the previous timers.
    pub fn initialize(&self, config: StoreConfig) -> Result<()> {
        config.validate()?;
        let routine = config.routine_interval();
        let historical = config.historical_interval();
        *self.config.write()? = config;

        let mut timers = lock(&self.timers);
        timers.close_all();

        let Some(scheduler) = self.scheduler.as_ref() else {
            event!(Level::DEBUG, "no scheduler configured, save timers not armed");
            return Ok(());
        };

        if let Some(interval) = routine {
            let store = self.self_ref.clone();
            timers.routine = Some(scheduler.schedule(
                TimerKind::Routine,
                interval,
                Arc::new(move || {
                    if let Some(store) = store.upgrade() {
                        store.routine_save_tick();
                    }
                }),
            ));
        }
        if let Some(interval) = historical {
            let store = self.self_ref.clone();
            timers.historical = Some(scheduler.schedule(
                TimerKind::Historical,
                interval,
                Arc::new(move || {
                    if let Some(store) = store.upgrade() {
                        store.historical_save_tick();
                    }
                }),
            ));
        }

        event!(
            Level::INFO,
            routine_secs = routine.map(|d| d.as_secs()).unwrap_or(0),
            historical_secs = historical.map(|d| d.as_secs()).unwrap_or(0),
            "snapshot store initialized"
        );
        Ok(())
    }

    /// Restores the region: current format first, then the legacy format,
    /// then operator bootstrap.
    ///
    /// Fails only when the metadata provider cannot produce an answer at all
    /// (its input is gone).
    pub fn load(&self) -> Result<LoadedRegion> {
        let path = self.current_path();
        event!(Level::INFO, path = %path.display(), "restoring region snapshot");

        let mut found = self
            .codec
            .load(&path)
            .map(|snapshot| (snapshot, LoadSource::Current));
        if found.is_none() {
            if let Some(legacy) = self.legacy_codec.as_ref() {
                let legacy_path =
                    path.with_extension(legacy.file_extension().trim_start_matches('.'));
                found = legacy
                    .load(&legacy_path)
                    .map(|snapshot| (snapshot, LoadSource::Legacy));
            }
        }

        if let Some((snapshot, source)) = found {
            let info = snapshot.region_info.clone();
            *self.region.write()? = Some(info.clone());
            *lock(&self.loaded) = Some(snapshot);
            self.set_state(StoreState::Loaded);
            event!(Level::INFO, region = %info.region_name, source = ?source, "region snapshot restored");
            return Ok(LoadedRegion {
                info,
                is_new_region: false,
                source,
            });
        }

        event!(Level::WARN, "no readable region snapshot, asking for region metadata");
        let info = self.bootstrap(None)?;
        *lock(&self.loaded) = Some(RegionSnapshot::new(info.clone()));
        self.set_state(StoreState::Loaded);
        self.force_save();
        Ok(LoadedRegion {
            info,
            is_new_region: true,
            source: LoadSource::Bootstrap,
        })
    }

    /// Operator command: edit region metadata seeded with the current values,
    /// then persist it.
    pub fn update_region_info(&self) -> Result<RegionInfo> {
        let current = self.region_info();
        let info = self.bootstrap(current.as_ref())?;
        let outcome = self.force_save();
        event!(Level::INFO, region = %info.region_name, outcome = ?outcome, "region metadata updated");
        Ok(info)
    }

    fn bootstrap(&self, existing: Option<&RegionInfo>) -> Result<RegionInfo> {
        loop {
            let resolved = self.metadata.resolve(existing).and_then(|info| {
                if info.region_name.trim().is_empty() {
                    Err(StoreError::Bootstrap("region name is required".to_string()))
                } else {
                    Ok(info)
                }
            });
            match resolved {
                Ok(info) => {
                    self.adopt_region(&info)?;
                    return Ok(info);
                }
                Err(err @ (StoreError::InputClosed | StoreError::Io(_))) => return Err(err),
                Err(err) => {
                    event!(Level::WARN, error = %err, "region metadata incomplete, asking again");
                }
            }
        }
    }

    fn adopt_region(&self, info: &RegionInfo) -> Result<()> {
        *self.region.write()? = Some(info.clone());
        if let Some(registrar) = self.host.registrar.as_ref() {
            if let Err(err) = registrar.register_region(info) {
                event!(Level::WARN, region = %info.region_name, error = %err, "grid registration failed");
            }
        }
        Ok(())
    }

    // ========================================================================
    // Loaded data handed to the host
    // ========================================================================

    pub fn load_objects(&self) -> Vec<SceneObjectGroup> {
        lock(&self.loaded)
            .as_ref()
            .map(|snapshot| snapshot.groups.clone())
            .unwrap_or_default()
    }

    pub fn load_parcels(&self) -> Vec<ParcelData> {
        lock(&self.loaded)
            .as_ref()
            .map(|snapshot| snapshot.parcels.clone())
            .unwrap_or_default()
    }

    /// `None` when absent or when the stored grid does not match the region size.
    pub fn load_terrain(&self, kind: TerrainKind) -> Option<TerrainMap> {
        lock(&self.loaded)
            .as_ref()
            .and_then(|snapshot| snapshot.terrain_map(kind))
    }

    pub fn take_loaded_snapshot(&self) -> Option<RegionSnapshot> {
        lock(&self.loaded).take()
    }

    /// Drops the decoded snapshot once the host has taken what it needs.
    pub fn release_cache(&self) {
        lock(&self.loaded).take();
    }

    // ========================================================================
    // Save triggers
    // ========================================================================

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Pauses or resumes routine and shutdown saves.
    pub fn set_backups_enabled(&self, enabled: bool) {
        self.backups_enabled.store(enabled, Ordering::SeqCst);
    }

    fn saving_enabled(&self) -> bool {
        let save_changes = self
            .config
            .read()
            .map(|config| config.save_changes)
            .unwrap_or(false);
        save_changes && self.backups_enabled.load(Ordering::SeqCst)
    }

    /// Autosave timer body. Saves only when something changed since the last
    /// save; the timer is paused for the duration of the save.
    pub fn routine_save_tick(&self) -> SaveOutcome {
        if self.shutdown.load(Ordering::SeqCst) {
            return SaveOutcome::Skipped(SkipReason::ShuttingDown);
        }
        if !self.dirty.load(Ordering::SeqCst) {
            if self.not_saving_notice.swap(false, Ordering::SeqCst) {
                event!(Level::INFO, "not saving region snapshot, nothing changed");
            }
            return SaveOutcome::Skipped(SkipReason::NotDirty);
        }
        if !self.saving_enabled() {
            return SaveOutcome::Skipped(SkipReason::Disabled);
        }

        self.not_saving_notice.store(true, Ordering::SeqCst);
        self.dirty.store(false, Ordering::SeqCst);
        self.with_routine_timer_paused(|| {
            let outcome = self.guarded_save(SaveKind::Routine);
            self.keep_dirty_if_deferred(true, &outcome);
            outcome
        })
    }

    /// Backup timer body. Runs on schedule whether or not anything changed.
    pub fn historical_save_tick(&self) -> SaveOutcome {
        if self.shutdown.load(Ordering::SeqCst) {
            return SaveOutcome::Skipped(SkipReason::ShuttingDown);
        }
        self.guarded_save(SaveKind::Historical)
    }

    /// Saves now, regardless of the dirty flag.
    pub fn force_save(&self) -> SaveOutcome {
        self.with_routine_timer_paused(|| {
            let was_dirty = self.dirty.swap(false, Ordering::SeqCst);
            let outcome = self.guarded_save(SaveKind::Forced);
            self.keep_dirty_if_deferred(was_dirty, &outcome);
            outcome
        })
    }

    // The flag is cleared before capture so changes made during a save stay
    // pending. A save put off by a bulk load hands pending changes back.
    fn keep_dirty_if_deferred(&self, was_dirty: bool, outcome: &SaveOutcome) {
        let deferred = matches!(
            outcome,
            SaveOutcome::Skipped(SkipReason::BulkLoadInProgress | SkipReason::NoRegion)
        );
        if was_dirty && deferred {
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Handles a named host event; `"Backup"` forces a save.
    pub fn on_generic_event(&self, function_name: &str) -> bool {
        if function_name != "Backup" {
            return false;
        }
        self.force_save();
        true
    }

    /// Final save during teardown. Only the first call does anything; every
    /// later trigger is a no-op.
    pub fn shutdown_save(&self) -> SaveOutcome {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return SaveOutcome::Skipped(SkipReason::AlreadyClosed);
        }
        self.set_state(StoreState::ShuttingDown);
        lock(&self.timers).close_all();

        let outcome = if self.saving_enabled() {
            self.guarded_save(SaveKind::Shutdown)
        } else {
            SaveOutcome::Skipped(SkipReason::Disabled)
        };
        self.set_state(StoreState::Closed);
        event!(Level::INFO, outcome = ?outcome, "snapshot store closed");
        outcome
    }

    /// Removes the current snapshot file. Later saves are skipped so the
    /// region is not written back.
    pub fn delete_region(&self) -> Result<()> {
        let _guard = lock(&self.save_lock);
        self.deleted.store(true, Ordering::SeqCst);
        let path = self.current_path();
        remove_if_exists(&path)?;
        event!(Level::INFO, path = %path.display(), "region snapshot deleted");
        Ok(())
    }

    fn with_routine_timer_paused<F>(&self, save: F) -> SaveOutcome
    where
        F: FnOnce() -> SaveOutcome,
    {
        if let Some(timer) = lock(&self.timers).routine.as_ref() {
            timer.stop();
        }
        let outcome = save();
        if !self.shutdown.load(Ordering::SeqCst) {
            if let Some(timer) = lock(&self.timers).routine.as_ref() {
                timer.start();
            }
        }
        outcome
    }

    // ========================================================================
    // Guarded save
    // ========================================================================

    fn guarded_save(&self, kind: SaveKind) -> SaveOutcome {
        let _guard = lock(&self.save_lock);

        if kind != SaveKind::Shutdown && self.shutdown.load(Ordering::SeqCst) {
            return SaveOutcome::Skipped(SkipReason::ShuttingDown);
        }
        if self.deleted.load(Ordering::SeqCst) {
            return SaveOutcome::Skipped(SkipReason::RegionDeleted);
        }
        let Some(info) = self.region_info() else {
            return SaveOutcome::Skipped(SkipReason::NoRegion);
        };
        if self.host.is_bulk_loading() {
            event!(Level::INFO, region = %info.region_name, "not saving region snapshot, objects are loading");
            return SaveOutcome::Skipped(SkipReason::BulkLoadInProgress);
        }

        let previous_state = self.set_state(StoreState::Saving);
        let span = info_span!(
            "snapshot.save",
            region = %info.region_name,
            historical = kind.is_historical()
        );
        let _enter = span.enter();

        self.flush_script_state();
        event!(Level::INFO, kind = ?kind, "saving region snapshot");
        let snapshot = self.capture(info);
        let outcome = self.write(kind, snapshot);

        let next_state = match previous_state {
            StoreState::ShuttingDown | StoreState::Closed => previous_state,
            _ => StoreState::Idle,
        };
        self.set_state(next_state);
        outcome
    }

    fn flush_script_state(&self) {
        for sink in &self.host.scripts {
            if let Err(err) = sink.save_state_saves() {
                event!(Level::WARN, error = %err, "script state save failed");
            }
        }
    }

    /// Builds a snapshot from live host state. A collaborator that fails only
    /// loses its own piece.
    fn capture(&self, info: RegionInfo) -> RegionSnapshot {
        let region_size = usize::try_from(info.size_x).unwrap_or_default();
        let mut snapshot = RegionSnapshot::new(info);

        if let Some(parcels) = self.host.parcels.as_ref() {
            match parcels.parcels() {
                Ok(list) => {
                    let mut seen = HashSet::new();
                    for parcel in list {
                        if seen.insert(parcel.global_id) {
                            snapshot.parcels.push(parcel);
                        } else {
                            event!(Level::WARN, parcel = %parcel.global_id, "duplicate parcel dropped");
                        }
                    }
                }
                Err(err) => event!(Level::WARN, error = %err, "parcel read failed, parcels omitted"),
            }
        }

        if let Some(terrain) = self.host.terrain.as_ref() {
            let mut capture = |kind: TerrainKind| match terrain.terrain(kind) {
                Ok(Some(map)) if map.size() != region_size => {
                    event!(
                        Level::WARN,
                        terrain = %kind,
                        size = map.size(),
                        region_size,
                        "terrain size does not match the region, buffer omitted"
                    );
                    false
                }
                Ok(Some(map)) => {
                    snapshot.set_buffer(kind, map.to_bytes());
                    true
                }
                Ok(None) => false,
                Err(err) => {
                    event!(Level::WARN, terrain = %kind, error = %err, "terrain read failed, buffer omitted");
                    false
                }
            };
            capture(TerrainKind::Terrain);
            capture(TerrainKind::RevertTerrain);
            if capture(TerrainKind::Water) {
                capture(TerrainKind::RevertWater);
            }
        }

        if let Some(entities) = self.host.entities.as_ref() {
            match entities.entities() {
                Ok(groups) => {
                    let mut changed = Vec::new();
                    for mut group in groups.into_iter().filter(|group| !group.is_transient()) {
                        if group.has_changed {
                            changed.push(group.group_id);
                            group.has_changed = false;
                        }
                        snapshot.groups.push(group);
                    }
                    if !changed.is_empty() {
                        if let Err(err) = entities.clear_changed(&changed) {
                            event!(Level::WARN, error = %err, "clearing changed flags failed");
                        }
                    }
                }
                Err(err) => event!(Level::WARN, error = %err, "entity read failed, objects omitted"),
            }
        }

        snapshot
    }

    fn write(&self, kind: SaveKind, snapshot: RegionSnapshot) -> SaveOutcome {
        if kind.is_historical() {
            let path = self.historical_path(&snapshot.region_info.region_name);
            let outcome = self.write_historical(&path, &snapshot);
            drop(snapshot);
            return outcome;
        }

        let target = AtomicTarget::new(self.current_path());
        if let Err(err) = target.stage(self.codec.as_ref(), &snapshot) {
            event!(Level::ERROR, error = %err, "failed to save region snapshot");
            return SaveOutcome::Failed(err.to_string());
        }
        if let Err(err) = target.commit() {
            target.discard();
            event!(Level::ERROR, error = %err, "failed to replace region snapshot");
            return SaveOutcome::Failed(err.to_string());
        }

        let region_name = snapshot.region_info.region_name.clone();
        drop(snapshot);

        if self.keep_previous_copy() && !self.previous_copy_taken.swap(true, Ordering::SeqCst) {
            let copy = self.historical_path(&region_name);
            if let Err(err) = self.copy_previous(target.target(), &copy) {
                event!(Level::WARN, error = %err, "previous snapshot copy failed");
            }
        }

        self.map_tile_needs_generated.store(true, Ordering::SeqCst);
        event!(Level::INFO, path = %target.target().display(), "region snapshot saved");
        SaveOutcome::Saved(target.target().to_path_buf())
    }

    fn write_historical(&self, path: &Path, snapshot: &RegionSnapshot) -> SaveOutcome {
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                event!(Level::ERROR, error = %err, "failed to create backup directory");
                return SaveOutcome::Failed(err.to_string());
            }
        }
        if !self.codec.save(path, snapshot) {
            let _ = remove_if_exists(path);
            event!(Level::ERROR, path = %path.display(), "failed to save historical backup");
            return SaveOutcome::Failed(format!("codec failed to write {}", path.display()));
        }
        event!(Level::INFO, path = %path.display(), "historical backup saved");
        SaveOutcome::Saved(path.to_path_buf())
    }

    fn copy_previous(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to)?;
        event!(Level::INFO, path = %to.display(), "previous snapshot copy kept");
        Ok(())
    }

    fn keep_previous_copy(&self) -> bool {
        self.config
            .read()
            .map(|config| config.save_previous_backup)
            .unwrap_or(false)
    }

    // ========================================================================
    // Paths and status
    // ========================================================================

    pub fn current_path(&self) -> PathBuf {
        let extension = self.codec.file_extension();
        match self.config.read() {
            Ok(config) => config.snapshot_path(extension),
            Err(poisoned) => poisoned.into_inner().snapshot_path(extension),
        }
    }

    /// `<backup dir>/<region name>--yyyy-MM-dd-HH-mm<ext>`.
    pub fn historical_path(&self, region_name: &str) -> PathBuf {
        let dir = match self.config.read() {
            Ok(config) => config.previous_backup_directory.clone(),
            Err(poisoned) => poisoned.into_inner().previous_backup_directory.clone(),
        };
        dir.join(format!(
            "{}{}{}",
            region_name,
            clock::backup_stamp(self.clock.now()),
            self.codec.file_extension()
        ))
    }

    pub fn region_info(&self) -> Option<RegionInfo> {
        match self.region.read() {
            Ok(region) => region.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn map_tile_needs_generated(&self) -> bool {
        self.map_tile_needs_generated.load(Ordering::SeqCst)
    }

    /// Returns the map tile flag and clears it.
    pub fn take_map_tile_request(&self) -> bool {
        self.map_tile_needs_generated.swap(false, Ordering::SeqCst)
    }

    pub fn state(&self) -> StoreState {
        *lock(&self.state)
    }

    fn set_state(&self, next: StoreState) -> StoreState {
        std::mem::replace(&mut *lock(&self.state), next)
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            state: self.state(),
            dirty: self.is_dirty(),
            backups_enabled: self.backups_enabled.load(Ordering::SeqCst),
            map_tile_needs_generated: self.map_tile_needs_generated(),
            previous_copy_taken: self.previous_copy_taken.load(Ordering::SeqCst),
            current_path: self.current_path(),
        }
    }
}

impl Drop for SnapshotStore {
    fn drop(&mut self) {
        lock(&self.timers).close_all();
    }
}
