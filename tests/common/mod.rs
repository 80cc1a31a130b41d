#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use simstore::{
    FixedClock, HostServices, InMemoryRegion, ManualScheduler, MetadataProvider, RegionInfo,
    Result, SnapshotStore, StoreConfig, StoreError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Hands out a fixed answer instead of asking an operator.
pub struct StubMetadata {
    answer: Mutex<Option<RegionInfo>>,
    calls: AtomicUsize,
}

impl StubMetadata {
    pub fn answering(info: RegionInfo) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Some(info)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_answer(&self, info: RegionInfo) {
        *self.answer.lock().unwrap() = Some(info);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetadataProvider for StubMetadata {
    fn resolve(&self, _existing: Option<&RegionInfo>) -> Result<RegionInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .ok_or(StoreError::InputClosed)
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 6)
        .unwrap()
        .and_hms_opt(7, 8, 9)
        .unwrap()
}

pub fn small_region(name: &str) -> RegionInfo {
    RegionInfo::new(name).with_location(1000, 1000).with_size(4, 4)
}

pub fn test_config(dir: &Path) -> StoreConfig {
    StoreConfig::new()
        .store_directory(dir)
        .previous_backup_directory(dir.join("Backups"))
        .save_previous_backup(false)
}

pub fn current_file(dir: &Path) -> PathBuf {
    dir.join("sim.abackup")
}

pub struct Harness {
    pub region: Arc<InMemoryRegion>,
    pub metadata: Arc<StubMetadata>,
    pub scheduler: ManualScheduler,
    pub clock: Arc<FixedClock>,
    pub store: Arc<SnapshotStore>,
}

impl Harness {
    pub fn new(dir: &Path) -> Self {
        Self::with_host(test_config(dir), HostServices::from_region)
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_host(config, HostServices::from_region)
    }

    pub fn with_host<F>(config: StoreConfig, host: F) -> Self
    where
        F: FnOnce(Arc<InMemoryRegion>) -> HostServices,
    {
        let region = Arc::new(InMemoryRegion::new());
        let metadata = StubMetadata::answering(small_region("Alpha"));
        let scheduler = ManualScheduler::new();
        let clock = Arc::new(FixedClock::new(start_time()));
        let store = SnapshotStore::builder(metadata.clone())
            .host(host(region.clone()))
            .scheduler(Arc::new(scheduler.clone()))
            .clock(clock.clone())
            .build();
        store.initialize(config).unwrap();

        Self {
            region,
            metadata,
            scheduler,
            clock,
            store,
        }
    }
}
