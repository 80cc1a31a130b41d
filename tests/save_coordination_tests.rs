//! Mutual exclusion, atomic replacement and timer-driven saves

mod common;

use common::{StubMetadata, current_file, small_region, start_time, test_config};
use simstore::{
    AtomicTarget, BinaryRegionCodec, FixedClock, HostServices, InMemoryRegion, LoadSource,
    ManualScheduler, RegionSnapshot, Result, SaveOutcome, SceneObjectGroup, SceneObjectPart,
    SnapshotCodec, SnapshotStore, StoreError, TokioScheduler,
};
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Binary codec that takes its time and records how many encodes overlap.
#[derive(Default)]
struct SlowCodec {
    inner: BinaryRegionCodec,
    active: AtomicUsize,
    max_active: AtomicUsize,
    started: AtomicUsize,
    encodes: AtomicUsize,
    group_counts: Mutex<Vec<usize>>,
}

impl SlowCodec {
    fn wait_for_start(&self, previous: usize) {
        while self.started.load(Ordering::SeqCst) == previous {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl SnapshotCodec for SlowCodec {
    fn file_extension(&self) -> &'static str {
        self.inner.file_extension()
    }

    fn encode(&self, snapshot: &RegionSnapshot) -> Result<Vec<u8>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.group_counts.lock().unwrap().push(snapshot.groups.len());
        self.started.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        let bytes = self.inner.encode(snapshot);
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.encodes.fetch_add(1, Ordering::SeqCst);
        bytes
    }

    fn decode(&self, bytes: &[u8]) -> Result<RegionSnapshot> {
        self.inner.decode(bytes)
    }
}

/// Binary codec whose encode can be switched to fail.
#[derive(Default)]
struct FlakyCodec {
    inner: BinaryRegionCodec,
    fail: AtomicBool,
}

impl SnapshotCodec for FlakyCodec {
    fn file_extension(&self) -> &'static str {
        self.inner.file_extension()
    }

    fn encode(&self, snapshot: &RegionSnapshot) -> Result<Vec<u8>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Encode("disk full".to_string()));
        }
        self.inner.encode(snapshot)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RegionSnapshot> {
        self.inner.decode(bytes)
    }
}

fn build_store(
    dir: &TempDir,
    region: Arc<InMemoryRegion>,
    codec: Arc<dyn SnapshotCodec>,
) -> Arc<SnapshotStore> {
    let store = SnapshotStore::builder(StubMetadata::answering(small_region("Alpha")))
        .codec(codec)
        .host(HostServices::from_region(region))
        .scheduler(Arc::new(ManualScheduler::new()))
        .clock(Arc::new(FixedClock::new(start_time())))
        .build();
    store.initialize(test_config(dir.path())).unwrap();
    store
}

#[test]
fn test_concurrent_triggers_never_overlap() {
    let dir = TempDir::new().unwrap();
    let codec = Arc::new(SlowCodec::default());
    let region = Arc::new(InMemoryRegion::new());
    let store = build_store(&dir, region.clone(), codec.clone());
    store.load().unwrap();
    region
        .add_group(SceneObjectGroup::new(SceneObjectPart::new("Crate")))
        .unwrap();
    store.mark_dirty();

    let barrier = Arc::new(Barrier::new(3));
    let handles: Vec<_> = (0..3)
        .map(|i| {
            let store = store.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                match i {
                    0 => store.force_save(),
                    1 => store.historical_save_tick(),
                    _ => store.routine_save_tick(),
                }
            })
        })
        .collect();
    let outcomes: Vec<SaveOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(codec.max_active.load(Ordering::SeqCst), 1);
    assert!(outcomes[0].is_saved());
    assert!(outcomes[1].is_saved());
    assert!(codec.encodes.load(Ordering::SeqCst) >= 3);
    assert_eq!(
        BinaryRegionCodec::new()
            .load(&current_file(dir.path()))
            .unwrap()
            .groups
            .len(),
        1
    );
}

#[test]
fn test_save_started_later_waits_and_writes_newer_state() {
    let dir = TempDir::new().unwrap();
    let codec = Arc::new(SlowCodec::default());
    let region = Arc::new(InMemoryRegion::new());
    let store = build_store(&dir, region.clone(), codec.clone());
    store.load().unwrap();
    region
        .add_group(SceneObjectGroup::new(SceneObjectPart::new("Crate")))
        .unwrap();
    store.mark_dirty();

    let baseline = codec.started.load(Ordering::SeqCst);
    let routine = {
        let store = store.clone();
        thread::spawn(move || store.routine_save_tick())
    };
    codec.wait_for_start(baseline);

    region
        .add_group(SceneObjectGroup::new(SceneObjectPart::new("Barrel")))
        .unwrap();
    let forced = {
        let store = store.clone();
        thread::spawn(move || store.force_save())
    };

    assert!(forced.join().unwrap().is_saved());
    assert!(routine.join().unwrap().is_saved());
    assert_eq!(codec.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(codec.group_counts.lock().unwrap()[baseline..], [1, 2]);

    let saved = BinaryRegionCodec::new()
        .load(&current_file(dir.path()))
        .unwrap();
    assert_eq!(saved.groups.len(), 2);
}

#[test]
fn test_failed_save_leaves_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let codec = Arc::new(FlakyCodec::default());
    let region = Arc::new(InMemoryRegion::new());
    let store = build_store(&dir, region.clone(), codec.clone());
    store.load().unwrap();
    let before = fs::read(current_file(dir.path())).unwrap();
    assert!(store.take_map_tile_request());

    region
        .add_group(SceneObjectGroup::new(SceneObjectPart::new("Crate")))
        .unwrap();
    codec.fail.store(true, Ordering::SeqCst);
    assert!(matches!(store.force_save(), SaveOutcome::Failed(_)));

    assert_eq!(fs::read(current_file(dir.path())).unwrap(), before);
    assert!(!AtomicTarget::new(current_file(dir.path())).temp().exists());
    assert!(!store.map_tile_needs_generated());

    codec.fail.store(false, Ordering::SeqCst);
    assert!(store.force_save().is_saved());
    assert_ne!(fs::read(current_file(dir.path())).unwrap(), before);
}

#[test]
fn test_interrupted_save_keeps_old_snapshot_readable() {
    let dir = TempDir::new().unwrap();
    let region = Arc::new(InMemoryRegion::new());
    let store = build_store(&dir, region, Arc::new(BinaryRegionCodec::new()));
    store.load().unwrap();

    // A save that died after writing the temp file but before the rename.
    let mut newer = RegionSnapshot::new(small_region("Renamed"));
    newer
        .groups
        .push(SceneObjectGroup::new(SceneObjectPart::new("Crate")));
    let target = AtomicTarget::new(current_file(dir.path()));
    target.stage(&BinaryRegionCodec::new(), &newer).unwrap();
    assert!(target.temp().exists());

    let reopened = build_store(
        &dir,
        Arc::new(InMemoryRegion::new()),
        Arc::new(BinaryRegionCodec::new()),
    );
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.source, LoadSource::Current);
    assert_eq!(loaded.info.region_name, "Alpha");
    assert!(reopened.load_objects().is_empty());

    assert!(reopened.force_save().is_saved());
    assert!(!target.temp().exists());
}

#[tokio::test(start_paused = true)]
async fn test_tokio_timer_drives_routine_save() {
    let dir = TempDir::new().unwrap();
    let region = Arc::new(InMemoryRegion::new());
    let store = SnapshotStore::builder(StubMetadata::answering(small_region("Alpha")))
        .host(HostServices::from_region(region))
        .scheduler(Arc::new(TokioScheduler::current()))
        .build();
    store
        .initialize(test_config(dir.path()).time_between_saves(1))
        .unwrap();
    store.load().unwrap();
    fs::remove_file(current_file(dir.path())).unwrap();

    store.mark_dirty();
    tokio::time::sleep(Duration::from_secs(61)).await;
    for _ in 0..200 {
        if current_file(dir.path()).exists() {
            break;
        }
        tokio::task::yield_now().await;
        thread::sleep(Duration::from_millis(5));
    }

    assert!(current_file(dir.path()).exists());
    assert!(!store.is_dirty());
}
