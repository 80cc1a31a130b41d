use anyhow::{Context, Result, anyhow};
use simstore::{
    AtomicTarget, BinaryRegionCodec, LegacyArchiveCodec, RegionSnapshot, SnapshotCodec,
    TerrainKind,
};
use std::fs;
use std::path::{Path, PathBuf};

fn codec_for(path: &Path) -> Box<dyn SnapshotCodec> {
    let legacy = LegacyArchiveCodec::new();
    let is_legacy = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| format!(".{}", ext) == legacy.file_extension());
    if is_legacy {
        Box::new(legacy)
    } else {
        Box::new(BinaryRegionCodec::new())
    }
}

fn read_snapshot(path: &Path, codec: &dyn SnapshotCodec) -> Result<RegionSnapshot> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    codec
        .decode(&bytes)
        .with_context(|| format!("Failed to decode '{}'", path.display()))
}

pub fn inspect(path: &Path) -> Result<()> {
    let codec = codec_for(path);
    let snapshot = read_snapshot(path, codec.as_ref())?;
    let info = &snapshot.region_info;

    println!("{}", snapshot.summary());
    println!("  id:        {}", info.region_id);
    println!("  type:      {}", info.region_type);
    println!(
        "  location:  {},{} (grid {:?})",
        info.loc_x,
        info.loc_y,
        info.grid_location()
    );
    println!("  size:      {}x{}", info.size_x, info.size_y);
    println!("  capacity:  {}", info.object_capacity);
    for kind in TerrainKind::ALL {
        let state = match (snapshot.buffer(kind), snapshot.terrain_map(kind)) {
            (None, _) => "absent".to_string(),
            (Some(_), Some(map)) => format!("{}x{}", map.size(), map.size()),
            (Some(bytes), None) => format!("{} bytes, does not match region size", bytes.len()),
        };
        println!("  {:<14} {}", format!("{}:", kind), state);
    }
    Ok(())
}

pub fn migrate(legacy: &Path, out: Option<&Path>) -> Result<PathBuf> {
    let source = LegacyArchiveCodec::new();
    let snapshot = read_snapshot(legacy, &source)?;

    let codec = BinaryRegionCodec::new();
    let out = match out {
        Some(out) => out.to_path_buf(),
        None => legacy.with_extension(codec.file_extension().trim_start_matches('.')),
    };
    if out == legacy {
        return Err(anyhow!("Refusing to overwrite the legacy archive itself"));
    }

    AtomicTarget::new(&out)
        .write(&codec, &snapshot)
        .with_context(|| format!("Failed to write '{}'", out.display()))?;
    println!("Migrated {} -> {}", legacy.display(), out.display());
    println!("{}", snapshot.summary());
    Ok(out)
}
