use anyhow::{Context, Result};
use simstore::{
    ConsoleMetadataProvider, HostServices, InMemoryRegion, SaveOutcome, SnapshotStore,
    StoreConfig, StoreError, TokioScheduler,
};
use std::io::{BufReader, Stdin, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, event};

type StdioConsole = ConsoleMetadataProvider<BufReader<Stdin>, Stdout>;

const HELP: &str = "commands: save, backup, status, update region info, delete region, quit";

pub async fn run(config: Option<PathBuf>, store_dir: Option<PathBuf>) -> Result<()> {
    let mut store_config = match config.as_deref() {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display()))?,
        None => StoreConfig::new(),
    };
    if let Some(dir) = store_dir {
        store_config = store_config.store_directory(dir);
    }

    let region = Arc::new(InMemoryRegion::new());
    let console: Arc<StdioConsole> = Arc::new(ConsoleMetadataProvider::stdio());
    let store = SnapshotStore::builder(console.clone())
        .host(HostServices::from_region(region.clone()))
        .scheduler(Arc::new(TokioScheduler::current()))
        .build();

    store.initialize(store_config)?;

    let loader = store.clone();
    let loaded = tokio::task::spawn_blocking(move || loader.load())
        .await
        .context("Region load task failed")??;

    if let Some(snapshot) = store.take_loaded_snapshot() {
        region
            .apply_snapshot(&snapshot)
            .map_err(StoreError::from)
            .context("Failed to apply the loaded region")?;
    }
    event!(
        Level::INFO,
        region = %loaded.info.region_name,
        new_region = loaded.is_new_region,
        source = ?loaded.source,
        objects = region.group_count(),
        "region ready"
    );
    println!("{}", HELP);

    // stdin reads block, so commands run on a plain thread that is not
    // joined on exit.
    let (done_tx, done_rx) = oneshot::channel();
    let commands = store.clone();
    std::thread::spawn(move || {
        command_loop(&commands, &console);
        let _ = done_tx.send(());
    });

    tokio::select! {
        _ = done_rx => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            event!(Level::INFO, "interrupted");
        }
    }

    let closing = store.clone();
    let outcome = tokio::task::spawn_blocking(move || closing.shutdown_save())
        .await
        .context("Shutdown save task failed")?;
    report(&outcome);
    Ok(())
}

fn command_loop(store: &SnapshotStore, console: &StdioConsole) {
    loop {
        let line = match console.prompt("simstore", "") {
            Ok(line) => line,
            Err(StoreError::InputClosed) => return,
            Err(err) => {
                event!(Level::ERROR, error = %err, "failed to read command");
                return;
            }
        };

        match line.to_lowercase().as_str() {
            "" => {}
            "save" => report(&store.force_save()),
            "backup" => report(&store.historical_save_tick()),
            "status" => {
                let status = store.status();
                println!(
                    "state={} dirty={} backups_enabled={} map_tile_pending={} previous_copy_taken={} path={}",
                    status.state,
                    status.dirty,
                    status.backups_enabled,
                    status.map_tile_needs_generated,
                    status.previous_copy_taken,
                    status.current_path.display()
                );
            }
            "update region info" => match store.update_region_info() {
                Ok(info) => println!("Region '{}' updated", info.region_name),
                Err(StoreError::InputClosed) => return,
                Err(err) => println!("Region update failed: {}", err),
            },
            "delete region" => match store.delete_region() {
                Ok(()) => println!("Region snapshot deleted"),
                Err(err) => println!("Delete failed: {}", err),
            },
            "quit" | "exit" | "shutdown" => return,
            "help" => println!("{}", HELP),
            other => println!("Unknown command '{}'. {}", other, HELP),
        }
    }
}

fn report(outcome: &SaveOutcome) {
    match outcome {
        SaveOutcome::Saved(path) => println!("Saved {}", path.display()),
        SaveOutcome::Skipped(reason) => println!("Save skipped: {:?}", reason),
        SaveOutcome::Failed(err) => println!("Save failed: {}", err),
    }
}
