use crate::core::{Result, StoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Save policy for a snapshot store.
///
/// Intervals are in minutes; zero disables that timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Enables routine and historical saves
    pub save_changes: bool,

    /// Minutes between routine saves
    pub time_between_saves: u64,

    /// Copy the current snapshot into the backup directory once per run
    pub save_previous_backup: bool,

    /// Directory for historical backups
    pub previous_backup_directory: PathBuf,

    /// Directory for the current snapshot; empty or `/` means the working directory
    pub store_directory: PathBuf,

    /// Enables the historical backup timer
    pub save_timed_previous_backup: bool,

    /// Minutes between historical backups
    pub time_between_backup_saves: u64,

    /// Base name of the current snapshot file
    pub file_name: String,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            save_changes: true,
            time_between_saves: 5,
            save_previous_backup: true,
            previous_backup_directory: PathBuf::from("Backups"),
            store_directory: PathBuf::new(),
            save_timed_previous_backup: true,
            time_between_backup_saves: 24 * 60,
            file_name: "sim".to_string(),
        }
    }

    pub fn save_changes(mut self, enabled: bool) -> Self {
        self.save_changes = enabled;
        self
    }

    pub fn time_between_saves(mut self, minutes: u64) -> Self {
        self.time_between_saves = minutes;
        self
    }

    pub fn save_previous_backup(mut self, enabled: bool) -> Self {
        self.save_previous_backup = enabled;
        self
    }

    pub fn previous_backup_directory<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.previous_backup_directory = dir.as_ref().to_path_buf();
        self
    }

    pub fn store_directory<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.store_directory = dir.as_ref().to_path_buf();
        self
    }

    pub fn save_timed_previous_backup(mut self, enabled: bool) -> Self {
        self.save_timed_previous_backup = enabled;
        self
    }

    pub fn time_between_backup_saves(mut self, minutes: u64) -> Self {
        self.time_between_backup_saves = minutes;
        self
    }

    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = name.to_string();
        self
    }

    /// Routine save interval, if that timer should run.
    pub fn routine_interval(&self) -> Option<Duration> {
        (self.save_changes && self.time_between_saves > 0)
            .then(|| Duration::from_secs(self.time_between_saves * 60))
    }

    /// Historical backup interval, if that timer should run.
    pub fn historical_interval(&self) -> Option<Duration> {
        (self.save_changes
            && self.save_timed_previous_backup
            && self.time_between_backup_saves > 0)
            .then(|| Duration::from_secs(self.time_between_backup_saves * 60))
    }

    /// Path of the current snapshot for a codec extension such as `.abackup`.
    pub fn snapshot_path(&self, extension: &str) -> PathBuf {
        let file = format!("{}{}", self.file_name, extension);
        if self.store_directory.as_os_str().is_empty() || self.store_directory == Path::new("/") {
            PathBuf::from(file)
        } else {
            self.store_directory.join(file)
        }
    }

    /// Parses the `[FileBasedSimulationData]` and `[Startup]` sections of a
    /// TOML document. Absent keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(source)
            .map_err(|e| StoreError::Config(format!("Invalid store configuration: {}", e)))?;
        let mut config = Self::new();

        if let Some(section) = file.persistence {
            if let Some(value) = section.save_changes {
                config.save_changes = value;
            }
            if let Some(value) = section.time_between_saves {
                config.time_between_saves = value;
            }
            if let Some(value) = section.save_previous_backup {
                config.save_previous_backup = value;
                config.save_timed_previous_backup = value;
            }
            if let Some(value) = section.previous_backup_directory {
                config.previous_backup_directory = value;
            }
            if let Some(value) = section.store_backup_directory {
                config.store_directory = value;
            }
            if let Some(value) = section.save_timed_previous_backup {
                config.save_timed_previous_backup = value;
            }
            if let Some(value) = section.time_between_backup_saves {
                config.time_between_backup_saves = value;
            }
        }
        if let Some(name) = file.startup.and_then(|startup| startup.region_data_file_name) {
            config.file_name = name;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(StoreError::Config(
                "RegionDataFileName cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(rename = "FileBasedSimulationData")]
    persistence: Option<PersistenceSection>,
    #[serde(rename = "Startup")]
    startup: Option<StartupSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PersistenceSection {
    save_changes: Option<bool>,
    time_between_saves: Option<u64>,
    save_previous_backup: Option<bool>,
    previous_backup_directory: Option<PathBuf>,
    store_backup_directory: Option<PathBuf>,
    save_timed_previous_backup: Option<bool>,
    time_between_backup_saves: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartupSection {
    region_data_file_name: Option<String>,
}
