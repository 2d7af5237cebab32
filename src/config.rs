use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The closed set of runtime options for a scan/clean run, as a value
/// callers construct explicitly and pass in rather than a global — a plain
/// struct a test harness can instantiate many times over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub dry_run: bool,
    pub auto_backup: bool,
    pub require_backup_on_delete: bool,
    pub parallel_workers: usize,
    pub verbose_logging: bool,
    pub min_safety_score: u8,
    pub aggressive_mode: bool,
    pub delete_mode: DeleteMode,
}

/// A single explicit deletion policy, defaulting to the reversible option,
/// rather than mixing unlink and move-to-trash behavior implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Unlink,
    Trash,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            dry_run: false,
            auto_backup: false,
            require_backup_on_delete: false,
            parallel_workers: num_cpus::get(),
            verbose_logging: false,
            min_safety_score: 70,
            aggressive_mode: false,
            delete_mode: DeleteMode::Trash,
        }
    }
}

/// Per-user application-data directory layout:
/// `<app-data>/config/{application,scan,backup,security,user_preferences}.json`.
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(app_data_dir: PathBuf) -> Self {
        ConfigStore { root: app_data_dir }
    }

    /// Locates the platform's per-user application-data directory, falling
    /// back to the home directory if the platform dirs crate cannot resolve
    /// one.
    pub fn discover(app_name: &str) -> CoreResult<Self> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| CoreError::Validation("no application-data directory available".into()))?;
        Ok(ConfigStore {
            root: base.join(app_name),
        })
    }

    fn config_path(&self, section: &str) -> PathBuf {
        self.root.join("config").join(format!("{section}.json"))
    }

    pub fn load(&self) -> CoreResult<CoreConfig> {
        let path = self.config_path("application");
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(CoreError::from),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CoreConfig::default()),
            Err(err) => Err(CoreError::from(err)),
        }
    }

    pub fn save(&self, config: &CoreConfig) -> CoreResult<()> {
        let path = self.config_path("application");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_vec_pretty(config)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("registry").join("backups.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_disk() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().to_path_buf());
        let mut config = CoreConfig::default();
        config.min_safety_score = 55;
        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.min_safety_score, 55);
    }

    #[test]
    fn missing_config_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().to_path_buf());
        let loaded = store.load().unwrap();
        assert_eq!(
            loaded.min_safety_score,
            CoreConfig::default().min_safety_score
        );
    }
}
