// src/config/store.rs
use crate::config::MinerConfig;
use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Persistence seam for the mining configuration.
///
/// The coordinator saves the current configuration after every accepted
/// block so a restart resumes with the last known-good settings.
pub trait ConfigStore: Send + Sync {
    /// Persists the given configuration.
    fn save(&self, config: &MinerConfig) -> Result<(), MinerError>;
}

/// [`ConfigStore`] writing TOML to a fixed path.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Creates a store persisting to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileConfigStore { path: path.into() }
    }
}

impl ConfigStore for FileConfigStore {
    fn save(&self, config: &MinerConfig) -> Result<(), MinerError> {
        config.save(&self.path)
    }
}
