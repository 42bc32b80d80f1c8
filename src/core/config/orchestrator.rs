use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads and rewrites one config file.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store for the default config location.
    pub fn open_default() -> Result<Self, ConfigError> {
        Config::config_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from_path(&self.path)
    }

    /// Loads the current file, applies `mutator` and writes the result back.
    /// Nothing is written if the mutator fails.
    pub fn mutate<F, T>(&self, mutator: F) -> Result<T, Box<dyn std::error::Error>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn std::error::Error>>,
    {
        let mut working = self.load()?;
        let result = mutator(&mut working)?;
        working.save_to_path(&self.path)?;
        debug!(path = %self.path.display(), "config saved");
        Ok(result)
    }
}
