use std::path::{Path, PathBuf};

use led_types::TypeError;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// Default number of records sorted in memory per chunk.
pub const DEFAULT_RECORDS_IN_MEMORY: usize = 1 << 20;

/// Configuration of an external sort or spilling builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Records held in memory at once; one chunk file per full buffer.
    pub records_in_memory: usize,
    /// Parent of the per-run working directory. `None` uses the system
    /// temporary directory.
    pub work_dir: Option<PathBuf>,
    /// Re-read every chunk and the final output to check their order.
    pub verify_chunks: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            records_in_memory: DEFAULT_RECORDS_IN_MEMORY,
            work_dir: None,
            verify_chunks: false,
        }
    }
}

impl SortConfig {
    pub fn with_records_in_memory(mut self, records: usize) -> Self {
        self.records_in_memory = records;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn with_verify_chunks(mut self, verify: bool) -> Self {
        self.verify_chunks = verify;
        self
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        if self.records_in_memory == 0 {
            return Err(TypeError::InvalidConfig(
                "records_in_memory must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, TypeError> {
        let config: Self =
            toml::from_str(s).map_err(|e| TypeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, TypeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TypeError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// A fresh working directory, removed when the returned guard drops.
    pub(crate) fn temp_dir(&self, prefix: &str) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        match &self.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
    }
}
