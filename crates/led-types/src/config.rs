use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::order::ByteOrder;

/// Default number of records per I/O batch.
pub const DEFAULT_BATCH_RECORDS: usize = 4096;

/// Default zstd compression level.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Payload codec of a Led file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codec", rename_all = "lowercase")]
pub enum Compression {
    /// Raw record bytes, bulk-copied. Used for temporary chunk files.
    None,
    /// Streaming zstd frame over the whole payload.
    Zstd { level: i32 },
}

impl Default for Compression {
    fn default() -> Self {
        Self::Zstd {
            level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

impl Compression {
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Configuration threaded through allocators, writers and readers.
///
/// There is no process-wide state: every component takes the configuration
/// it should use, and call sites override fields with the `with_*` setters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedConfig {
    /// Byte order of record storage.
    pub byte_order: ByteOrder,
    /// Records per write/read batch.
    pub batch_records: usize,
    /// Payload codec for files written with this configuration.
    ///
    /// The file header does not record the codec, so files must be read
    /// with the codec they were written with. A raw read of a zstd payload
    /// decodes frame bytes as records.
    pub compression: Compression,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::default(),
            batch_records: DEFAULT_BATCH_RECORDS,
            compression: Compression::default(),
        }
    }
}

impl LedConfig {
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_batch_records(mut self, batch_records: usize) -> Self {
        self.batch_records = batch_records;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Same configuration with compression turned off (temporary files).
    pub fn uncompressed(&self) -> Self {
        self.clone().with_compression(Compression::None)
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.batch_records == 0 {
            return Err(TypeError::InvalidConfig(
                "batch_records must be greater than zero".into(),
            ));
        }
        if let Compression::Zstd { level } = self.compression {
            if !(1..=22).contains(&level) {
                return Err(TypeError::InvalidConfig(format!(
                    "zstd level {level} outside 1..=22"
                )));
            }
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

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, TypeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TypeError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
