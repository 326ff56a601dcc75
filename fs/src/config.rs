use std::path::PathBuf;
use std::sync::Arc;

use bundle_core::signing::SchemeRegistry;

/// Default read granularity for streamed hashing and uploads.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Settings shared by file-backed items and bundles.
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Where the builder allocates item files; `None` = system temp dir.
    pub temp_dir: Option<PathBuf>,
    /// Chunk size for streamed reads.
    pub chunk_size: usize,
    pub registry: Arc<SchemeRegistry>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            registry: SchemeRegistry::shared(),
        }
    }
}

impl FsConfig {
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_registry(mut self, registry: Arc<SchemeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
