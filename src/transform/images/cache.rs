// src/transform/images/cache.rs

//! Change-skip cache for compressed images.
//!
//! Entries map a project-relative path to the blake3 hash of the source
//! bytes that were last compressed successfully.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::types::CacheStorageMode;

/// Relative path (from the project root) of the persisted cache.
pub const CACHE_FILE_PATH: &str = ".assetpipe/images";

/// Hex blake3 hash of a file's contents.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Abstract storage for image hashes.
///
/// Lookups are served from memory; [`ImageCache::begin_run`] is the only
/// place persisted entries are read.
pub trait ImageCache: Send + Sync {
    /// Reload persisted entries and drop those for files that no longer
    /// exist. Called once before a run looks anything up.
    fn begin_run(&mut self, present: &[&str]) -> Result<()>;
    fn load(&self, path: &str) -> Option<&str>;
    fn save(&mut self, path: &str, hash: &str) -> Result<()>;

    /// Is `hash` what was last compressed for `path`?
    fn is_fresh(&self, path: &str, hash: &str) -> bool {
        self.load(path) == Some(hash)
    }
}

/// Build the cache for the configured storage mode.
pub fn open_cache(mode: CacheStorageMode, root: &Path, fs: Arc<dyn FileSystem>) -> Box<dyn ImageCache> {
    match mode {
        CacheStorageMode::File => Box::new(FileImageCache::new(root.to_path_buf(), fs)),
        CacheStorageMode::Memory => Box::new(MemoryImageCache::default()),
    }
}

fn retain_present(map: &mut BTreeMap<String, String>, present: &[&str]) -> usize {
    let before = map.len();
    map.retain(|k, _| present.contains(&k.as_str()));
    before - map.len()
}

/// Stores hashes in `<root>/.assetpipe/images`, one `path hash` per line.
pub struct FileImageCache {
    file: PathBuf,
    fs: Arc<dyn FileSystem>,
    entries: BTreeMap<String, String>,
}

impl FileImageCache {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            file: root.join(CACHE_FILE_PATH),
            fs,
            entries: BTreeMap::new(),
        }
    }

    fn read_file(&self) -> Result<BTreeMap<String, String>> {
        if !self.fs.is_file(&self.file) {
            return Ok(BTreeMap::new());
        }
        let text = self
            .fs
            .read_to_string(&self.file)
            .with_context(|| format!("reading image cache at {}", self.file.display()))?;

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (path, hash) = line
                    .trim()
                    .rsplit_once(char::is_whitespace)
                    .with_context(|| format!("malformed image cache entry {line:?} in {}", self.file.display()))?;
                Ok((path.trim().to_string(), hash.to_string()))
            })
            .collect()
    }

    fn flush(&self) -> Result<()> {
        let mut out = String::new();
        for (path, hash) in &self.entries {
            out.push_str(path);
            out.push(' ');
            out.push_str(hash);
            out.push('\n');
        }
        self.fs
            .write(&self.file, out.as_bytes())
            .with_context(|| format!("writing image cache at {}", self.file.display()))
    }
}

impl ImageCache for FileImageCache {
    fn begin_run(&mut self, present: &[&str]) -> Result<()> {
        self.entries = self.read_file()?;
        let removed = retain_present(&mut self.entries, present);
        if removed > 0 {
            self.flush()?;
            info!(removed, "pruned stale image hashes (file)");
        }
        Ok(())
    }

    fn load(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    fn save(&mut self, path: &str, hash: &str) -> Result<()> {
        self.entries.insert(path.to_string(), hash.to_string());
        self.flush()?;
        debug!(path = %path, hash = %hash, "stored image hash (file)");
        Ok(())
    }
}

/// Keeps hashes for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryImageCache {
    map: BTreeMap<String, String>,
}

impl ImageCache for MemoryImageCache {
    fn begin_run(&mut self, present: &[&str]) -> Result<()> {
        let removed = retain_present(&mut self.map, present);
        if removed > 0 {
            info!(removed, "pruned stale image hashes (memory)");
        }
        Ok(())
    }

    fn load(&self, path: &str) -> Option<&str> {
        self.map.get(path).map(String::as_str)
    }

    fn save(&mut self, path: &str, hash: &str) -> Result<()> {
        self.map.insert(path.to_string(), hash.to_string());
        debug!(path = %path, hash = %hash, "stored image hash (memory)");
        Ok(())
    }
}
