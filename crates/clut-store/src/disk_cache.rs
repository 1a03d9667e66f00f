//! Persistent cache of generated CLF transforms.
//!
//! Each entry is a gzip-compressed CLF document named after the SHA-256 of
//! its cache key. Recency is tracked through file modification times: a hit
//! refreshes the time, and [`DiskCache::trim`] drops the oldest files.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use clut_core::Fingerprint;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Extension of cache files.
pub const CACHE_EXT: &str = "clfz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Directory of gzip-compressed CLF files keyed by string.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    max_entries: usize,
}

impl DiskCache {
    /// Cache rooted at `dir`, keeping at most `max_entries` files after a trim.
    pub fn new(dir: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            dir: dir.into(),
            max_entries,
        }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name used for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Fingerprint::of_bytes(key.as_bytes());
        self.dir.join(format!("{}.{CACHE_EXT}", digest.as_str()))
    }

    /// Path of the entry for `key`, if present. Refreshes its modification time.
    pub fn lookup(&self, key: &str) -> Option<PathBuf> {
        let path = self.path_for(key);
        if !path.is_file() {
            return None;
        }
        let touched = File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(SystemTime::now()));
        if let Err(e) = touched {
            debug!(path = %path.display(), error = %e, "cannot refresh cache entry time");
        }
        Some(path)
    }

    /// Writes `data` as the entry for `key`, compressing it unless it
    /// already is gzip. Returns the entry path.
    pub fn store(&self, key: &str, data: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        if data.starts_with(&GZIP_MAGIC) {
            tmp.write_all(data)?;
        } else {
            let mut enc = GzEncoder::new(tmp.as_file_mut(), Compression::default());
            enc.write_all(data)?;
            enc.finish()?;
        }
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(path = %path.display(), "stored disk cache entry");
        Ok(path)
    }

    /// Deletes the entry for `key`, if any.
    pub fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "cannot remove cache entry");
            }
        }
    }

    /// Cache files with their modification times, oldest first.
    pub fn entries(&self) -> io::Result<Vec<(PathBuf, SystemTime)>> {
        let rd = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut out = Vec::new();
        for entry in rd {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_EXT) {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                out.push((path, meta.modified()?));
            }
        }
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }

    /// Deletes the oldest files beyond the entry limit. Returns how many went.
    pub fn trim(&self) -> io::Result<usize> {
        let entries = self.entries()?;
        let excess = entries.len().saturating_sub(self.max_entries);
        for (path, _) in entries.iter().take(excess) {
            fs::remove_file(path)?;
        }
        if excess > 0 {
            debug!(removed = excess, dir = %self.dir.display(), "trimmed disk cache");
        }
        Ok(excess)
    }

    /// Deletes every cache file. Returns how many went.
    pub fn clear(&self) -> io::Result<usize> {
        let entries = self.entries()?;
        for (path, _) in &entries {
            fs::remove_file(path)?;
        }
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::time::Duration;

    use flate2::read::GzDecoder;

    fn set_age(path: &Path, secs_ago: u64) {
        let t = SystemTime::now() - Duration::from_secs(secs_ago);
        File::options().write(true).open(path).unwrap().set_modified(t).unwrap();
    }

    #[test]
    fn test_store_compresses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), 10);
        let path = cache.store("k", b"<ProcessList/>").unwrap();
        assert_eq!(path, cache.path_for("k"));
        assert_eq!(path.extension().unwrap(), CACHE_EXT);

        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(&GZIP_MAGIC));
        let mut text = String::new();
        GzDecoder::new(&raw[..]).read_to_string(&mut text).unwrap();
        assert_eq!(text, "<ProcessList/>");
    }

    #[test]
    fn test_lookup_refreshes_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), 10);
        assert!(cache.lookup("k").is_none());

        let path = cache.store("k", b"x").unwrap();
        set_age(&path, 3600);
        let before = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(cache.lookup("k").unwrap(), path);
        let after = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(after > before);
    }

    #[test]
    fn test_trim_removes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), 2);
        let keys = ["a", "b", "c", "d"];
        for (i, k) in keys.iter().enumerate() {
            let p = cache.store(k, k.as_bytes()).unwrap();
            // a is the oldest, d the newest
            set_age(&p, 1000 - i as u64 * 100);
        }
        // unrelated files are left alone
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(cache.trim().unwrap(), 2);
        assert!(!cache.path_for("a").exists());
        assert!(!cache.path_for("b").exists());
        assert!(cache.path_for("c").exists());
        assert!(cache.path_for("d").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(cache.trim().unwrap(), 0);
    }

    #[test]
    fn test_clear_and_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("sub"), 5);
        assert_eq!(cache.clear().unwrap(), 0);
        cache.store("a", b"1").unwrap();
        cache.store("b", b"2").unwrap();
        assert_eq!(cache.entries().unwrap().len(), 2);
        cache.remove("a");
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.entries().unwrap().is_empty());
    }
}
