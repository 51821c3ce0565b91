//! Live active map plus a table of archived maps on disk.
//!
//! Shared state sits behind one mutex owned by the cache. Parsing and
//! decompression run outside it; results are swapped in whole, so a reader
//! sees either the old or the new entry. The active log track has its own lock.

mod config;
mod discovery;

use std::fs::{self, File};
use std::io::{BufReader, Seek};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::{read_map_package, read_path_package, CodecError, LogCursor, MapPackage, PathPackage, SlamTrack};

pub use config::{CacheConfig, DEFAULT_ACTIVE_DIR, DEFAULT_ARCHIVE_DIR, DEFAULT_SLAM_LOG, MAP_FILE_PREFIX};
pub use discovery::{archive_number, MapFiles};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("{role} directory {} missing or not a directory", .path.display())]
    InvalidDirectory { role: &'static str, path: PathBuf },
}

/// Result of an active-map refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshOutcome {
    Unchanged,
    Reloaded,
    Cleared,
}

/// Odometry track of the active map and how far into its log it got.
#[derive(Default)]
struct ActiveTrack {
    track: SlamTrack,
    cursor: LogCursor,
}

impl ActiveTrack {
    /// Parses log lines completed since the last call. A log whose already
    /// read part changed (rewritten, truncated or replaced) is read from scratch.
    fn catch_up(&mut self, slam: &Path) -> Result<u64, CodecError> {
        let mut reader = BufReader::new(File::open(slam)?);
        if !self.cursor.matches_prefix(&mut reader)? {
            debug!(slam = %slam.display(), lines = self.cursor.lines, "slam log rewritten, re-reading");
            *self = Self::default();
            reader.rewind()?;
        }
        self.track.read_complete_from(&mut reader, &mut self.cursor)
    }
}

struct ActiveEntry {
    package: Arc<MapPackage>,
    files: MapFiles,
    modified: SystemTime,
    track: Arc<Mutex<ActiveTrack>>,
}

impl ActiveEntry {
    fn is_current(&self, files: &MapFiles, modified: SystemTime) -> bool {
        self.modified == modified && &self.files == files
    }
}

#[derive(Default)]
struct CacheState {
    active: Option<ActiveEntry>,
    archives: IndexMap<String, MapFiles>,
    latest: Option<(i64, String)>,
}

pub struct MapCache {
    cfg: CacheConfig,
    state: Mutex<CacheState>,
}

fn check_dir(role: &'static str, path: &Path) -> Result<(), CacheError> {
    if path.is_dir() { Ok(()) } else { Err(CacheError::InvalidDirectory { role, path: path.to_path_buf() }) }
}

fn parse_file(path: &Path) -> Result<MapPackage, CodecError> {
    let file = File::open(path)?;
    read_map_package(BufReader::new(file))
}

impl MapCache {
    /// Validates both directories, then loads the active map and scans the archive.
    pub fn new(cfg: CacheConfig) -> Result<Self, CacheError> {
        check_dir("active map", &cfg.active_dir)?;
        check_dir("archive", &cfg.archive_dir)?;
        info!(active = %cfg.active_dir.display(), archive = %cfg.archive_dir.display(), "map directories fine");
        let cache = Self { cfg, state: Mutex::new(CacheState::default()) };
        cache.update_active_map();
        let found = cache.update_archived();
        info!(archived = found, active = cache.has_active_map(), "map cache ready");
        Ok(cache)
    }

    pub fn config(&self) -> &CacheConfig { &self.cfg }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_active_map(&self) -> bool { self.lock().active.is_some() }

    pub fn get_active_map(&self) -> Option<Arc<MapPackage>> {
        self.lock().active.as_ref().map(|a| Arc::clone(&a.package))
    }

    fn clear_active(&self) -> RefreshOutcome {
        match self.lock().active.take() {
            Some(_) => RefreshOutcome::Cleared,
            None => RefreshOutcome::Unchanged,
        }
    }

    /// Re-discovers the active files; re-parses only when the image changed.
    pub fn update_active_map(&self) -> RefreshOutcome {
        let files = match discovery::find_active_files(&self.cfg.active_dir, &self.cfg.slam_log_name) {
            Ok(Some(files)) => files,
            Ok(None) => {
                info!(dir = %self.cfg.active_dir.display(), "no valid active map found");
                return self.clear_active();
            }
            Err(e) => {
                warn!(dir = %self.cfg.active_dir.display(), error = %e, "unable to list active map directory");
                return self.clear_active();
            }
        };
        let modified = match fs::metadata(&files.map).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!(map = %files.map.display(), error = %e, "unable to stat active map");
                return self.clear_active();
            }
        };
        if self.lock().active.as_ref().is_some_and(|a| a.is_current(&files, modified)) {
            debug!(map = %files.map.display(), "active map doesn't need updating");
            return RefreshOutcome::Unchanged;
        }

        let package = match parse_file(&files.map) {
            Ok(p) => p,
            Err(e) => {
                warn!(map = %files.map.display(), error = %e, "unable to parse active map");
                return self.clear_active();
            }
        };

        let mut guard = self.lock();
        // another caller may have loaded the same file meanwhile
        if guard.active.as_ref().is_some_and(|a| a.is_current(&files, modified)) {
            return RefreshOutcome::Unchanged;
        }
        info!(map = %files.map.display(), pixels = package.pixel_count(), "active map loaded");
        guard.active = Some(ActiveEntry {
            package: Arc::new(package),
            files,
            modified,
            track: Arc::default(),
        });
        RefreshOutcome::Reloaded
    }

    /// Path of the active map from `start`, reading only log lines completed since the last call.
    /// The log is read under the track's own lock, not the cache lock.
    pub fn get_active_path_from(&self, start: usize) -> Option<PathPackage> {
        let (slam, handle) = match self.lock().active.as_ref() {
            Some(a) => (a.files.slam.clone(), Arc::clone(&a.track)),
            None => {
                info!("active map not set");
                return None;
            }
        };
        let mut active = handle.lock().unwrap_or_else(PoisonError::into_inner);
        match active.catch_up(&slam) {
            Ok(lines) => debug!(lines, kept = active.track.len(), "appended slam"),
            Err(e) => {
                warn!(slam = %slam.display(), error = %e, "appending slam failed");
                return None;
            }
        }
        Some(active.track.package_from(start))
    }

    /// Records archive directories not seen before; returns how many were added.
    pub fn update_archived(&self) -> usize {
        let dirs = match discovery::list_subdirs(&self.cfg.archive_dir) {
            Ok(d) => d,
            Err(e) => {
                warn!(dir = %self.cfg.archive_dir.display(), error = %e, "unable to list archive directory");
                return 0;
            }
        };
        let mut added = 0usize;
        for (name, path) in dirs {
            if self.lock().archives.contains_key(&name) { continue; }
            let files = match discovery::find_archive_files(&path, &self.cfg.slam_log_name) {
                Ok(Some(files)) => files,
                Ok(None) => {
                    debug!(name = %name, "no valid archived map");
                    continue;
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "unable to list archive entry");
                    continue;
                }
            };
            let mut guard = self.lock();
            if guard.archives.contains_key(&name) { continue; }
            match archive_number(&name) {
                Some(n) => {
                    if guard.latest.as_ref().map_or(true, |(best, _)| n > *best) {
                        debug!(name = %name, number = n, "found newer archived map");
                        guard.latest = Some((n, name.clone()));
                    }
                }
                None => info!(name = %name, "archive directory name could not be parsed"),
            }
            guard.archives.insert(name, files);
            added += 1;
        }
        if added > 0 { info!(added, total = self.number_of_archived(), "archived maps discovered"); }
        added
    }

    /// Names in discovery order.
    pub fn get_archived_names(&self) -> Vec<String> { self.lock().archives.keys().cloned().collect() }

    pub fn number_of_archived(&self) -> usize { self.lock().archives.len() }

    fn archive_files(&self, name: &str) -> Option<MapFiles> {
        let files = self.lock().archives.get(name).cloned();
        if files.is_none() { warn!(name = %name, "archived map not found"); }
        files
    }

    /// Decompresses and parses an archived map. Not cached.
    pub fn get_archived_map(&self, name: &str) -> Option<MapPackage> {
        let files = self.archive_files(name)?;
        let parsed = discovery::open_gzip(&files.map)
            .map_err(CodecError::from)
            .and_then(read_map_package);
        match parsed {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(name = %name, error = %e, "unable to read archived map");
                None
            }
        }
    }

    pub fn get_archived_path(&self, name: &str) -> Option<PathPackage> {
        let files = self.archive_files(name)?;
        let parsed = discovery::open_gzip(&files.slam)
            .map_err(CodecError::from)
            .and_then(|r| read_path_package(r, 0));
        match parsed {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(name = %name, error = %e, "unable to read archived path");
                None
            }
        }
    }

    /// Archive with the greatest leading number; ties go to the first discovered.
    pub fn latest_archived_name(&self) -> Option<String> {
        self.lock().latest.as_ref().map(|(_, name)| name.clone())
    }

    pub fn get_latest_archived_map(&self) -> Option<MapPackage> {
        self.get_archived_map(&self.latest_archived_name()?)
    }

    pub fn get_latest_archived_path(&self) -> Option<PathPackage> {
        self.get_archived_path(&self.latest_archived_name()?)
    }
}

// Prove Send + Sync bounds for compile-time safety.
#[allow(dead_code)]
fn _assert_send_sync() {
    fn assert_bound<T: Send + Sync>() {}
    assert_bound::<MapCache>();
}
