use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const MAP_FILE_PREFIX: &str = "navmap";
pub const ACTIVE_MAP_SUFFIX: &str = ".ppm";
pub const ARCHIVE_SUFFIX: &str = ".gz";

pub const DEFAULT_ACTIVE_DIR: &str = "/run/shm";
pub const DEFAULT_ARCHIVE_DIR: &str = "/mnt/data/rockrobo/rrlog";
pub const DEFAULT_SLAM_LOG: &str = "SLAM_fprintf.log";

/// Where the device keeps its maps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the in-progress `navmap*.ppm` and the odometry log.
    pub active_dir: PathBuf,
    /// Directory of numbered subdirectories with gzipped map/log pairs.
    pub archive_dir: PathBuf,
    /// Exact log file name in the active directory; prefix of the archived one.
    pub slam_log_name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            active_dir: PathBuf::from(DEFAULT_ACTIVE_DIR),
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            slam_log_name: DEFAULT_SLAM_LOG.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn with_dirs(active_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self { active_dir: active_dir.into(), archive_dir: archive_dir.into(), ..Self::default() }
    }
}
