//! Directory scanning for active and archived map files.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use super::config::{ACTIVE_MAP_SUFFIX, ARCHIVE_SUFFIX, MAP_FILE_PREFIX};

/// An image file and its odometry log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapFiles {
    pub map: PathBuf,
    pub slam: PathBuf,
}

/// Directories (or files) of `dir` as `(name, path)`, sorted by name. Non-UTF-8 names are skipped.
fn entries(dir: &Path, want_dirs: bool) -> io::Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // follows symlinks
        let is_dir = entry.path().is_dir();
        if is_dir != want_dirs { continue; }
        match entry.file_name().into_string() {
            Ok(name) => out.push((name, entry.path())),
            Err(raw) => debug!(name = ?raw, "skipping non UTF-8 entry"),
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

pub fn list_subdirs(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> { entries(dir, true) }

/// Picks the map and log among `files`. With several map candidates the
/// last one by name wins.
fn pair_up(
    dir: &Path,
    files: Vec<(String, PathBuf)>,
    is_map: impl Fn(&str) -> bool,
    is_slam: impl Fn(&str) -> bool,
) -> Option<MapFiles> {
    let mut map = None;
    let mut slam = None;
    let mut maps_seen = 0usize;
    for (name, path) in files {
        debug!(dir = %dir.display(), name = %name, "map directory file");
        if is_map(&name) {
            maps_seen += 1;
            map = Some(path);
        } else if is_slam(&name) {
            slam = Some(path);
        }
    }
    if maps_seen > 1 {
        warn!(dir = %dir.display(), candidates = maps_seen, "several map files, using the last by name");
    }
    Some(MapFiles { map: map?, slam: slam? })
}

/// `navmap*.ppm` plus the log named exactly `slam_name`.
pub fn find_active_files(dir: &Path, slam_name: &str) -> io::Result<Option<MapFiles>> {
    let files = entries(dir, false)?;
    Ok(pair_up(
        dir,
        files,
        |n| n.starts_with(MAP_FILE_PREFIX) && n.ends_with(ACTIVE_MAP_SUFFIX),
        |n| n == slam_name,
    ))
}

/// `navmap*.gz` plus `<slam_name>*.gz`.
pub fn find_archive_files(dir: &Path, slam_name: &str) -> io::Result<Option<MapFiles>> {
    let files = entries(dir, false)?;
    Ok(pair_up(
        dir,
        files,
        |n| n.starts_with(MAP_FILE_PREFIX) && n.ends_with(ARCHIVE_SUFFIX),
        |n| n.starts_with(slam_name) && n.ends_with(ARCHIVE_SUFFIX),
    ))
}

/// Leading dot-delimited integer of an archive directory name (`"12.2024"` -> 12).
pub fn archive_number(name: &str) -> Option<i64> {
    name.split('.').next()?.parse().ok()
}

pub fn open_gzip(path: &Path) -> io::Result<BufReader<GzDecoder<File>>> {
    Ok(BufReader::new(GzDecoder::new(File::open(path)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn active_pair_needs_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "navmap0.ppm");
        assert_eq!(find_active_files(tmp.path(), "SLAM_fprintf.log").unwrap(), None);
        touch(tmp.path(), "SLAM_fprintf.log.1");
        assert_eq!(find_active_files(tmp.path(), "SLAM_fprintf.log").unwrap(), None);
        touch(tmp.path(), "SLAM_fprintf.log");
        let files = find_active_files(tmp.path(), "SLAM_fprintf.log").unwrap().unwrap();
        assert_eq!(files.map, tmp.path().join("navmap0.ppm"));
        assert_eq!(files.slam, tmp.path().join("SLAM_fprintf.log"));
    }

    #[test]
    fn directories_and_other_suffixes_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("navmap_dir.ppm")).unwrap();
        touch(tmp.path(), "navmap0.png");
        touch(tmp.path(), "SLAM_fprintf.log");
        assert_eq!(find_active_files(tmp.path(), "SLAM_fprintf.log").unwrap(), None);
    }

    #[test]
    fn last_map_by_name_wins() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "navmap1.gz");
        touch(tmp.path(), "navmap7.gz");
        touch(tmp.path(), "SLAM_fprintf.log.0.gz");
        let files = find_archive_files(tmp.path(), "SLAM_fprintf.log").unwrap().unwrap();
        assert_eq!(files.map, tmp.path().join("navmap7.gz"));
        assert_eq!(files.slam, tmp.path().join("SLAM_fprintf.log.0.gz"));
    }

    #[test]
    fn archive_numbers() {
        assert_eq!(archive_number("000123.20180101"), Some(123));
        assert_eq!(archive_number("7"), Some(7));
        assert_eq!(archive_number("-3.x"), Some(-3));
        assert_eq!(archive_number("abc.1"), None);
        assert_eq!(archive_number(".1"), None);
    }
}
