//! Odometry ("SLAM") log parsing.
//!
//! Each line is classified by substring: `reset` drops the path so far,
//! `lock` / `unlock` toggle sample ingestion, and `estimate` lines carry a
//! pose sample while unlocked. A line can trigger several of these.

use std::hash::Hasher;
use std::io::{self, BufRead, ErrorKind};

use rustc_hash::FxHasher;
use tracing::{debug, info, warn};

use super::error::CodecError;
use super::wire::{MapError, PathPackage, PathPoint};

pub const SLAM_SCALE_X: f32 = 20.0;
pub const SLAM_SCALE_Y: f32 = -20.0;
/// A sample is kept only if it moved more than this on either axis.
pub const DEDUP_THRESHOLD: f32 = 1.0;
const ESTIMATE_TOKENS: usize = 5;
const UNSET_REFERENCE: f32 = 100_000.0;

/// Resumable parser state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlamState {
    pub consumed_lines: u64,
    pub locked: bool,
    pub last_kept: PathPoint,
}

impl Default for SlamState {
    fn default() -> Self {
        Self { consumed_lines: 0, locked: true, last_kept: PathPoint::new(UNSET_REFERENCE, UNSET_REFERENCE) }
    }
}

/// How far into a log that is still being written a track has read:
/// complete lines and bytes, with a digest chained over those lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCursor {
    pub lines: u64,
    pub bytes: u64,
    pub digest: u64,
}

impl LogCursor {
    fn advance(&mut self, line: &[u8]) {
        let mut h = FxHasher::default();
        h.write_u64(self.digest);
        h.write(line);
        self.digest = h.finish();
        self.lines += 1;
        self.bytes += line.len() as u64;
    }

    /// Re-reads the lines covered by this cursor and checks they are unchanged.
    /// On success `reader` sits right after them.
    pub fn matches_prefix<R: BufRead>(&self, reader: &mut R) -> io::Result<bool> {
        let mut seen = LogCursor::default();
        let mut buf = Vec::new();
        while seen.lines < self.lines {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 || buf.last() != Some(&b'\n') {
                return Ok(false);
            }
            seen.advance(&buf);
        }
        Ok(seen == *self)
    }
}

/// Kept path points (raw odometry units) plus the state needed to append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlamTrack {
    points: Vec<PathPoint>,
    state: SlamState,
}

fn parse_estimate(line: &str) -> Option<PathPoint> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != ESTIMATE_TOKENS {
        debug!(tokens = tokens.len(), "estimate of wrong length");
        return None;
    }
    match (tokens[2].parse::<f32>(), tokens[3].parse::<f32>()) {
        (Ok(x), Ok(y)) => Some(PathPoint::new(x * SLAM_SCALE_X, y * SLAM_SCALE_Y)),
        _ => {
            warn!(line, "parsing estimate coordinates failed");
            None
        }
    }
}

impl SlamTrack {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn from_parts(points: Vec<PathPoint>, state: SlamState) -> Self { Self { points, state } }

    pub fn points(&self) -> &[PathPoint] { &self.points }
    pub fn len(&self) -> usize { self.points.len() }
    pub fn is_empty(&self) -> bool { self.points.is_empty() }
    pub fn state(&self) -> SlamState { self.state }

    pub fn ingest_line(&mut self, line: &str) {
        self.state.consumed_lines += 1;
        if line.contains("reset") {
            self.points.clear();
            self.state.last_kept = PathPoint::new(UNSET_REFERENCE, UNSET_REFERENCE);
        }
        if line.contains("lock") { self.state.locked = true; }
        if line.contains("unlock") { self.state.locked = false; }
        if self.state.locked || !line.contains("estimate") { return; }
        let Some(p) = parse_estimate(line) else { return };
        let last = self.state.last_kept;
        if (p.x - last.x).abs() > DEDUP_THRESHOLD || (p.y - last.y).abs() > DEDUP_THRESHOLD {
            self.state.last_kept = p;
            self.points.push(p);
        }
    }

    /// Parses every remaining line of `reader`; returns the number of lines read.
    pub fn read_from<R: BufRead>(&mut self, mut reader: R) -> Result<u64, CodecError> {
        let mut buf = Vec::new();
        let mut lines = 0u64;
        loop {
            buf.clear();
            let n = match reader.read_until(b'\n', &mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 { break; }
            let line = String::from_utf8_lossy(trim_line_end(&buf));
            self.ingest_line(&line);
            lines += 1;
        }
        Ok(lines)
    }

    /// Skips the lines consumed so far, then parses the rest.
    /// A log shorter than what was already consumed adds nothing.
    pub fn append_from<R: BufRead>(&mut self, mut reader: R) -> Result<u64, CodecError> {
        let mut buf = Vec::new();
        let mut skipped = 0u64;
        while skipped < self.state.consumed_lines {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                debug!(skipped, consumed = self.state.consumed_lines, "log shorter than consumed lines");
                return Ok(0);
            }
            skipped += 1;
        }
        self.read_from(reader)
    }

    /// Parses newline-terminated lines only, advancing `cursor` past each.
    /// A trailing partial line is left unread so a later call picks it up
    /// once the writer has finished it.
    pub fn read_complete_from<R: BufRead>(&mut self, mut reader: R, cursor: &mut LogCursor) -> Result<u64, CodecError> {
        let mut buf = Vec::new();
        let mut lines = 0u64;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 { break; }
            if buf.last() != Some(&b'\n') {
                debug!(bytes = buf.len(), "partial log line left for later");
                break;
            }
            self.ingest_line(&String::from_utf8_lossy(trim_line_end(&buf)));
            cursor.advance(&buf);
            lines += 1;
        }
        Ok(lines)
    }

    /// Appends points verbatim, without dedup.
    pub fn extend_raw(&mut self, points: impl IntoIterator<Item = PathPoint>) {
        self.points.extend(points);
    }

    /// Kept points from `start` on, in canvas-centered coordinates.
    pub fn package_from(&self, start: usize) -> PathPackage {
        if start > self.points.len() {
            warn!(start, available = self.points.len(), "path out of range");
            return PathPackage::out_of_range(start, self.points.len());
        }
        PathPackage {
            points: self.points[start..].iter().map(|p| p.to_canvas()).collect(),
            error: MapError::none(),
        }
    }
}

fn trim_line_end(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' { end -= 1; }
    if end > 0 && buf[end - 1] == b'\r' { end -= 1; }
    &buf[..end]
}

/// One-shot parse of a whole log into a path package starting at `start`.
pub fn read_path_package<R: BufRead>(reader: R, start: usize) -> Result<PathPackage, CodecError> {
    let mut track = SlamTrack::new();
    let lines = track.read_from(reader)?;
    info!(lines, kept = track.len(), start, "parsed odometry log");
    Ok(track.package_from(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::wire::ErrorCode;

    fn track_of(lines: &[&str]) -> SlamTrack {
        let mut t = SlamTrack::new();
        t.read_from(lines.join("\n").as_bytes()).unwrap();
        t
    }

    #[test]
    fn starts_locked() {
        let t = track_of(&["estimate 0 1.0 1.0 0"]);
        assert!(t.is_empty());
        assert_eq!(t.state().consumed_lines, 1);
    }

    #[test]
    fn lock_unlock_and_dedup() {
        let t = track_of(&[
            "lock",
            "estimate 0 1.0 1.0 x",
            "unlock",
            "estimate 0 1.0 1.0 x",
            "estimate 0 1.03 1.03 x",
        ]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.points()[0], PathPoint::new(20.0, -20.0));
    }

    #[test]
    fn dedup_uses_last_kept_not_last_seen() {
        let t = track_of(&[
            "unlock",
            "estimate 0 0.00 0.00 x",
            "estimate 0 0.04 0.00 x",
            "estimate 0 0.08 0.00 x",
        ]);
        // 0.8 and then 1.6 away from the kept origin
        assert_eq!(t.len(), 2);
        assert!((t.points()[1].x - 1.6).abs() < 1e-4);
    }

    #[test]
    fn malformed_estimates_are_skipped() {
        let t = track_of(&[
            "unlock",
            "estimate 0 0 1.0 1.0 x",
            "estimate 0 abc 1.0 x",
            "estimate 0 2.0 2.0 x",
        ]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.state().consumed_lines, 4);
    }

    #[test]
    fn reset_clears_and_rearms_reference() {
        let t = track_of(&[
            "unlock",
            "estimate 0 1.0 1.0 x",
            "estimate 0 3.0 3.0 x",
            "reset",
            "estimate 0 3.0 3.0 x",
        ]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.points()[0], PathPoint::new(60.0, -60.0));
        assert!(!t.state().locked);
    }

    #[test]
    fn append_resumes_after_consumed_lines() {
        let first = "unlock\nestimate 0 1.0 1.0 x\n";
        let full = "unlock\nestimate 0 1.0 1.0 x\nestimate 0 2.0 2.0 x\nestimate 0 2.01 2.01 x\n";
        let mut t = SlamTrack::new();
        t.read_from(first.as_bytes()).unwrap();
        assert_eq!(t.len(), 1);
        let before = t.points().to_vec();
        let added = t.append_from(full.as_bytes()).unwrap();
        assert_eq!(added, 2);
        assert_eq!(t.len(), 2);
        assert_eq!(&t.points()[..1], &before[..]);

        // nothing new
        assert_eq!(t.append_from(full.as_bytes()).unwrap(), 0);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn partial_line_waits_for_its_newline() {
        let mut t = SlamTrack::new();
        let mut cursor = LogCursor::default();
        assert_eq!(t.read_complete_from("unlock\nestimate 0 1.0".as_bytes(), &mut cursor).unwrap(), 1);
        assert!(t.is_empty());
        assert_eq!((cursor.lines, cursor.bytes), (1, 7));

        let full = "unlock\nestimate 0 1.0 1.0 x\n";
        let mut reader = full.as_bytes();
        assert!(cursor.matches_prefix(&mut reader).unwrap());
        assert_eq!(t.read_complete_from(reader, &mut cursor).unwrap(), 1);
        assert_eq!(t.points(), &[PathPoint::new(20.0, -20.0)]);
        assert_eq!(cursor.bytes, full.len() as u64);
    }

    #[test]
    fn cursor_rejects_changed_prefix() {
        let mut t = SlamTrack::new();
        let mut cursor = LogCursor::default();
        t.read_complete_from("unlock\nestimate 0 1.0 1.0 x\n".as_bytes(), &mut cursor).unwrap();
        assert!(!cursor.matches_prefix(&mut "unlock\nestimate 0 2.0 1.0 x\nmore\n".as_bytes()).unwrap());
        assert!(!cursor.matches_prefix(&mut "unlock\n".as_bytes()).unwrap());
        assert!(LogCursor::default().matches_prefix(&mut "anything".as_bytes()).unwrap());
    }

    #[test]
    fn package_offsets_and_range() {
        let t = track_of(&["unlock", "estimate 0 1.0 1.0 x", "estimate 0 2.0 2.0 x"]);
        let pkg = t.package_from(1);
        assert!(pkg.error.is_none());
        assert_eq!(pkg.points, vec![PathPoint::new(552.0, 472.0)]);

        let end = t.package_from(2);
        assert!(end.error.is_none());
        assert!(end.points.is_empty());

        let over = t.package_from(3);
        assert_eq!(over.error.code, ErrorCode::SlamOutOfRange);
        assert!(over.points.is_empty());
    }

    #[test]
    fn crlf_lines_are_trimmed() {
        let pkg = read_path_package("unlock\r\nestimate 0 1.0 1.0 x\r\n".as_bytes(), 0).unwrap();
        assert_eq!(pkg.points.len(), 1);
    }
}
