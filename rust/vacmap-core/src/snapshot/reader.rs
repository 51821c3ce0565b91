use std::{fs::File, io::{BufReader, ErrorKind, Read}, path::Path};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use super::manifest::{Manifest, ManifestError};
use crate::codec::{PathPoint, SlamTrack, VacuumMap, MAP_PIXELS};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("{section} section: expected {expected} bytes, found {actual}")]
    SizeMismatch { section: &'static str, expected: usize, actual: usize },
}

fn read_section<R: Read>(input: &mut R, section: &'static str, expected: usize) -> Result<Vec<u8>, SnapshotError> {
    let packed_len = input.read_u32::<LittleEndian>()?;
    let raw_len = input.read_u32::<LittleEndian>()? as usize;
    if raw_len != expected {
        return Err(SnapshotError::SizeMismatch { section, expected, actual: raw_len });
    }
    let mut raw = Vec::with_capacity(expected.min(MAP_PIXELS * 4));
    // one extra byte so trailing garbage in the stream shows up as a mismatch
    ZlibDecoder::new(input.by_ref().take(packed_len as u64)).take(expected as u64 + 1).read_to_end(&mut raw)?;
    if raw.len() != expected {
        return Err(SnapshotError::SizeMismatch { section, expected, actual: raw.len() });
    }
    Ok(raw)
}

/// Restores a model written by [`write_snapshot`](super::write_snapshot).
pub fn read_snapshot<R: Read>(mut input: R) -> Result<VacuumMap, SnapshotError> {
    let mut header = [0u8; Manifest::SIZE];
    if let Err(e) = input.read_exact(&mut header) {
        if e.kind() == ErrorKind::UnexpectedEof { return Err(ManifestError::HeaderTooSmall.into()); }
        return Err(e.into());
    }
    let manifest = Manifest::parse(&header)?;

    let raster = read_section(&mut input, "raster", MAP_PIXELS * 4)?;
    let mut pixels = vec![0u32; MAP_PIXELS];
    LittleEndian::read_u32_into(&raster, &mut pixels);

    let count = manifest.path_points as usize;
    let path_bytes = read_section(&mut input, "path", count * 8)?;
    let mut coords = vec![0f32; count * 2];
    LittleEndian::read_f32_into(&path_bytes, &mut coords);
    let points = coords.chunks_exact(2).map(|c| PathPoint::new(c[0], c[1])).collect();

    let track = SlamTrack::from_parts(points, manifest.slam);
    Ok(VacuumMap::from_parts(pixels, manifest.bounding_box, manifest.oversample, track))
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<VacuumMap, SnapshotError> {
    let file = File::open(path)?;
    read_snapshot(BufReader::new(file))
}
