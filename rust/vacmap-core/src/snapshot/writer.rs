use std::{fs::File, io::{BufWriter, Write}, path::Path};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use flate2::{write::ZlibEncoder, Compression};
use tracing::info;

use super::manifest::{Manifest, SNAPSHOT_VERSION};
use crate::codec::VacuumMap;

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("section too large: {0}")]
    TooLarge(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct WriteResult {
    pub manifest: Manifest,
    /// Total bytes written, header included.
    pub bytes: u64,
}

/// Section layout: `[u32 compressed len][u32 raw len][zlib bytes]`.
fn write_section<W: Write>(out: &mut W, name: &'static str, raw: &[u8]) -> Result<u64, WriterError> {
    let raw_len = u32::try_from(raw.len()).map_err(|_| WriterError::TooLarge(name))?;
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(raw)?;
    let packed = enc.finish()?;
    let packed_len = u32::try_from(packed.len()).map_err(|_| WriterError::TooLarge(name))?;
    out.write_u32::<LittleEndian>(packed_len)?;
    out.write_u32::<LittleEndian>(raw_len)?;
    out.write_all(&packed)?;
    Ok(8 + packed.len() as u64)
}

/// Writes a model: manifest, raster section, path section.
pub fn write_snapshot<W: Write>(mut out: W, map: &VacuumMap) -> Result<WriteResult, WriterError> {
    let path = map.raw_path();
    let manifest = Manifest {
        version: SNAPSHOT_VERSION,
        bounding_box: map.raw_bounding_box(),
        oversample: map.oversample(),
        slam: map.slam_state(),
        path_points: u32::try_from(path.len()).map_err(|_| WriterError::TooLarge("path"))?,
    };
    out.write_all(&manifest.to_bytes())?;
    let mut bytes = Manifest::SIZE as u64;

    let pixels = map.raw_pixels();
    let mut raster = vec![0u8; pixels.len() * 4];
    LittleEndian::write_u32_into(pixels, &mut raster);
    bytes += write_section(&mut out, "raster", &raster)?;

    let coords: Vec<f32> = path.iter().flat_map(|p| [p.x, p.y]).collect();
    let mut path_bytes = vec![0u8; coords.len() * 4];
    LittleEndian::write_f32_into(&coords, &mut path_bytes);
    bytes += write_section(&mut out, "path", &path_bytes)?;

    out.flush()?;
    Ok(WriteResult { manifest, bytes })
}

pub fn save_snapshot(path: impl AsRef<Path>, map: &VacuumMap) -> Result<WriteResult, WriterError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let res = write_snapshot(BufWriter::new(file), map)?;
    info!(path = %path.display(), bytes = res.bytes, points = res.manifest.path_points, "snapshot written");
    Ok(res)
}
