use byteorder::{ByteOrder, LittleEndian};

use crate::codec::{BoundingBox, PathPoint, SlamState};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"VMSS"; // VacMap SnapShot
pub const SNAPSHOT_VERSION: u32 = 1;

/// Fixed-size header in front of the compressed raster and path sections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifest {
    pub version: u32,
    pub bounding_box: BoundingBox,
    pub oversample: u32,
    pub slam: SlamState,
    pub path_points: u32,
}

impl Manifest {
    pub const SIZE: usize = 4 /*magic*/ + 4 /*version*/ + 4*4 /*bbox*/ + 4 /*oversample*/
        + 8 /*consumed lines*/ + 4 /*locked + pad*/ + 2*4 /*last kept*/ + 4 /*path points*/;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        b[0..4].copy_from_slice(&SNAPSHOT_MAGIC);
        LittleEndian::write_u32(&mut b[4..8], self.version);
        LittleEndian::write_u32(&mut b[8..12], self.bounding_box.left);
        LittleEndian::write_u32(&mut b[12..16], self.bounding_box.top);
        LittleEndian::write_u32(&mut b[16..20], self.bounding_box.width);
        LittleEndian::write_u32(&mut b[20..24], self.bounding_box.height);
        LittleEndian::write_u32(&mut b[24..28], self.oversample);
        LittleEndian::write_u64(&mut b[28..36], self.slam.consumed_lines);
        b[36] = self.slam.locked as u8;
        LittleEndian::write_f32(&mut b[40..44], self.slam.last_kept.x);
        LittleEndian::write_f32(&mut b[44..48], self.slam.last_kept.y);
        LittleEndian::write_u32(&mut b[48..52], self.path_points);
        b
    }

    pub fn parse(header: &[u8]) -> Result<Self, ManifestError> {
        if header.len() < Self::SIZE { return Err(ManifestError::HeaderTooSmall); }
        if header[0..4] != SNAPSHOT_MAGIC { return Err(ManifestError::BadMagic); }
        let version = LittleEndian::read_u32(&header[4..8]);
        if version != SNAPSHOT_VERSION { return Err(ManifestError::UnsupportedVersion(version)); }
        let bounding_box = BoundingBox::new(
            LittleEndian::read_u32(&header[8..12]),
            LittleEndian::read_u32(&header[12..16]),
            LittleEndian::read_u32(&header[16..20]),
            LittleEndian::read_u32(&header[20..24]),
        );
        if !bounding_box.fits_canvas() { return Err(ManifestError::BadBoundingBox(bounding_box)); }
        let oversample = LittleEndian::read_u32(&header[24..28]);
        if oversample == 0 { return Err(ManifestError::ZeroOversample); }
        let slam = SlamState {
            consumed_lines: LittleEndian::read_u64(&header[28..36]),
            locked: header[36] != 0,
            last_kept: PathPoint::new(LittleEndian::read_f32(&header[40..44]), LittleEndian::read_f32(&header[44..48])),
        };
        let path_points = LittleEndian::read_u32(&header[48..52]);
        Ok(Manifest { version, bounding_box, oversample, slam, path_points })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("snapshot header too small")]
    HeaderTooSmall,
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),
    #[error("bounding box {0:?} outside canvas")]
    BadBoundingBox(BoundingBox),
    #[error("oversample of zero")]
    ZeroOversample,
}
