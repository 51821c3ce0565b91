//! Offline transcoding of device map files.

pub mod export;
pub mod input;
