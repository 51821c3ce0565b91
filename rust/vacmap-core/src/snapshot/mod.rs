//! Binary persistence of a whole map model, log-parser state included, so a
//! restored model keeps appending where the saved one stopped.

mod manifest;
mod reader;
mod writer;

pub use manifest::{Manifest, ManifestError, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
pub use reader::{load_snapshot, read_snapshot, SnapshotError};
pub use writer::{save_snapshot, write_snapshot, WriteResult, WriterError};
