pub mod cache;
pub mod codec;
pub mod snapshot;

pub use cache::{CacheConfig, CacheError, MapCache, RefreshOutcome};
pub use codec::{CodecError, ErrorCode, MapPackage, PathPackage, VacuumMap};

/// Crate version, reported by the service and builder.
pub fn version() -> &'static str { env!("CARGO_PKG_VERSION") }
