use std::env;
use std::path::PathBuf;

use anyhow::Context;
use vacmap_core::CacheConfig;

pub const DEFAULT_PORT: u16 = 54331;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cache: CacheConfig,
    /// Filter used when `RUST_LOG` is not set.
    pub log_level: String,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("VACMAP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("VACMAP_PORT") {
            Some(s) => s.parse::<u16>().with_context(|| format!("VACMAP_PORT is not a port number: {s:?}"))?,
            None => DEFAULT_PORT,
        };
        let mut cache = CacheConfig::default();
        if let Some(dir) = var("VACMAP_ACTIVE_DIR") { cache.active_dir = PathBuf::from(dir); }
        if let Some(dir) = var("VACMAP_ARCHIVE_DIR") { cache.archive_dir = PathBuf::from(dir); }
        if let Some(name) = var("VACMAP_SLAM_LOG") { cache.slam_log_name = name; }
        let log_level = var("VACMAP_LOG").unwrap_or_else(|| "info".to_string());
        let log_json = var("VACMAP_LOG_JSON").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);

        Ok(Self { host, port, cache, log_level, log_json })
    }

    pub fn addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}
