//! Error types.
use crate::manager::DeviceId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that end processing for one device.
///
/// The caller is expected to tear the device down when dispatch returns one of
/// these; decode itself never fails.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("device {0} is not registered")]
    UnknownDevice(DeviceId),

    #[error("read from {device} failed: {source}")]
    Read {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("short or misaligned read from {device}: {len} bytes is not a multiple of {record}")]
    MisalignedRead {
        device: String,
        len: usize,
        record: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("invalid config: {0}")]
    Invalid(String),
}
