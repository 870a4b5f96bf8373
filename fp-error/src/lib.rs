//! Unified error handling for fphal
//!
//! This crate provides the single error type used by the adapter, its
//! configuration store and the session layer. It uses thiserror for the
//! Display and Error impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using FingerprintError
pub type Result<T> = std::result::Result<T, FingerprintError>;

/// Unified error type for all fphal operations
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    // ============================================================================
    // Driver Errors
    // ============================================================================
    #[error("No fingerprint device available")]
    DeviceUnavailable,

    #[error("Can't load fingerprint module, class: {class_name}, module_id: {module_id}: {reason}")]
    ModuleLoad {
        class_name: String,
        module_id: String,
        reason: String,
    },

    #[error("Can't open fingerprint module, class: {class_name}, module_id: {module_id}: {reason}")]
    ModuleOpen {
        class_name: String,
        module_id: String,
        reason: String,
    },

    #[error("Can't register fingerprint module callback (status {status})")]
    NotifyRegistration { status: i32 },

    #[error("Can't close fingerprint module (status {status})")]
    DeviceClose { status: i32 },

    #[error("Driver operation {op} failed with status {status}")]
    Driver { op: &'static str, status: i32 },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Unrecognized or unimplemented fingerprint behavior: {0:?}")]
    UnsupportedSensorType(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Unknown configuration key: {0}")]
    MissingConfig(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigIo { path: PathBuf, source: io::Error },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Session Errors
    // ============================================================================
    #[error("Session is closed")]
    SessionClosed,

    #[error("Failed to link to client death notification: {0}")]
    DeathLink(String),
}

impl FingerprintError {
    /// Create an invalid config error
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a driver error from a failed operation status
    pub fn driver(op: &'static str, status: i32) -> Self {
        Self::Driver { op, status }
    }

    /// Negative errno equivalent, for callers that report plain status codes
    pub fn status_code(&self) -> i32 {
        match self {
            Self::DeviceUnavailable => -libc::ENODEV,
            Self::ModuleLoad { .. } => -libc::ENOENT,
            Self::ModuleOpen { .. } => -libc::ENODEV,
            Self::NotifyRegistration { status }
            | Self::DeviceClose { status }
            | Self::Driver { status, .. } => {
                if *status < 0 {
                    *status
                } else {
                    -libc::EIO
                }
            }
            Self::UnsupportedSensorType(_)
            | Self::InvalidConfig { .. }
            | Self::MissingConfig(_)
            | Self::JsonParse(_) => -libc::EINVAL,
            Self::ConfigIo { source, .. } => source.raw_os_error().map(|e| -e).unwrap_or(-libc::EIO),
            Self::SessionClosed => -libc::EPIPE,
            Self::DeathLink(_) => -libc::EPIPE,
        }
    }
}
