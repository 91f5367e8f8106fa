use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KfdError {
    #[error("I/O Error: {0}")]
    Io(#[from] io::Error),

    #[error("KFD ioctl {command} failed: {source}")]
    Ioctl {
        command: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported KFD ABI version {major}.{minor} (expected {expected_major}.x)")]
    VersionMismatch {
        major: u32,
        minor: u32,
        expected_major: u32,
    },

    #[error("Debug payload of {size} bytes exceeds the {max} byte limit for {kind}")]
    PayloadTooLarge {
        kind: &'static str,
        size: usize,
        max: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u32 },
}

impl KfdError {
    /// The OS error code reported by the driver, if this error came from a call.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io(e) | Self::Ioctl { source: e, .. } => e.raw_os_error(),
            _ => None,
        }
    }
}

pub type KfdResult<T> = Result<T, KfdError>;
