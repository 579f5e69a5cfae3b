//! Error type shared by the builder and reader.
//!
//! Every fallible operation returns [`HostPackError`]; there is no
//! process-wide "last error" slot. [`HostPackError::kind`] collapses the
//! detailed error into the stable [`ErrorKind`] codes surfaced by the CLI.

use std::path::{Path, PathBuf};

use hostpack_common::AlignmentError;

pub type Result<T, E = HostPackError> = std::result::Result<T, E>;

/// Coarse error category with a stable integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorKind {
    /// File open/read/write/map failure (including failed image decodes)
    Io = -1,
    /// Invalid alignment, missing or unparsable metadata, empty frame set
    BadConfig = -2,
    /// Container failed validation (magic, offsets, bounds)
    BadPack = -3,
    /// Format version or feature this build does not handle
    Unsupported = -4,
    NoMemory = -5,
    /// Invariant violation inside the crate
    Internal = -6,
}

impl ErrorKind {
    pub const fn code(self) -> i32 {
        self as i32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::BadConfig => "bad-config",
            Self::BadPack => "bad-pack",
            Self::Unsupported => "unsupported",
            Self::NoMemory => "no-memory",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostPackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode frame {index} ({}): {reason}", .path.display())]
    DecodeFailed {
        index: usize,
        path: PathBuf,
        reason: String,
    },

    #[error("invalid alignment: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("no metadata document found under {}", .0.display())]
    MetadataNotFound(PathBuf),

    #[error("failed to parse metadata {}: {source}", .path.display())]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("bad configuration: {0}")]
    BadConfig(String),

    #[error("bad pack: {0}")]
    BadPack(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("out of memory: {0}")]
    NoMemory(#[from] std::collections::TryReserveError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HostPackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::IoAt { .. } | Self::DecodeFailed { .. } => ErrorKind::Io,
            Self::Alignment(_)
            | Self::MetadataNotFound(_)
            | Self::MetadataParse { .. }
            | Self::BadConfig(_) => ErrorKind::BadConfig,
            Self::BadPack(_) => ErrorKind::BadPack,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::NoMemory(_) => ErrorKind::NoMemory,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Attach the offending path to an I/O error
    pub fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::IoAt {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn bad_pack(msg: impl Into<String>) -> Self {
        Self::BadPack(msg.into())
    }
}
