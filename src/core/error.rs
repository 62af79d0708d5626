use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failure modes. Per-read defects (unknown reference sequence,
/// malformed CIGAR, BAQ breakdown) are absorbed with counters and never
/// surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed input {path}: {reason}")]
    InputFormat { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Error {
    pub fn input<P: Into<PathBuf>, R: ToString>(path: P, reason: R) -> Self {
        Error::InputFormat { path: path.into(), reason: reason.to_string() }
    }

    /// Process exit code for this error kind (0 is success, 4 is cancelled;
    /// both are statuses, not errors).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 1,
            Error::InputFormat { .. } => 2,
            Error::Io(_) | Error::Runtime(_) => 3,
        }
    }
}
