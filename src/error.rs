use std::path::PathBuf;

use thiserror::Error;

/// Errors a single conversion can fail with.
///
/// Every variant is local to one file: the batch coordinator records the
/// failure and moves on to the next input. Only an unwritable output root,
/// detected once at batch start, aborts a whole run.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input path is missing, not a regular file, or not readable.
    #[error("input file not found or not readable: {0}")]
    InputNotFound(PathBuf),

    /// Extension matches no known format, or no codec is available for it
    /// in this build.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Source file could not be decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Output directory chain could not be created.
    #[error("cannot create output directory for {path}: {reason}")]
    OutputPath { path: PathBuf, reason: String },

    /// Codec or I/O failure while writing the output file, after any
    /// format-specific fallback has been exhausted.
    #[error("failed to encode {format} output {path}: {reason}")]
    Encode {
        format: &'static str,
        path: PathBuf,
        reason: String,
    },
}
