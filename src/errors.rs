//! Crate-specific error types for zc-file.

use std::io;
use thiserror::Error;

/// Result alias for zc-file operations.
pub type Result<T> = std::result::Result<T, ZcFileError>;

/// Error type covering handle lifecycle, growth, seek, and copy failures.
///
/// Every operation surfaces its failure synchronously as one of these
/// variants; nothing is retried internally. End-of-file on read is not an
/// error (it is an empty grant).
#[derive(Debug, Error)]
pub enum ZcFileError {
    /// Opening a handle failed: descriptor open, size query, placeholder
    /// extension, or the initial mapping.
    #[error("open failed during {step}: {source}")]
    Open {
        /// The lifecycle step that failed.
        step: &'static str,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Closing a handle failed. The mapping and descriptor are still
    /// released; only the reported step was unsuccessful.
    #[error("close failed during {step}: {source}")]
    Close {
        /// The teardown step that failed.
        step: &'static str,
        /// Underlying OS error.
        source: io::Error,
    },

    /// A write needed to grow the file and the length extension or the
    /// remap failed. No bytes were granted.
    #[error("growth to {new_size} bytes failed during {step}: {source}")]
    Growth {
        /// The size the file was being extended to.
        new_size: u64,
        /// The growth step that failed.
        step: &'static str,
        /// Underlying OS error.
        source: io::Error,
    },

    /// A seek computed a target before the start of the file (or past the
    /// representable range). The cursor is unchanged.
    #[error("seek from {from} by {delta} lands before the start of the file")]
    NegativeOffset {
        /// Position the displacement was applied to.
        from: u64,
        /// The requested displacement.
        delta: i64,
    },

    /// The durability flush at write completion failed.
    #[error("flush failed: {0}")]
    Flush(String),

    /// A whole-file copy failed: source or destination open, size query,
    /// destination sizing, or the transfer itself.
    #[error("copy failed during {step}: {source}")]
    Copy {
        /// The copy step that failed.
        step: &'static str,
        /// Underlying OS error.
        source: io::Error,
    },
}
