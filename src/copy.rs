//! Whole-file copy that bypasses the mapping machinery entirely.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use log::debug;

use crate::errors::{Result, ZcFileError};

/// Copy the entire contents of `source` into `dest`, returning the number
/// of bytes transferred.
///
/// This operates on freshly opened descriptors, never on open handles: the
/// destination is created if absent and sized to match the source up
/// front, then the bytes are streamed with [`std::io::copy`], which rides
/// the most efficient copy mechanism the kernel offers
/// (`copy_file_range`, `sendfile`, plain buffered I/O as a last resort).
/// Neither side goes through a mapping or gate.
///
/// # Errors
///
/// Returns `ZcFileError::Copy` naming the first failing step: source or
/// destination open, source size query, destination sizing, or the
/// transfer. Later steps are not attempted.
pub fn copy_whole_file<P: AsRef<Path>, Q: AsRef<Path>>(source: P, dest: Q) -> Result<u64> {
    let mut src = OpenOptions::new()
        .read(true)
        .open(source.as_ref())
        .map_err(|e| ZcFileError::Copy { step: "open source", source: e })?;
    let src_len = src
        .metadata()
        .map_err(|e| ZcFileError::Copy { step: "source size query", source: e })?
        .len();
    let mut dst = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(dest.as_ref())
        .map_err(|e| ZcFileError::Copy { step: "open dest", source: e })?;
    dst.set_len(src_len)
        .map_err(|e| ZcFileError::Copy { step: "size dest", source: e })?;
    let copied = io::copy(&mut src, &mut dst)
        .map_err(|e| ZcFileError::Copy { step: "transfer", source: e })?;
    debug!(
        "copied {copied} bytes from {} to {}",
        source.as_ref().display(),
        dest.as_ref().display()
    );
    Ok(copied)
}

#[cfg(feature = "async")]
pub mod aio {
    //! Async copy helpers (Tokio) for transferring files without blocking
    //! the current thread.

    use std::path::Path;

    use tokio::fs as tfs;
    use tokio::io as tio;

    use crate::errors::{Result, ZcFileError};

    /// Async variant of [`copy_whole_file`](super::copy_whole_file): same
    /// open/size/transfer steps, same error reporting.
    ///
    /// # Errors
    ///
    /// Returns `ZcFileError::Copy` naming the first failing step.
    pub async fn copy_whole_file<P: AsRef<Path>, Q: AsRef<Path>>(
        source: P,
        dest: Q,
    ) -> Result<u64> {
        let mut src = tfs::OpenOptions::new()
            .read(true)
            .open(source.as_ref())
            .await
            .map_err(|e| ZcFileError::Copy { step: "open source", source: e })?;
        let src_len = src
            .metadata()
            .await
            .map_err(|e| ZcFileError::Copy { step: "source size query", source: e })?
            .len();
        let mut dst = tfs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(dest.as_ref())
            .await
            .map_err(|e| ZcFileError::Copy { step: "open dest", source: e })?;
        dst.set_len(src_len)
            .await
            .map_err(|e| ZcFileError::Copy { step: "size dest", source: e })?;
        let copied = tio::copy(&mut src, &mut dst)
            .await
            .map_err(|e| ZcFileError::Copy { step: "transfer", source: e })?;
        Ok(copied)
    }
}
