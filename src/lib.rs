//! # zc-file: zero-copy memory-mapped file access for Rust
//!
//! This crate maps a file's contents directly into the caller's address
//! space and hands out bounded views into that mapping, so file data is
//! read and written in place — no intermediate copy between kernel buffers
//! and caller buffers.
//!
//! ## Features
//!
//! - **Zero-copy views**: reads and writes go straight through the mapping
//! - **Gated concurrency**: any number of readers or one exclusive writer,
//!   arbitrated per handle
//! - **Growth-on-write**: writes past the mapped end extend the file,
//!   remap it, and zero-fill the gap
//! - **Cursor semantics**: one logical position per handle, advanced at
//!   grant time, repositionable with `SeekFrom`
//! - **Durability point**: completing a write flushes the mapping to
//!   stable storage
//!
//! ## Quick Start
//!
//! ```no_run
//! use zc_file::ZcFile;
//!
//! let file = ZcFile::open("data.bin")?;
//!
//! // Write 5 bytes at the cursor; commit is the durability point.
//! let mut view = file.write_start(5)?;
//! view.copy_from_slice(b"hello");
//! view.commit()?;
//!
//! // Read them back through the mapping.
//! file.seek(std::io::SeekFrom::Start(0))?;
//! let view = file.read_start(5);
//! assert_eq!(&*view, b"hello");
//! drop(view);
//!
//! file.close()?;
//! # Ok::<(), zc_file::ZcFileError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: error types for all operations
//! - [`gate`]: the reader/writer admission gate
//! - [`file`]: the core [`ZcFile`] handle and its guards
//! - [`copy`]: whole-file copy that bypasses the mapping
//! - [`utils`]: page-size query
//!
//! ## Feature Flags
//!
//! - `async`: enables Tokio-based async copy helpers

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]

pub mod copy;
pub mod errors;
pub mod file;
pub mod gate;
pub mod utils;

pub use copy::copy_whole_file;
pub use errors::{Result, ZcFileError};
pub use file::{ReadGuard, WriteGuard, ZcFile};
