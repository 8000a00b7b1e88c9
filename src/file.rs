//! The zero-copy file handle: mapping lifecycle, gated read/write views,
//! growth-on-write, and cursor control.

use std::{
    cell::UnsafeCell,
    fs::{File, OpenOptions},
    io::{self, SeekFrom},
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    ptr, slice,
    sync::atomic::{AtomicU64, Ordering},
};

use log::{debug, warn};
use memmap2::MmapMut;

use crate::errors::{Result, ZcFileError};
use crate::gate::RwGate;

/// An open file whose contents are memory-mapped into the caller's address
/// space.
///
/// Reads and writes go through bounded views straight into the mapping, so
/// no bytes are staged in an intermediate buffer. Access is arbitrated by a
/// reader/writer gate: any number of [`ReadGuard`]s may be live at once, or
/// exactly one [`WriteGuard`], never both. Writes that run past the mapped
/// length grow the file and remap it in place.
///
/// The handle keeps a logical cursor shared by all threads using it. A read
/// or write grant advances the cursor by the granted size *at grant time*,
/// which is what makes racing readers land on disjoint slices.
///
/// Share the handle across threads by reference (it is `Sync`); every
/// method takes `&self`. Acquiring a second view from a thread that still
/// holds one deadlocks, the same as re-entering any exclusive lock.
///
/// # Examples
///
/// ```no_run
/// use zc_file::ZcFile;
///
/// let file = ZcFile::open("data.bin")?;
/// let mut view = file.write_start(5)?;
/// view.copy_from_slice(b"hello");
/// view.commit()?;
///
/// file.seek(std::io::SeekFrom::Start(0))?;
/// let view = file.read_start(5);
/// assert_eq!(&*view, b"hello");
/// drop(view);
///
/// file.close()?;
/// # Ok::<(), zc_file::ZcFileError>(())
/// ```
pub struct ZcFile {
    path: PathBuf,
    // Replaced wholesale on growth; only ever touched under a gate slot.
    // Declared before `file` so teardown unmaps before the descriptor
    // closes.
    map: UnsafeCell<MmapMut>,
    file: File,
    gate: RwGate,
    mapped_len: AtomicU64,
    cursor: AtomicU64,
}

// SAFETY: the mapping cell is only accessed under a gate slot — shared
// reads while holding a reader slot, writable views and replacement only
// while holding the exclusive writer slot. `mapped_len` and `cursor` are
// atomics; everything else is immutable after open.
unsafe impl Sync for ZcFile {}

impl std::fmt::Debug for ZcFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZcFile")
            .field("path", &self.path)
            .field("len", &self.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}

impl ZcFile {
    /// Open `path` read-write, creating it if absent, and map its whole
    /// current length. The cursor starts at 0.
    ///
    /// A zero-length file cannot be mapped, so a fresh empty file is
    /// extended to a one-byte placeholder first; `len()` reports 1 for it.
    ///
    /// # Errors
    ///
    /// Returns `ZcFileError::Open` naming the failing step when the
    /// descriptor open, size query, placeholder extension, or mapping
    /// fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path_ref)
            .map_err(|e| ZcFileError::Open { step: "open", source: e })?;
        let mut len = file
            .metadata()
            .map_err(|e| ZcFileError::Open { step: "size query", source: e })?
            .len();
        if len == 0 {
            file.set_len(1)
                .map_err(|e| ZcFileError::Open { step: "placeholder", source: e })?;
            len = 1;
        }
        // SAFETY: the file is open read-write and at least one byte long.
        // memmap2 handles the platform-specific mapping details.
        let map = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| ZcFileError::Open { step: "map", source: e })?;
        debug!("opened {} ({len} bytes mapped)", path_ref.display());
        Ok(Self {
            path: path_ref.to_path_buf(),
            map: UnsafeCell::new(map),
            file,
            gate: RwGate::new(),
            mapped_len: AtomicU64::new(len),
            cursor: AtomicU64::new(0),
        })
    }

    /// Flush everything written through the mapping to stable storage and
    /// tear the handle down.
    ///
    /// The unmap and descriptor close follow as the handle drops, in that
    /// order; both are infallible through `memmap2`/`std`, and they happen
    /// even when the flush step fails. Guards borrow the handle, so no
    /// view can be outstanding when this is called.
    ///
    /// Dropping a `ZcFile` without calling `close` releases the same
    /// resources but skips the durability flush.
    ///
    /// # Errors
    ///
    /// Returns `ZcFileError::Close` if the flush fails.
    pub fn close(self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| ZcFileError::Close { step: "flush", source: e })?;
        debug!("closed {}", self.path.display());
        Ok(())
    }

    /// Acquire a read-only view of up to `requested` bytes at the cursor.
    ///
    /// Blocks while a writer holds the gate; runs concurrently with other
    /// readers. The grant is clamped to the bytes left before the mapped
    /// end, and the cursor advances by the granted size immediately — the
    /// region is reserved for this caller before a single byte is
    /// consumed, so racing readers receive disjoint, monotonically
    /// advancing slices.
    ///
    /// An empty view signals end-of-file (cursor at or past the mapped
    /// length); requesting it again yields another empty view. The guard
    /// occupies a reader slot until dropped.
    #[allow(clippy::cast_possible_truncation)] // granted <= requested: usize
    pub fn read_start(&self, requested: usize) -> ReadGuard<'_> {
        self.gate.enter_reader();
        let mapped = self.mapped_len.load(Ordering::Acquire);
        let mut cursor = self.cursor.load(Ordering::Acquire);
        // Only other readers can move the cursor while we are inside the
        // gate, so a CAS loop is enough to carve out a disjoint slice.
        let (offset, granted) = loop {
            if cursor >= mapped {
                break (cursor, 0);
            }
            let granted = (requested as u64).min(mapped - cursor);
            match self.cursor.compare_exchange_weak(
                cursor,
                cursor + granted,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break (cursor, granted),
                Err(observed) => cursor = observed,
            }
        };
        let ptr = if granted == 0 {
            ptr::null()
        } else {
            // SAFETY: [offset, offset + granted) lies within the mapping,
            // and the reader slot keeps the mapping alive and in place
            // until the guard drops.
            unsafe { (*self.map.get()).as_ptr().add(offset as usize) }
        };
        ReadGuard {
            file: self,
            ptr,
            len: granted as usize,
            offset,
        }
    }

    /// Acquire a writable view of exactly `size` bytes at the cursor,
    /// growing the file first when the request runs past the mapped end.
    ///
    /// Blocks until no reader or other writer is inside the gate. Growth
    /// extends the file to `cursor + size`, remaps it (the mapping may
    /// relocate), and zero-fills the extension — including any gap a
    /// forward seek left between the old end and the cursor. The cursor
    /// advances by `size` at grant time.
    ///
    /// The caller writes through the guard, then drops it or calls
    /// [`WriteGuard::commit`]; either way the full mapping is flushed to
    /// stable storage and the writer slot is released.
    ///
    /// # Errors
    ///
    /// Returns `ZcFileError::Growth` when the length extension or the
    /// remap fails. The writer slot is released before returning, so the
    /// handle stays usable.
    pub fn write_start(&self, size: usize) -> Result<WriteGuard<'_>> {
        self.gate.enter_writer();
        match self.grant_write(size as u64) {
            Ok((ptr, offset)) => Ok(WriteGuard {
                file: self,
                ptr,
                len: size,
                offset,
                flushed: false,
            }),
            Err(err) => {
                self.gate.exit_writer();
                Err(err)
            }
        }
    }

    /// Reposition the logical cursor and return the committed position.
    ///
    /// `SeekFrom::End` is relative to one past the last mapped byte, so
    /// `seek(SeekFrom::End(0))` returns the mapped length. The cursor may
    /// be placed past the end; the next write grows the file to cover the
    /// gap and the next read reports end-of-file.
    ///
    /// Seek takes the same exclusive slot as a writer: it waits for every
    /// active reader and writer, and excludes them for the (brief)
    /// duration of the update. The mapping and file length are untouched.
    ///
    /// # Errors
    ///
    /// Returns `ZcFileError::NegativeOffset` and leaves the cursor
    /// unchanged when the computed target is before the start of the file.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        self.gate.enter_writer();
        let result = self.reposition(pos);
        self.gate.exit_writer();
        result
    }

    /// Number of bytes currently mapped, equal to the on-disk length as
    /// last observed by this handle. At least 1.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.mapped_len.load(Ordering::Acquire)
    }

    /// Whether the mapping is at or below the one-byte placeholder length.
    /// A file holding a single written byte is indistinguishable from an
    /// untouched one.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Current logical cursor position.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reposition(&self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::End(delta) => {
                let mapped = self.mapped_len.load(Ordering::Acquire);
                mapped
                    .checked_add_signed(delta)
                    .ok_or(ZcFileError::NegativeOffset { from: mapped, delta })?
            }
            SeekFrom::Current(delta) => {
                let cursor = self.cursor.load(Ordering::Acquire);
                cursor
                    .checked_add_signed(delta)
                    .ok_or(ZcFileError::NegativeOffset { from: cursor, delta })?
            }
        };
        self.cursor.store(target, Ordering::Release);
        Ok(target)
    }

    /// Grant a writable region at the cursor. Caller holds the writer
    /// slot; every error propagates without touching cursor or mapping.
    #[allow(clippy::cast_possible_truncation)] // mapped regions fit usize
    fn grant_write(&self, size: u64) -> Result<(*mut u8, u64)> {
        let cursor = self.cursor.load(Ordering::Acquire);
        let mapped = self.mapped_len.load(Ordering::Acquire);
        if size == 0 {
            // Empty grant: nothing to grow, and the cursor may sit past
            // the mapped end where no valid pointer exists.
            return Ok((ptr::null_mut(), cursor));
        }
        // A cursor seeked past the end makes `remaining` zero, which
        // forces growth to cover the gap as well.
        let remaining = mapped.saturating_sub(cursor);
        if remaining < size {
            let new_size = cursor.checked_add(size).ok_or_else(|| ZcFileError::Growth {
                new_size: u64::MAX,
                step: "extend",
                source: io::Error::new(io::ErrorKind::InvalidInput, "file size overflows u64"),
            })?;
            self.grow(mapped, new_size)?;
        }
        // SAFETY: the writer slot is exclusive — no reader view aliases
        // the mapping and nothing can replace it under us.
        let base = unsafe { (*self.map.get()).as_mut_ptr() };
        // SAFETY: [cursor, cursor + size) is within the (possibly just
        // grown) mapping.
        let ptr = unsafe { base.add(cursor as usize) };
        self.cursor.store(cursor + size, Ordering::Release);
        Ok((ptr, cursor))
    }

    /// Extend the file to `new_size` and replace the mapping. The
    /// replacement may land at a different address.
    #[allow(clippy::cast_possible_truncation)] // mapped regions fit usize
    fn grow(&self, old_mapped: u64, new_size: u64) -> Result<()> {
        self.file.set_len(new_size).map_err(|e| ZcFileError::Growth {
            new_size,
            step: "extend",
            source: e,
        })?;
        // SAFETY: exclusive writer slot; the file is open read-write and
        // now `new_size` bytes long.
        let mut map = unsafe { MmapMut::map_mut(&self.file) }.map_err(|e| ZcFileError::Growth {
            new_size,
            step: "remap",
            source: e,
        })?;
        // Zero the extension deterministically rather than trusting what
        // the length change left there.
        map[old_mapped as usize..new_size as usize].fill(0);
        // SAFETY: exclusive writer slot; no outstanding views into the old
        // mapping, which is unmapped by the replacement.
        unsafe { *self.map.get() = map };
        self.mapped_len.store(new_size, Ordering::Release);
        debug!("grew {} to {new_size} bytes", self.path.display());
        Ok(())
    }

    /// Synchronous flush of the full current mapping. Caller holds the
    /// writer slot.
    fn flush_mapping(&self) -> io::Result<()> {
        // SAFETY: writer slot held; the mapping cannot be replaced while
        // we flush it.
        unsafe { (*self.map.get()).flush() }
    }
}

/// Read-only view into the mapping, handed out by [`ZcFile::read_start`].
///
/// Derefs to exactly the granted bytes; an empty view signals end-of-file.
/// The view occupies a reader slot in the gate for its whole lifetime, and
/// the borrow keeps it from outliving the handle. Dropping it releases the
/// slot; nothing is flushed, reads are non-mutating.
pub struct ReadGuard<'a> {
    file: &'a ZcFile,
    ptr: *const u8,
    len: usize,
    offset: u64,
}

impl ReadGuard<'_> {
    /// Cursor position the grant starts at.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Deref for ReadGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: ptr/len were carved out of the live mapping while inside
        // the gate, which excludes remapping until this guard drops.
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.file.gate.exit_reader();
    }
}

/// Writable view into the mapping, handed out by [`ZcFile::write_start`].
///
/// Derefs to exactly the granted bytes. Releasing the view is the
/// durability point: [`commit`](Self::commit) flushes the full mapping to
/// stable storage and surfaces a failure; a plain drop performs the same
/// flush but only logs a failure. The writer slot is released either way.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    file: &'a ZcFile,
    ptr: *mut u8,
    len: usize,
    offset: u64,
    flushed: bool,
}

impl WriteGuard<'_> {
    /// Cursor position the grant starts at.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Flush the mapping to stable storage and release the writer slot.
    ///
    /// After this returns `Ok`, the written bytes are persisted.
    ///
    /// # Errors
    ///
    /// Returns `ZcFileError::Flush` if the flush fails; the writer slot is
    /// released regardless.
    pub fn commit(mut self) -> Result<()> {
        self.flushed = true;
        self.file
            .flush_mapping()
            .map_err(|e| ZcFileError::Flush(e.to_string()))
        // Drop runs next and releases the gate without a second flush.
    }
}

impl Deref for WriteGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: ptr/len were carved out of the live mapping under the
        // exclusive writer slot, which this guard still holds.
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl DerefMut for WriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        // SAFETY: as in `deref`, plus exclusivity: the writer slot means
        // no other view aliases this region.
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if !self.flushed {
            if let Err(e) = self.file.flush_mapping() {
                warn!("flush after write to {} failed: {e}", self.file.path.display());
            }
        }
        self.file.gate.exit_writer();
    }
}
