//! Virtual byte sink.
//!
//! A [`MemoryFs`] is a registry of named byte regions. Each transcode
//! allocates a [`VirtualFile`], writes the container through a
//! [`SinkWriter`], closes it and reads the full contents back.
//!
//! # Lifecycle
//!
//! ```text
//! allocate() ──► open_write() ──► write/seek ──► close()
//!                                                   │
//!                      read_all() ◄─────────────────┘
//!                          │
//!                     drop(VirtualFile) ──► region deleted
//! ```
//!
//! The region is removed when the [`VirtualFile`] guard is dropped, so it is
//! released on every exit path: success, early `?` return, or a panic that
//! unwinds through the encoder.

use std::collections::HashMap;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use bytes::Bytes;
use tracing::debug;

use crate::error::SinkError;

/// Path prefix for all virtual files.
pub const VSI_PREFIX: &str = "/vsimem/";

// =============================================================================
// MemoryFs
// =============================================================================

/// Process-local registry of in-memory files.
///
/// Thread-safe; concurrent transcodes each get a uniquely named region.
#[derive(Debug, Default)]
pub struct MemoryFs {
    regions: Mutex<HashMap<String, Bytes>>,
    next_id: AtomicU64,
}

impl MemoryFs {
    /// Create an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared, process-wide instance.
    pub fn global() -> Arc<MemoryFs> {
        static GLOBAL: OnceLock<Arc<MemoryFs>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MemoryFs::new())))
    }

    /// Allocate a new, empty region with a unique name derived from `stem`.
    ///
    /// The returned guard deletes the region when dropped.
    pub fn allocate(&self, stem: &str, extension: &str) -> Result<VirtualFile<'_>, SinkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let path = format!("{}{}-{}.{}", VSI_PREFIX, stem, id, extension);

        let mut regions = self.regions.lock().map_err(|_| SinkError::Poisoned)?;
        if regions.contains_key(&path) {
            return Err(SinkError::AlreadyExists(path));
        }
        regions.insert(path.clone(), Bytes::new());
        drop(regions);

        debug!(path = %path, "Allocated virtual file");
        Ok(VirtualFile { fs: self, path })
    }

    /// Whether a region with this path exists.
    pub fn exists(&self, path: &str) -> bool {
        self.regions
            .lock()
            .map(|regions| regions.contains_key(path))
            .unwrap_or(false)
    }

    /// Poison the region lock, so every later operation fails.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _regions = self.regions.lock();
            panic!("poisoning virtual file system");
        }));
    }

    /// Number of live regions.
    pub fn open_count(&self) -> usize {
        self.regions.lock().map(|regions| regions.len()).unwrap_or(0)
    }

    /// Size in bytes of the committed contents of a region.
    pub fn stat(&self, path: &str) -> Result<u64, SinkError> {
        let regions = self.regions.lock().map_err(|_| SinkError::Poisoned)?;
        regions
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| SinkError::NotFound(path.to_string()))
    }

    fn store(&self, path: &str, data: Bytes) -> Result<(), SinkError> {
        let mut regions = self.regions.lock().map_err(|_| SinkError::Poisoned)?;
        match regions.get_mut(path) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(SinkError::NotFound(path.to_string())),
        }
    }

    fn load(&self, path: &str) -> Result<Bytes, SinkError> {
        let regions = self.regions.lock().map_err(|_| SinkError::Poisoned)?;
        regions
            .get(path)
            .cloned()
            .ok_or_else(|| SinkError::NotFound(path.to_string()))
    }

    fn remove(&self, path: &str) -> bool {
        match self.regions.lock() {
            Ok(mut regions) => regions.remove(path).is_some(),
            // Still release the region if a writer panicked mid-commit.
            Err(poisoned) => poisoned.into_inner().remove(path).is_some(),
        }
    }
}

// =============================================================================
// VirtualFile
// =============================================================================

/// Scoped handle to one region of a [`MemoryFs`].
#[derive(Debug)]
pub struct VirtualFile<'a> {
    fs: &'a MemoryFs,
    path: String,
}

impl<'a> VirtualFile<'a> {
    /// Full virtual path of this region.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Open the region for writing, truncating any previous contents.
    pub fn open_write(&self) -> SinkWriter<'_, 'a> {
        SinkWriter {
            file: self,
            buffer: Cursor::new(Vec::new()),
            dirty: true,
        }
    }

    /// Size of the committed contents.
    pub fn size(&self) -> Result<u64, SinkError> {
        self.fs.stat(&self.path)
    }

    /// Read back everything committed to the region.
    pub fn read_all(&self) -> Result<Bytes, SinkError> {
        self.fs.load(&self.path)
    }
}

impl Drop for VirtualFile<'_> {
    fn drop(&mut self) {
        if self.fs.remove(&self.path) {
            debug!(path = %self.path, "Released virtual file");
        }
    }
}

// =============================================================================
// SinkWriter
// =============================================================================

/// Seekable writer over a virtual file.
///
/// Writes go to a private buffer; [`flush`](Write::flush) and
/// [`close`](SinkWriter::close) commit it to the region.
pub struct SinkWriter<'f, 'a> {
    file: &'f VirtualFile<'a>,
    buffer: Cursor<Vec<u8>>,
    dirty: bool,
}

impl SinkWriter<'_, '_> {
    /// Commit all writes and close the writer, returning the committed size.
    pub fn close(mut self) -> Result<u64, SinkError> {
        self.commit()?;
        Ok(self.buffer.get_ref().len() as u64)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        if self.dirty {
            let data = Bytes::copy_from_slice(self.buffer.get_ref());
            self.file.fs.store(&self.file.path, data)?;
            self.dirty = false;
        }
        Ok(())
    }
}

impl Write for SinkWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.dirty = true;
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit().map_err(io::Error::other)
    }
}

impl Seek for SinkWriter<'_, '_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buffer.seek(pos)
    }
}

impl Drop for SinkWriter<'_, '_> {
    fn drop(&mut self) {
        let _ = self.commit();
    }
}

// =============================================================================
// Tests
// =============================================================================
