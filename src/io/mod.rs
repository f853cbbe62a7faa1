//! In-memory I/O for the raster encoder.
//!
//! The TIFF backend is written against `Write + Seek`, the way it would write a
//! file on disk. [`MemoryFs`] gives it named, file-like regions that live only
//! in memory, so no transcode ever touches real storage.

mod sink;

pub use sink::{MemoryFs, SinkWriter, VirtualFile, VSI_PREFIX};
