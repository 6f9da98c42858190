//! Spill/merge substrate for external sorting
//!
//! When a sort's working set outgrows memory, sorted runs are spilled to a
//! temporary file as independently compressed *sections* and merged back from
//! disk. This crate provides that substrate: the varint-framed record codec,
//! the section-at-a-time [`TempWriter`], the multi-section [`TempReader`] that
//! feeds a k-way merge, and the buffer pool that keeps per-record allocation
//! off the hot path.
//!
//! The in-memory sorter and the merge heap are the callers of this crate, not
//! part of it. The only contract between the write and read side besides the
//! file itself is the offsets vector produced by [`TempWriter::flush`]; it is
//! never persisted.

pub mod compression;
pub mod entry;
pub mod error;
pub mod memory_pool;
pub mod reader;
pub mod spill_file;
pub mod varint;
pub mod writer;

pub use compression::{CompressionReader, CompressionWriter};
pub use entry::{Entry, fetch_entry};
pub use error::{Error, Result};
pub use memory_pool::{
    BufferPool, PoolConfig, PoolStats, PooledBuffer, global_pool, init_global_pool,
};
pub use reader::{ReadAt, SectionReader, TempReader};
pub use spill_file::SpillFile;
pub use writer::TempWriter;

/// Codec applied to each spill section.
///
/// The choice lives with the orchestrator, not in the file: every section of
/// a spill file uses the same codec, and the reader must be constructed with
/// the codec the writer used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Identity codec; sections are raw frame bytes
    #[default]
    None,
    /// ZLib streams via flate2
    Zlib,
    /// LZ4 frame format via lz4_flex
    Lz4,
}
