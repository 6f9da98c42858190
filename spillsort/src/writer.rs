//! Spill writer: sorted runs out, compressed sections in one temp file
//!
//! Each sorted run is encoded as varint-framed records through a buffered
//! layer into a per-section compressor. `flush` seals the section: the
//! compressor trailer reaches the file, the end offset is recorded, and a
//! fresh compressor takes over for the next run. The offsets vector is the
//! reader's only map of the file.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::compression::CompressionWriter;
use crate::entry::Entry;
use crate::spill_file::{SPILL_PREFIX, SpillFile};
use crate::{Compression, Error, Result, varint};

/// Buffered-layer capacity in front of the compressor.
const WRITE_BUF_SIZE: usize = 64 * 1024;

/// Append-only writer producing one compressed section per sorted run
///
/// Not safe for concurrent use; a sort owns its writer. After any mid-section
/// error the writer is poisoned: every further operation except `close`
/// fails, and the caller should close and discard the file.
pub struct TempWriter {
    spill: SpillFile,
    /// Buffered + compressed pipeline; `None` after an error or close.
    w: Option<BufWriter<CompressionWriter<File>>>,
    compression: Compression,
    offsets: Vec<u64>,
    size: u64,
}

impl TempWriter {
    /// Create a spill file under `dir` and set up the write pipeline
    pub fn new(dir: impl AsRef<Path>, compression: Compression, keep_file: bool) -> Result<Self> {
        let spill = SpillFile::create(dir.as_ref(), SPILL_PREFIX, keep_file)?;
        let sink = spill.try_clone_handle()?;
        let w = BufWriter::with_capacity(WRITE_BUF_SIZE, compression.new_writer(sink));

        Ok(Self {
            spill,
            w: Some(w),
            compression,
            offsets: Vec::new(),
            size: 0,
        })
    }

    /// Emit one framed record into the current section
    ///
    /// Framing: `uvarint(key_len)`, `uvarint(val_len)`, then the key and
    /// value bytes back to back.
    pub fn encode(&mut self, entry: &Entry) -> Result<()> {
        self.encode_size(entry.key_len())?;
        self.encode_size(entry.value_len())?;
        self.write(entry.data())?;
        Ok(())
    }

    /// Write raw bytes into the current section, updating the size counter
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let w = self.w.as_mut().ok_or(Error::Poisoned)?;
        if let Err(e) = w.write_all(buf) {
            self.w = None;
            return Err(e.into());
        }
        self.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn encode_size(&mut self, size: usize) -> Result<()> {
        let mut scratch = [0u8; varint::MAX_LEN];
        let n = varint::encode_uvarint(&mut scratch, size as u64);
        self.write(&scratch[..n])?;
        Ok(())
    }

    /// Seal the current section and start the next one
    ///
    /// Drains the buffered layer, finalizes the compressor so its trailer is
    /// on disk, records the file position as the section's end offset, and
    /// rebinds a fresh compressor to the file. The compressor is only ever
    /// finalized here, between records, so an entry never straddles sections.
    pub fn flush(&mut self) -> Result<()> {
        let mut w = self.w.take().ok_or(Error::Poisoned)?;
        w.flush()?;
        let encoder = w.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        let mut file = encoder.finish()?;

        let pos = file.stream_position()?;
        self.offsets.push(pos);
        debug!(
            "sealed spill section {} at offset {pos} ({} bytes pre-compression so far)",
            self.offsets.len() - 1,
            self.size,
        );

        let w = BufWriter::with_capacity(WRITE_BUF_SIZE, self.compression.new_writer(file));
        self.w = Some(w);
        Ok(())
    }

    /// Duplicate handle over the spill file for a [`TempReader`](crate::TempReader)
    ///
    /// Positional reads only; call between sections or once writing is done.
    pub fn reader_at(&self) -> Result<File> {
        self.spill.try_clone_handle()
    }

    /// Section end offsets recorded so far, one per `flush`
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Total bytes accepted by the buffered layer (pre-compression)
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Finalize the compressor and close the file, deleting it unless the
    /// writer was created with `keep_file`
    ///
    /// Both steps run even if the first fails; the last error wins. The
    /// post-flush pipeline holds a fresh compressor, so this writes at most
    /// an empty trailer past the last recorded offset, which readers never
    /// see.
    pub fn close(mut self) -> Result<()> {
        let mut last_err = None;

        if let Some(mut w) = self.w.take() {
            let finished = match w.flush() {
                Ok(()) => w
                    .into_inner()
                    .map_err(|e| Error::Io(e.into_error()))
                    .and_then(|encoder| encoder.finish().map(|_| ())),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = finished {
                last_err = Some(e);
            }
        }

        trace!("closing spill file {}", self.spill.path().display());
        if let Err(e) = self.spill.close() {
            last_err = Some(e);
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
