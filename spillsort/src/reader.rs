//! Spill reader: one independently decodable stream per section
//!
//! The reader is handed a positional byte source plus the offsets vector the
//! writer produced. Each section gets a bounded view of the source, its own
//! decompressor, and its own buffered layer, so a k-way merge can pull from
//! every section without the streams interfering. Records come back as
//! pooled [`Entry`] values in exactly the order they were encoded.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::sync::Arc;

use tracing::debug;

use crate::compression::CompressionReader;
use crate::entry::{Entry, fetch_entry};
use crate::{Compression, Error, Result, varint};

/// Floor for the per-section buffer so a tiny budget still yields a working
/// buffered layer.
const MIN_SECTION_BUF: usize = 512;

/// Positional reads over an immutable byte source
///
/// Implementations must tolerate concurrent `read_at` calls; section readers
/// share one source.
pub trait ReadAt {
    /// Read up to `buf.len()` bytes at `offset`, returning the count; `0`
    /// means end of source.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAt for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Some(remaining) = (self.len() as u64).checked_sub(offset) else {
            return Ok(0);
        };
        let n = buf.len().min(remaining as usize);
        buf[..n].copy_from_slice(&self[offset as usize..offset as usize + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

/// Bounded `Read` view over a span of a shared source
struct SectionSource<R> {
    source: Arc<R>,
    pos: u64,
    end: u64,
}

impl<R: ReadAt> Read for SectionSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.end {
            return Ok(0);
        }
        let max = ((self.end - self.pos) as usize).min(buf.len());
        let n = self.source.read_at(&mut buf[..max], self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

/// Decoder over a single spill section
///
/// Owns its decompressor and buffered layer; independent sections may be
/// driven from different threads as long as each individual section is
/// serialized.
pub struct SectionReader<R: ReadAt> {
    /// `None` once the section reported exhaustion.
    r: Option<BufReader<CompressionReader<SectionSource<R>>>>,
}

impl<R: ReadAt> SectionReader<R> {
    /// Decode the next record, or `Ok(None)` once the section is exhausted
    ///
    /// Exhaustion is sticky: after the first clean EOF every call returns
    /// `Ok(None)` without touching the source. EOF anywhere inside a record
    /// is a framing error.
    pub fn read_next(&mut self) -> Result<Option<Entry>> {
        let Some(r) = self.r.as_mut() else {
            return Ok(None);
        };

        // Probe with a plain read so a decoder's truncation error is not
        // mistaken for a clean end of section.
        let first = match read_first_byte(r)? {
            Some(byte) => byte,
            None => {
                // Clean EOF at a record boundary.
                self.r = None;
                return Ok(None);
            }
        };
        let key_len = varint::read_uvarint_continue(first, r).map_err(map_varint_err)?;
        let val_len = match varint::read_uvarint(r).map_err(map_varint_err)? {
            Some(v) => v,
            None => return Err(Error::TruncatedLength),
        };

        let key_len = usize::try_from(key_len)
            .map_err(|_| Error::InvalidLength(format!("key length {key_len} overflows usize")))?;
        let val_len = usize::try_from(val_len)
            .map_err(|_| Error::InvalidLength(format!("value length {val_len} overflows usize")))?;
        let need = key_len.checked_add(val_len).ok_or_else(|| {
            Error::InvalidLength(format!("record length {key_len}+{val_len} overflows usize"))
        })?;

        let mut entry = fetch_entry();
        entry.set_key_len(key_len);
        let buf = entry.buffer_mut();
        buf.resize(need, 0);

        let mut filled = 0;
        while filled < need {
            match r.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(Error::TruncatedRecord {
                        expected: need,
                        actual: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Some(entry))
    }

    /// Whether the section already reported exhaustion
    pub fn is_exhausted(&self) -> bool {
        self.r.is_none()
    }
}

/// Read one byte, with `Ok(None)` reserved for a true end of stream.
fn read_first_byte<T: Read>(r: &mut T) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match r.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Map length-varint decode failures to framing errors.
fn map_varint_err(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::TruncatedLength,
        io::ErrorKind::InvalidData => Error::InvalidLength(e.to_string()),
        _ => Error::Io(e),
    }
}

/// Reader over all sections of a completed spill file
pub struct TempReader<R: ReadAt = File> {
    sections: Vec<SectionReader<R>>,
}

impl<R: ReadAt> std::fmt::Debug for TempReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempReader")
            .field("sections", &self.sections.len())
            .finish()
    }
}

impl<R: ReadAt> TempReader<R> {
    /// Build one section reader per recorded offset
    ///
    /// Section `i` spans `[offsets[i-1], offsets[i])` of `source` (the first
    /// starts at zero). The total read-ahead budget `buf_size` is split
    /// `N + 1` ways so the merger's own working buffers keep a share.
    pub fn new(
        source: R,
        offsets: &[u64],
        buf_size: usize,
        compression: Compression,
    ) -> Result<Self> {
        let source = Arc::new(source);
        let per_section = (buf_size / (offsets.len() + 1)).max(MIN_SECTION_BUF);

        let mut sections = Vec::with_capacity(offsets.len());
        let mut start = 0u64;
        for &end in offsets {
            if end < start {
                return Err(Error::InvalidOffsets { prev: start, next: end });
            }
            let view = SectionSource {
                source: Arc::clone(&source),
                pos: start,
                end,
            };
            let decoder = compression.new_reader(view);
            sections.push(SectionReader {
                r: Some(BufReader::with_capacity(per_section, decoder)),
            });
            start = end;
        }

        debug!(
            "opened spill reader: {} sections, {per_section} byte buffer each",
            sections.len()
        );
        Ok(Self { sections })
    }

    /// Number of sections in the spill file
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Decode the next record from `section`
    ///
    /// See [`SectionReader::read_next`]. Panics if `section` is out of range.
    pub fn read_next(&mut self, section: usize) -> Result<Option<Entry>> {
        self.sections[section].read_next()
    }

    /// Exclusive access to one section
    pub fn section_mut(&mut self, section: usize) -> &mut SectionReader<R> {
        &mut self.sections[section]
    }

    /// Iterate over all sections for callers driving them independently
    pub fn sections_mut(&mut self) -> impl Iterator<Item = &mut SectionReader<R>> {
        self.sections.iter_mut()
    }

    /// Drop every section's decompressor
    ///
    /// Read-side codecs have nothing to finalize, so this cannot fail; it
    /// exists so lifecycle code can close both halves symmetrically.
    pub fn close(self) -> Result<()> {
        drop(self.sections);
        Ok(())
    }
}
