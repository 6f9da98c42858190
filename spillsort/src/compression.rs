//! Compression adapters over the spill byte stream
//!
//! This module is the only place that knows which codec is in use. The
//! writer side wraps an append-only sink, buffers and compresses frames, and
//! finalizes the codec's trailer at each section boundary; the reader side
//! pairs a decompressor of the same family with every section. The identity
//! codec keeps uncompressed spill files on the same code path.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::{Compression, Error, Result};

impl Compression {
    /// Wrap `sink` in a compressing writer for one section
    pub fn new_writer<W: Write>(self, sink: W) -> CompressionWriter<W> {
        match self {
            Compression::None => CompressionWriter::Plain(sink),
            Compression::Zlib => {
                CompressionWriter::Zlib(ZlibEncoder::new(sink, flate2::Compression::default()))
            }
            Compression::Lz4 => CompressionWriter::Lz4(FrameEncoder::new(sink)),
        }
    }

    /// Wrap `source` in a decompressing reader for one section
    pub fn new_reader<R: Read>(self, source: R) -> CompressionReader<R> {
        match self {
            Compression::None => CompressionReader::Plain(source),
            Compression::Zlib => CompressionReader::Zlib(ZlibDecoder::new(source)),
            Compression::Lz4 => CompressionReader::Lz4(FrameDecoder::new(source)),
        }
    }
}

/// Compressing writer over one spill section
pub enum CompressionWriter<W: Write> {
    /// Identity codec
    Plain(W),
    /// ZLib stream
    Zlib(ZlibEncoder<W>),
    /// LZ4 frame
    Lz4(FrameEncoder<W>),
}

impl<W: Write> CompressionWriter<W> {
    /// Flush pending compressed bytes, write the codec trailer, and hand the
    /// sink back
    ///
    /// After `finish` the section is complete on the sink; the next section
    /// gets a fresh adapter over the returned sink.
    pub fn finish(self) -> Result<W> {
        match self {
            CompressionWriter::Plain(mut sink) => {
                sink.flush()?;
                Ok(sink)
            }
            CompressionWriter::Zlib(encoder) => Ok(encoder.finish()?),
            CompressionWriter::Lz4(encoder) => encoder
                .finish()
                .map_err(|e| Error::Compression(format!("LZ4 finish failed: {e}"))),
        }
    }
}

impl<W: Write> Write for CompressionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressionWriter::Plain(sink) => sink.write(buf),
            CompressionWriter::Zlib(encoder) => encoder.write(buf),
            CompressionWriter::Lz4(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressionWriter::Plain(sink) => sink.flush(),
            CompressionWriter::Zlib(encoder) => encoder.flush(),
            CompressionWriter::Lz4(encoder) => encoder.flush(),
        }
    }
}

/// Decompressing reader over one spill section
pub enum CompressionReader<R: Read> {
    /// Identity codec
    Plain(R),
    /// ZLib stream
    Zlib(ZlibDecoder<R>),
    /// LZ4 frame
    Lz4(FrameDecoder<R>),
}

impl<R: Read> Read for CompressionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            CompressionReader::Plain(source) => source.read(buf),
            CompressionReader::Zlib(decoder) => decoder.read(buf),
            CompressionReader::Lz4(decoder) => decoder.read(buf),
        }
    }
}
