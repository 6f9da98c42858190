//! Unsigned LEB128 varints for the record framing
//!
//! Two length varints prefix every frame. Varints keep small records at one
//! length byte each while still carrying the full 64-bit range, and they sit
//! before the compression boundary, so fewer bytes reach the compressor.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Maximum encoded length of a 64-bit varint.
pub const MAX_LEN: usize = 10;

/// Write `value` as an unsigned varint, returning the number of bytes written.
pub fn write_uvarint<W: Write>(writer: &mut W, mut value: u64) -> io::Result<usize> {
    let mut written = 0;
    loop {
        written += 1;
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            writer.write_u8(byte)?;
            return Ok(written);
        }
        writer.write_u8(byte | 0x80)?;
    }
}

/// Read an unsigned varint.
///
/// Returns `Ok(None)` if the source is exhausted before the first byte; the
/// caller decides whether that is a clean record boundary. EOF after the
/// first byte surfaces as [`io::ErrorKind::UnexpectedEof`]; a continuation
/// run past 64 bits as [`io::ErrorKind::InvalidData`].
pub fn read_uvarint<R: Read>(reader: &mut R) -> io::Result<Option<u64>> {
    let byte = match reader.read_u8() {
        Ok(byte) => byte,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    read_uvarint_continue(byte, reader).map(Some)
}

/// Decode a varint whose first byte the caller already read.
///
/// Lets the caller probe for end-of-stream with a plain `read` (where a
/// decoder's `Ok(0)` and its truncation error stay distinguishable) before
/// committing to a record.
pub fn read_uvarint_continue<R: Read>(first: u8, reader: &mut R) -> io::Result<u64> {
    let mut result = (first & 0x7F) as u64;
    if first & 0x80 == 0 {
        return Ok(result);
    }

    let mut shift = 7;
    loop {
        let byte = reader.read_u8()?;
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "varint too long",
            ));
        }
    }
}

/// Encode `value` into `buf`, returning the encoded length.
pub fn encode_uvarint(buf: &mut [u8; MAX_LEN], value: u64) -> usize {
    let mut slice = &mut buf[..];
    // Writing into a fixed MAX_LEN slice cannot fail.
    write_uvarint(&mut slice, value).expect("varint scratch too small")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(value: u64) -> (usize, u64) {
        let mut buf = Vec::new();
        let n = write_uvarint(&mut buf, value).unwrap();
        assert_eq!(n, buf.len());
        let decoded = read_uvarint(&mut Cursor::new(&buf)).unwrap().unwrap();
        (n, decoded)
    }

    #[test]
    fn test_round_trip_values() {
        for value in [0, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let (_, decoded) = round_trip(value);
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_encoded_lengths() {
        assert_eq!(round_trip(0).0, 1);
        assert_eq!(round_trip(127).0, 1);
        assert_eq!(round_trip(128).0, 2);
        assert_eq!(round_trip(16_383).0, 2);
        assert_eq!(round_trip(16_384).0, 3);
        assert_eq!(round_trip(u64::MAX).0, MAX_LEN);
    }

    #[test]
    fn test_eof_before_first_byte() {
        let mut empty = Cursor::new(&[][..]);
        assert!(read_uvarint(&mut empty).unwrap().is_none());
    }

    #[test]
    fn test_eof_mid_varint() {
        // Continuation bit set, then nothing.
        let mut truncated = Cursor::new(&[0x80][..]);
        let err = read_uvarint(&mut truncated).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_overlong_varint() {
        let mut overlong = Cursor::new(&[0xFF; 11][..]);
        let err = read_uvarint(&mut overlong).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_encode_to_scratch() {
        let mut buf = [0u8; MAX_LEN];
        assert_eq!(encode_uvarint(&mut buf, 5), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(encode_uvarint(&mut buf, 300), 2);
        let decoded = read_uvarint(&mut Cursor::new(&buf[..2])).unwrap().unwrap();
        assert_eq!(decoded, 300);
    }
}
