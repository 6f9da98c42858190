//! Pooled key/value records
//!
//! An [`Entry`] is one logical record flowing between the sorter, the spill
//! writer, and the section readers. Key and value live concatenated in a
//! single buffer borrowed from the [buffer pool](crate::memory_pool); the
//! split point is `key_len`. Dropping the entry returns the buffer, so a
//! release cannot be forgotten and a double release cannot be written.

use crate::memory_pool::{BufferPool, PooledBuffer, global_pool};

/// A key/value record backed by a pooled buffer
///
/// The entry exclusively owns its backing buffer for its lifetime. Both the
/// key and the value may be empty.
#[derive(Debug)]
pub struct Entry {
    buf: Option<PooledBuffer>,
    key_len: usize,
    pool: BufferPool,
}

/// Fetch an empty entry backed by the process-wide pool
pub fn fetch_entry() -> Entry {
    Entry::fetch_from(global_pool())
}

impl Entry {
    pub(crate) fn fetch_from(pool: &BufferPool) -> Self {
        Self {
            buf: Some(pool.get_buffer(0)),
            key_len: 0,
            pool: pool.clone(),
        }
    }

    /// Build an entry holding copies of `key` and `value`
    pub fn copy_from(key: &[u8], value: &[u8]) -> Self {
        let mut entry = fetch_entry();
        let data = entry.buffer_mut();
        data.reserve(key.len() + value.len());
        data.extend_from_slice(key);
        data.extend_from_slice(value);
        entry.key_len = key.len();
        entry
    }

    fn data_buf(&self) -> &PooledBuffer {
        // The Option is only vacated in Drop.
        self.buf.as_ref().expect("entry buffer already released")
    }

    /// The record key
    pub fn key(&self) -> &[u8] {
        &self.data_buf().as_slice()[..self.key_len]
    }

    /// The record value
    pub fn value(&self) -> &[u8] {
        &self.data_buf().as_slice()[self.key_len..]
    }

    /// Key length in bytes
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Value length in bytes
    pub fn value_len(&self) -> usize {
        self.data_buf().len() - self.key_len
    }

    /// The key and value bytes, concatenated
    pub fn data(&self) -> &[u8] {
        self.data_buf().as_slice()
    }

    pub(crate) fn set_key_len(&mut self, key_len: usize) {
        self.key_len = key_len;
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        self.buf
            .as_mut()
            .expect("entry buffer already released")
            .as_mut_vec()
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.return_buffer(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_views() {
        let entry = Entry::copy_from(b"key", b"value");
        assert_eq!(entry.key(), b"key");
        assert_eq!(entry.value(), b"value");
        assert_eq!(entry.key_len(), 3);
        assert_eq!(entry.value_len(), 5);
        assert_eq!(entry.data(), b"keyvalue");
    }

    #[test]
    fn test_empty_key_and_value() {
        let entry = Entry::copy_from(b"", b"");
        assert!(entry.key().is_empty());
        assert!(entry.value().is_empty());

        let entry = Entry::copy_from(b"k", b"");
        assert_eq!(entry.key(), b"k");
        assert!(entry.value().is_empty());

        let entry = Entry::copy_from(b"", b"v");
        assert!(entry.key().is_empty());
        assert_eq!(entry.value(), b"v");
    }

    #[test]
    fn test_drop_returns_buffer() {
        let pool = BufferPool::new();

        let entry = Entry::fetch_from(&pool);
        assert_eq!(pool.stats().outstanding(), 1);

        drop(entry);
        let stats = pool.stats();
        assert_eq!(stats.outstanding(), 0);
        assert_eq!(stats.total_buffers(), 1);
    }

    #[test]
    fn test_decode_style_fill() {
        let pool = BufferPool::new();
        let mut entry = Entry::fetch_from(&pool);

        let data = entry.buffer_mut();
        data.resize(8, 0);
        data.copy_from_slice(b"abcd1234");
        entry.set_key_len(4);

        assert_eq!(entry.key(), b"abcd");
        assert_eq!(entry.value(), b"1234");
    }
}
