//! Buffer pool for spill record processing
//!
//! A merge over a multi-GB spill produces millions of short-lived records;
//! allocating a fresh backing buffer for each would dominate CPU. The pool
//! keeps returned buffers in size-classed freelists and hands them back out
//! on the next fetch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A reusable byte buffer borrowed from a [`BufferPool`]
#[derive(Debug)]
pub struct PooledBuffer {
    data: Vec<u8>,
}

impl PooledBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Get the data as a slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the underlying vector
    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    /// Current length of the buffered data
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer holds no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the current capacity
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Reserve additional capacity if needed
    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }
}

/// Configuration for the buffer pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of small buffers to pool
    pub max_small_buffers: usize,
    /// Maximum number of medium buffers to pool
    pub max_medium_buffers: usize,
    /// Maximum number of large buffers to pool
    pub max_large_buffers: usize,
    /// Buffers at or below this capacity are small
    pub small_buffer_threshold: usize,
    /// Buffers at or below this capacity are medium
    pub medium_buffer_threshold: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_small_buffers: 50,
            max_medium_buffers: 20,
            max_large_buffers: 5,
            small_buffer_threshold: 64 * 1024,    // 64KB
            medium_buffer_threshold: 1024 * 1024, // 1MB
        }
    }
}

/// Size-classed pool of record buffers
///
/// Cloning is cheap and shares the underlying freelists. `get_buffer` and
/// `return_buffer` are safe to call from multiple threads.
#[derive(Debug, Clone)]
pub struct BufferPool {
    small_buffers: Arc<Mutex<VecDeque<PooledBuffer>>>,
    medium_buffers: Arc<Mutex<VecDeque<PooledBuffer>>>,
    large_buffers: Arc<Mutex<VecDeque<PooledBuffer>>>,
    gets: Arc<AtomicU64>,
    puts: Arc<AtomicU64>,
    config: PoolConfig,
}

impl BufferPool {
    /// Create a new pool with default configuration
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a new pool with custom configuration
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            small_buffers: Arc::new(Mutex::new(VecDeque::new())),
            medium_buffers: Arc::new(Mutex::new(VecDeque::new())),
            large_buffers: Arc::new(Mutex::new(VecDeque::new())),
            gets: Arc::new(AtomicU64::new(0)),
            puts: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Get an empty buffer with capacity for at least `requested_size` bytes
    pub fn get_buffer(&self, requested_size: usize) -> PooledBuffer {
        self.gets.fetch_add(1, Ordering::Relaxed);

        let pool = if requested_size <= self.config.small_buffer_threshold {
            &self.small_buffers
        } else if requested_size <= self.config.medium_buffer_threshold {
            &self.medium_buffers
        } else {
            &self.large_buffers
        };

        if let Ok(mut buffers) = pool.lock() {
            if let Some(mut buffer) = buffers.pop_front() {
                buffer.data.clear();
                if buffer.capacity() < requested_size {
                    buffer.reserve(requested_size);
                }
                return buffer;
            }
        }

        // Nothing pooled in this class; allocate fresh.
        PooledBuffer::with_capacity(requested_size.max(1024))
    }

    /// Return a buffer to the pool
    ///
    /// The buffer is classified by its current capacity, so one that grew
    /// during a large record read migrates to the matching class. Buffers
    /// beyond a class's cap are dropped.
    pub fn return_buffer(&self, buffer: PooledBuffer) {
        self.puts.fetch_add(1, Ordering::Relaxed);

        let capacity = buffer.capacity();
        let (pool, max_count) = if capacity <= self.config.small_buffer_threshold {
            (&self.small_buffers, self.config.max_small_buffers)
        } else if capacity <= self.config.medium_buffer_threshold {
            (&self.medium_buffers, self.config.max_medium_buffers)
        } else {
            (&self.large_buffers, self.config.max_large_buffers)
        };

        if let Ok(mut buffers) = pool.lock() {
            if buffers.len() < max_count {
                buffers.push_back(buffer);
            }
        }
    }

    /// Get statistics about the pool usage
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            small_buffers: self.small_buffers.lock().map(|b| b.len()).unwrap_or(0),
            medium_buffers: self.medium_buffers.lock().map(|b| b.len()).unwrap_or(0),
            large_buffers: self.large_buffers.lock().map(|b| b.len()).unwrap_or(0),
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
        }
    }

    /// Clear all pooled buffers
    pub fn clear(&self) {
        for pool in [&self.small_buffers, &self.medium_buffers, &self.large_buffers] {
            if let Ok(mut buffers) = pool.lock() {
                buffers.clear();
            }
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about pool usage
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub small_buffers: usize,
    pub medium_buffers: usize,
    pub large_buffers: usize,
    /// Cumulative buffers handed out
    pub gets: u64,
    /// Cumulative buffers returned
    pub puts: u64,
}

impl PoolStats {
    /// Total number of currently pooled buffers
    pub fn total_buffers(&self) -> usize {
        self.small_buffers + self.medium_buffers + self.large_buffers
    }

    /// Buffers fetched but not yet returned
    pub fn outstanding(&self) -> u64 {
        self.gets - self.puts
    }
}

// Global pool instance shared by every writer and reader in the process.
static GLOBAL_POOL: std::sync::OnceLock<BufferPool> = std::sync::OnceLock::new();

/// Get the process-wide buffer pool
pub fn global_pool() -> &'static BufferPool {
    GLOBAL_POOL.get_or_init(BufferPool::new)
}

/// Initialize the global pool with custom configuration
///
/// Returns `false` if the global pool was already initialized.
pub fn init_global_pool(config: PoolConfig) -> bool {
    GLOBAL_POOL.set(BufferPool::with_config(config)).is_ok()
}
