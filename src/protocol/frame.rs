// Fixed-capacity receive buffer that frames the byte stream into lines
//
// Bytes are appended one at a time from the ingress path. A complete line
// ends with '\n'; extraction hands the line out and shifts the remainder
// to the front. One byte of capacity is always kept free.

use tracing::debug;

use crate::config::LINE_CAPACITY;
use crate::error::{ConfigError, InitError};

/// Result of offering one byte to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Stored,
    /// Buffer full; the byte was discarded
    Dropped,
}

#[derive(Debug)]
pub struct FrameAccumulator {
    buf: Box<[u8]>,
    len: usize,
    last_activity_ms: u64,
    dropped: u64,
}

impl FrameAccumulator {
    /// Allocate the buffer once. `capacity` must be at least 2.
    pub fn with_capacity(capacity: usize, now_ms: u64) -> Result<Self, InitError> {
        if capacity < 2 {
            return Err(InitError::Config(ConfigError::Invalid {
                field: "rx_capacity",
                reason: format!("must be at least 2, got {}", capacity),
            }));
        }

        let mut storage: Vec<u8> = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| InitError::AllocationFailure { capacity })?;
        storage.resize(capacity, 0);

        debug!("Receive buffer allocated: {} bytes", capacity);
        Ok(Self {
            buf: storage.into_boxed_slice(),
            len: 0,
            last_activity_ms: now_ms,
            dropped: 0,
        })
    }

    /// Store one byte, or drop it if only the reserved byte is left.
    /// The activity timestamp is refreshed either way.
    pub fn append(&mut self, byte: u8, now_ms: u64) -> AppendOutcome {
        self.last_activity_ms = now_ms;

        if self.len >= self.max_len() {
            self.dropped += 1;
            return AppendOutcome::Dropped;
        }

        self.buf[self.len] = byte;
        self.len += 1;
        AppendOutcome::Stored
    }

    /// Append a batch byte by byte. Returns how many bytes were stored.
    pub fn append_slice(&mut self, bytes: &[u8], now_ms: u64) -> usize {
        bytes
            .iter()
            .filter(|&&b| self.append(b, now_ms) == AppendOutcome::Stored)
            .count()
    }

    /// Hand the first complete line (newline included) to `f`, then remove it.
    /// Returns `None` and leaves the buffer untouched when no newline is buffered.
    pub fn extract_line_with<R>(&mut self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let end = self.pending().iter().position(|&b| b == b'\n')? + 1;
        let result = f(&self.buf[..end]);

        self.buf.copy_within(end..self.len, 0);
        self.len -= end;
        Some(result)
    }

    /// Copying variant of `extract_line_with`, bounded to the parser's line capacity
    pub fn extract_line(&mut self) -> Option<Vec<u8>> {
        self.extract_line_with(|line| line[..line.len().min(LINE_CAPACITY)].to_vec())
    }

    /// Bytes buffered but not yet consumed
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Discard all buffered bytes. The only way out of a full buffer with no newline.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// No room left for another byte
    pub fn is_full(&self) -> bool {
        self.len >= self.max_len()
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    /// Total bytes discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn max_len(&self) -> usize {
        self.buf.len() - 1
    }
}
