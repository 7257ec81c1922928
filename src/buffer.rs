//! Buffer management utilities for building and reading delta streams.

/// Initial buffer size for allocations.
pub const INIT_BUFFER_SIZE: usize = 128 * 1024;

/// A growable output buffer that deltas are written into.
pub struct BufferStream {
    buffer: Vec<u8>,
}

impl BufferStream {
    /// Creates a new buffer with the specified initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Returns a reference to the underlying buffer.
    #[cfg(test)]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..]
    }

    /// Consumes the buffer and returns the underlying vector.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    /// Returns the total length of the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Writes a single byte to the buffer.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a slice of bytes to the buffer.
    #[inline]
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }
}

/// A read cursor over a borrowed byte slice.
///
/// Reads hand out sub-slices of the original input, so insert payloads are
/// never copied while parsing.
#[derive(Debug, Clone)]
pub struct SliceCursor<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> SliceCursor<'a> {
    /// Creates a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    /// Returns the current cursor position.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Returns the whole underlying slice.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the number of bytes remaining from the cursor to the end.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Returns true if every byte has been consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.data.len()
    }

    /// Moves the cursor forward by `count` bytes, clamped to the end.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.cursor = (self.cursor + count).min(self.data.len());
    }

    /// Reads a single byte, or `None` at the end of the input.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.cursor)?;
        self.cursor += 1;
        Some(value)
    }

    /// Reads `len` bytes, or `None` if fewer remain. The cursor does not move
    /// on failure.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let start = self.cursor;
        self.cursor += len;
        Some(&self.data[start..self.cursor])
    }
}
