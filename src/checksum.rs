//! Target checksum carried by the terminal operation of a delta.
//!
//! The checksum is the wrapping sum of the content read as big-endian 32-bit
//! words, with a trailing partial word zero-padded on the right. It matches
//! the checksum used by Fossil deltas bit for bit.

/// Incremental form of [`checksum`].
///
/// Feeding the same bytes in any number of pieces yields the same value as a
/// single call to [`checksum`] over the concatenation.
#[derive(Debug, Clone, Default)]
pub struct Checksum {
    sum: u32,
    pending: [u8; 4],
    pending_len: usize,
}

impl Checksum {
    /// Creates an empty checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `data` into the checksum.
    pub fn update(&mut self, mut data: &[u8]) {
        if self.pending_len > 0 {
            let take = (4 - self.pending_len).min(data.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&data[..take]);
            self.pending_len += take;
            data = &data[take..];

            if self.pending_len < 4 {
                return;
            }
            self.sum = self.sum.wrapping_add(u32::from_be_bytes(self.pending));
            self.pending_len = 0;
        }

        let mut words = data.chunks_exact(4);
        for word in &mut words {
            let word = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
            self.sum = self.sum.wrapping_add(word);
        }

        let tail = words.remainder();
        self.pending[..tail.len()].copy_from_slice(tail);
        self.pending_len = tail.len();
    }

    /// Returns the checksum of everything fed so far.
    pub fn finish(&self) -> u32 {
        let mut tail = [0u8; 4];
        tail[..self.pending_len].copy_from_slice(&self.pending[..self.pending_len]);
        self.sum.wrapping_add(u32::from_be_bytes(tail))
    }
}

/// Computes the checksum of `data`.
///
/// ```
/// assert_eq!(fdelta::checksum(b""), 0);
/// assert_eq!(fdelta::checksum(b"abcd"), 0x6162_6364);
/// ```
pub fn checksum(data: &[u8]) -> u32 {
    let mut sum = Checksum::new();
    sum.update(data);
    sum.finish()
}
