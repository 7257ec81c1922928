//! Rolling hash over a fixed 16-byte window.
//!
//! Two 16-bit sums are kept: `a` is the plain sum of the window bytes and `b`
//! weights each byte by its distance from the end of the window. Sliding the
//! window by one byte updates both in constant time.

/// Window size of the rolling hash, and block size of the origin index.
pub const NHASH: usize = 16;

/// Incremental hash over the last [`NHASH`] bytes seen.
#[derive(Debug, Clone)]
pub struct RollingHash {
    a: u16,
    b: u16,
    cursor: usize,
    window: [u8; NHASH],
}

impl RollingHash {
    /// Creates a hash seeded from `data[start..start + NHASH]`.
    ///
    /// # Panics
    ///
    /// Panics if fewer than [`NHASH`] bytes are available at `start`.
    pub fn new(data: &[u8], start: usize) -> Self {
        let mut hash = Self {
            a: 0,
            b: 0,
            cursor: 0,
            window: [0; NHASH],
        };
        hash.init(data, start);
        hash
    }

    /// Re-seeds the hash from `data[start..start + NHASH]`.
    ///
    /// # Panics
    ///
    /// Panics if fewer than [`NHASH`] bytes are available at `start`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn init(&mut self, data: &[u8], start: usize) {
        self.window.copy_from_slice(&data[start..start + NHASH]);

        let mut a = 0u16;
        let mut b = 0u16;
        for (i, &byte) in self.window.iter().enumerate() {
            a = a.wrapping_add(u16::from(byte));
            b = b.wrapping_add(((NHASH - i) as u16).wrapping_mul(u16::from(byte)));
        }

        self.a = a;
        self.b = b;
        self.cursor = 0;
    }

    /// Slides the window by one byte: the oldest byte leaves, `byte` enters.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&mut self, byte: u8) {
        let old = u16::from(self.window[self.cursor]);
        self.window[self.cursor] = byte;
        self.cursor = (self.cursor + 1) & (NHASH - 1);

        self.a = self.a.wrapping_sub(old).wrapping_add(u16::from(byte));
        self.b = self
            .b
            .wrapping_sub((NHASH as u16).wrapping_mul(old))
            .wrapping_add(self.a);
    }

    /// Returns the 32-bit hash of the current window.
    #[inline]
    pub fn value(&self) -> u32 {
        u32::from(self.a) | (u32::from(self.b) << 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_value() {
        let data = [1u8; NHASH];
        let hash = RollingHash::new(&data, 0);
        // a = 16, b = 16 + 15 + ... + 1 = 136
        assert_eq!(hash.value(), 16 | (136 << 16));
    }

    #[test]
    fn test_advance_matches_init() {
        let data: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(37)).collect();
        let mut rolling = RollingHash::new(&data, 0);

        for start in 1..=data.len() - NHASH {
            rolling.advance(data[start + NHASH - 1]);
            assert_eq!(rolling.value(), RollingHash::new(&data, start).value());
        }
    }

    #[test]
    fn test_reinit_resets_cursor() {
        let data: Vec<u8> = (0..40u8).collect();
        let mut hash = RollingHash::new(&data, 0);
        hash.advance(data[NHASH]);
        hash.advance(data[NHASH + 1]);
        hash.init(&data, 5);
        hash.advance(data[5 + NHASH]);
        assert_eq!(hash.value(), RollingHash::new(&data, 6).value());
    }

    #[test]
    #[should_panic]
    fn test_init_requires_full_window() {
        let data = [0u8; NHASH - 1];
        let _ = RollingHash::new(&data, 0);
    }

    proptest! {
        #[test]
        fn rolling_matches_reinit(
            data in proptest::collection::vec(any::<u8>(), NHASH..512),
            skip in 0usize..64,
        ) {
            let first = skip.min(data.len() - NHASH);
            let mut rolling = RollingHash::new(&data, first);

            for start in first + 1..=data.len() - NHASH {
                rolling.advance(data[start + NHASH - 1]);
                prop_assert_eq!(rolling.value(), RollingHash::new(&data, start).value());
            }
        }
    }
}
