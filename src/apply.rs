//! Delta application.

use crate::checksum::Checksum;
use crate::error::{DeltaError, Result};
use crate::format::{DeltaOp, DeltaReader};

/// Running totals of a replay, checked against the header and the terminal
/// checksum.
pub(crate) struct Tally {
    limit: usize,
    written: usize,
    checksum: Checksum,
}

impl Tally {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            limit,
            written: 0,
            checksum: Checksum::new(),
        }
    }

    /// Fails if writing `len` more bytes would exceed the declared length.
    pub(crate) fn reserve(&self, len: usize) -> Result<()> {
        match self.written.checked_add(len) {
            Some(total) if total <= self.limit => Ok(()),
            _ => Err(DeltaError::OutOfBounds(format!(
                "writing {} bytes at {} exceeds declared target length {}",
                len, self.written, self.limit
            ))),
        }
    }

    pub(crate) fn record(&mut self, data: &[u8]) {
        self.checksum.update(data);
        self.written += data.len();
    }

    pub(crate) fn written(&self) -> usize {
        self.written
    }

    /// Validates the terminal checksum, then the produced length.
    pub(crate) fn finish(&self, expected: u32) -> Result<()> {
        let actual = self.checksum.finish();
        if actual != expected {
            return Err(DeltaError::ChecksumMismatch { expected, actual });
        }
        if self.written != self.limit {
            return Err(DeltaError::SizeMismatch {
                expected: self.limit,
                actual: self.written,
            });
        }
        Ok(())
    }
}

/// Checks that `origin[offset..offset + len]` lies within an origin of
/// `origin_len` bytes and returns the end of the range.
pub(crate) fn copy_range(offset: usize, len: usize, origin_len: u64) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end as u64 <= origin_len => Ok(end),
        _ => Err(DeltaError::OutOfBounds(format!(
            "copy of {} bytes at origin offset {} exceeds origin length {}",
            len, offset, origin_len
        ))),
    }
}

/// Applies `delta` to `origin` and returns the reconstructed target.
pub fn apply(origin: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let result = replay(origin, delta);
    if let Err(err) = &result {
        tracing::debug!(error = %err, delta_len = delta.len(), "delta rejected");
    }
    result
}

fn replay(origin: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let reader = DeltaReader::new(delta)?;
    let limit = reader.target_len();
    let mut tally = Tally::new(limit);
    let mut output = Vec::with_capacity(limit.min(origin.len().saturating_add(delta.len())));

    for op in reader {
        match op? {
            DeltaOp::Copy { len, offset } => {
                tally.reserve(len)?;
                let end = copy_range(offset, len, origin.len() as u64)?;
                let data = &origin[offset..end];
                tally.record(data);
                output.extend_from_slice(data);
            }
            DeltaOp::Insert { data } => {
                tally.reserve(data.len())?;
                tally.record(data);
                output.extend_from_slice(data);
            }
            DeltaOp::Checksum(expected) => {
                tally.finish(expected)?;
                tracing::debug!(
                    origin_len = origin.len(),
                    delta_len = delta.len(),
                    target_len = limit,
                    "delta applied"
                );
                return Ok(output);
            }
        }
    }

    // The reader only ends without a terminal operation after yielding an
    // error, which `?` above already returned.
    Err(DeltaError::UnknownOperator {
        operator: None,
        position: delta.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;
    use crate::varint::encode_int;

    fn terminal(target: &[u8]) -> Vec<u8> {
        let mut tail = encode_int(u64::from(checksum(target)));
        tail.push(b';');
        tail
    }

    #[test]
    fn test_apply_handwritten() {
        let origin = b"abcdefgh";
        let mut delta = b"8\n3@0,1:X4@4,".to_vec();
        delta.extend_from_slice(&terminal(b"abcXefgh"));

        assert_eq!(apply(origin, &delta).unwrap(), b"abcXefgh");
    }

    #[test]
    fn test_copy_past_origin() {
        let mut delta = b"4\n4@6,".to_vec();
        delta.extend_from_slice(&terminal(b"ghij"));
        let err = apply(b"abcdefgh", &delta).unwrap_err();
        assert!(matches!(err, DeltaError::OutOfBounds(_)));
    }

    #[test]
    fn test_copy_offset_overflow() {
        let mut delta = b"4\n4@".to_vec();
        delta.extend_from_slice(&encode_int(u64::MAX >> 1));
        delta.extend_from_slice(b",0;");
        let err = apply(b"abcdefgh", &delta).unwrap_err();
        assert!(matches!(err, DeltaError::OutOfBounds(_)));
    }

    #[test]
    fn test_write_past_declared_length() {
        let err = apply(b"abcdefgh", b"2\n3@0,0;").unwrap_err();
        assert!(matches!(err, DeltaError::OutOfBounds(_)));

        let err = apply(b"", b"2\n3:abc0;").unwrap_err();
        assert!(matches!(err, DeltaError::OutOfBounds(_)));
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = apply(b"", b"3\n3:abc0;").unwrap_err();
        assert!(matches!(
            err,
            DeltaError::ChecksumMismatch {
                expected: 0,
                actual: 0x6162_6300
            }
        ));
    }

    #[test]
    fn test_short_output() {
        let mut delta = b"5\n3:abc".to_vec();
        delta.extend_from_slice(&terminal(b"abc"));
        let err = apply(b"", &delta).unwrap_err();
        assert!(matches!(
            err,
            DeltaError::SizeMismatch {
                expected: 5,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_huge_declared_length_does_not_preallocate() {
        // Declares 15 * 2^60 bytes; must fail cleanly rather than allocate.
        let err = apply(b"", b"F0000000000\n0;").unwrap_err();
        assert!(matches!(err, DeltaError::SizeMismatch { .. }));
    }

    #[test]
    fn test_tally_reserve() {
        let mut tally = Tally::new(4);
        assert!(tally.reserve(4).is_ok());
        tally.record(b"ab");
        assert!(tally.reserve(2).is_ok());
        assert!(tally.reserve(3).is_err());
        assert!(tally.reserve(usize::MAX).is_err());
        assert_eq!(tally.written(), 2);
    }
}
