//! Inspection of deltas without an origin.

use crate::error::Result;
use crate::format::{DeltaOp, DeltaReader};

/// Summary of what a delta does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaStats {
    /// Target length declared by the header.
    pub target_len: usize,
    /// Bytes copied from the origin.
    pub copied: usize,
    /// Bytes carried literally by the delta.
    pub inserted: usize,
    /// Number of copy operations.
    pub copy_ops: usize,
    /// Number of insert operations.
    pub insert_ops: usize,
}

/// Returns the size of the target that `delta` reconstructs, read from its
/// header.
pub fn output_size(delta: &[u8]) -> Result<usize> {
    Ok(DeltaReader::new(delta)?.target_len())
}

/// Walks every operation of `delta` and counts copied and inserted bytes.
///
/// The structure is fully validated; the checksum is not, since that needs
/// the origin.
pub fn analyze(delta: &[u8]) -> Result<DeltaStats> {
    let reader = DeltaReader::new(delta)?;
    let mut stats = DeltaStats {
        target_len: reader.target_len(),
        ..DeltaStats::default()
    };

    for op in reader {
        match op? {
            DeltaOp::Copy { len, .. } => {
                stats.copied = stats.copied.saturating_add(len);
                stats.copy_ops += 1;
            }
            DeltaOp::Insert { data } => {
                stats.inserted += data.len();
                stats.insert_ops += 1;
            }
            DeltaOp::Checksum(_) => {}
        }
    }

    Ok(stats)
}
