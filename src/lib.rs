//! # fdelta
//!
//! Compact, checksummed deltas between two similar byte buffers, in the Fossil
//! delta format.
//!
//! A delta records how to rebuild a *target* from an *origin*: runs copied
//! from the origin, literal bytes inserted where nothing matches, and a
//! checksum of the whole target. Deltas are plain ASCII apart from the inserted
//! bytes.
//!
//! ## Quick Start
//!
//! ```
//! use fdelta::{apply, create};
//!
//! let origin = b"Hello, World!";
//! let target = b"Hello, Rust!";
//!
//! // Create the delta
//! let delta = create(origin, target);
//!
//! // Apply it to recover the target
//! let recovered = apply(origin, &delta).unwrap();
//! assert_eq!(recovered, target);
//! ```
//!
//! ## Format
//!
//! ```text
//! <target length> '\n'
//! <len> '@' <origin offset> ','     copy from the origin
//! <len> ':' <len raw bytes>         insert literal bytes
//! <checksum> ';'                    terminal checksum of the target
//! ```
//!
//! Integers are big-endian base-64 digits from the alphabet
//! `0-9 A-Z _ a-z ~`.
//!
//! ## Algorithm Details
//!
//! Delta creation works by:
//! 1. Hashing the origin in 16-byte blocks with a rolling hash
//! 2. Scanning the target with the same rolling hash, and checking every
//!    position against both the indexed blocks and the alignment of the
//!    previous copy
//! 3. Extending each true match forward and backward, keeping the longest one
//!    that is cheaper to encode than the literal bytes it replaces
//! 4. Emitting inserts for whatever lies between copies, then the checksum
//!
//! Application replays the operations in order and fails on any structural
//! problem, out-of-range copy, size mismatch or checksum mismatch. A failed
//! application never returns partial output.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod analyze;
mod apply;
mod buffer;
mod checksum;
mod create;
mod error;
mod format;
mod rolling;
mod stream;
mod varint;

pub use analyze::{DeltaStats, analyze, output_size};
pub use checksum::{Checksum, checksum};
pub use error::{DeltaError, Result};
pub use format::{DeltaOp, DeltaReader};
pub use rolling::{NHASH, RollingHash};
pub use stream::{OriginSource, SeekOrigin, apply_stream, create_stream};
pub use varint::{decode_int, digit_count, encode_int};

/// Creates a delta that reconstructs `target` from `origin`.
///
/// Creation cannot fail for in-memory buffers. The result can be handed to
/// [`apply`] together with the same origin.
///
/// # Examples
///
/// ```
/// let origin = b"abcdefgh";
/// let target = b"abcXefgh";
///
/// let delta = fdelta::create(origin, target);
/// assert!(delta.starts_with(b"8\n3@0,1:X4@4,"));
/// ```
///
/// # Performance
///
/// The origin is indexed once per call; the scan over the target is linear
/// apart from the bounded number of candidates probed at each position.
pub fn create(origin: &[u8], target: &[u8]) -> Vec<u8> {
    create::create(origin, target)
}

/// Applies `delta` to `origin` and returns the reconstructed target.
///
/// # Errors
///
/// - [`DeltaError::MalformedHeader`] if the target length header is missing
/// - [`DeltaError::UnknownOperator`] for an unknown operator byte, or if the
///   delta ends before its terminal checksum
/// - [`DeltaError::InvalidInteger`] for a missing or oversized number
/// - [`DeltaError::OutOfBounds`] if a copy leaves the origin or the output
///   would grow past the declared length
/// - [`DeltaError::ChecksumMismatch`] if the output does not match the
///   checksum carried by the delta
/// - [`DeltaError::SizeMismatch`] if the output is shorter than declared
///
/// # Examples
///
/// ```
/// use fdelta::{apply, create};
///
/// let origin = b"Hello, World!";
/// let target = b"Hello, Rust!";
///
/// let delta = create(origin, target);
/// let recovered = apply(origin, &delta).unwrap();
///
/// assert_eq!(recovered, target);
/// ```
pub fn apply(origin: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    apply::apply(origin, delta)
}
