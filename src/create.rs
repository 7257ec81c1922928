//! Delta creation.
//!
//! The origin is cut into [`NHASH`]-byte blocks which are indexed by their
//! rolling hash. The target is then scanned with the same rolling hash; every
//! position is checked against the blocks in its bucket and against the
//! current alignment (the origin/target offset pair of the last copy). The
//! first position that yields a copy worth its encoding fixes the next copy,
//! and everything between the previous copy and it becomes an insert.

use crate::buffer::{BufferStream, INIT_BUFFER_SIZE};
use crate::checksum::checksum;
use crate::format::{DeltaOp, write_header, write_op};
use crate::rolling::{NHASH, RollingHash};
use crate::varint::digit_count;

/// Maximum number of origin blocks probed per target position.
const MAX_CHAIN: usize = 250;

/// Marks the end of a bucket chain.
const EMPTY: usize = usize::MAX;

/// Hash index over the full blocks of the origin.
///
/// Buckets are singly linked lists stored in two flat arrays: `heads[bucket]`
/// is the most recently inserted block of a bucket and `next[block]` the block
/// inserted before it.
struct OriginIndex {
    heads: Vec<usize>,
    next: Vec<usize>,
}

impl OriginIndex {
    fn build(origin: &[u8]) -> Self {
        let blocks = origin.len() / NHASH;
        if origin.len() <= NHASH {
            return Self {
                heads: Vec::new(),
                next: Vec::new(),
            };
        }

        let mut heads = vec![EMPTY; blocks];
        let mut next = vec![EMPTY; blocks];
        for block in 0..blocks {
            let hash = RollingHash::new(origin, block * NHASH);
            let bucket = hash.value() as usize % blocks;
            next[block] = heads[bucket];
            heads[bucket] = block;
        }

        Self { heads, next }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Iterates the origin offsets of the blocks whose hash falls in the same
    /// bucket as `hash`, newest first.
    fn candidates(&self, hash: u32) -> impl Iterator<Item = usize> + '_ {
        let mut block = self.heads[hash as usize % self.heads.len()];
        std::iter::from_fn(move || {
            if block == EMPTY {
                return None;
            }
            let offset = block * NHASH;
            block = self.next[block];
            Some(offset)
        })
        .take(MAX_CHAIN)
    }
}

/// A matching run: `target[start..start + len] == origin[offset..offset + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    start: usize,
    offset: usize,
    len: usize,
}

impl Run {
    #[inline]
    fn end(&self) -> usize {
        self.start + self.len
    }

    /// Origin offset minus target offset.
    #[inline]
    fn diagonal(&self) -> isize {
        self.offset as isize - self.start as isize
    }
}

/// Scanner state for one `create` call.
struct Matcher<'a> {
    origin: &'a [u8],
    target: &'a [u8],
    index: OriginIndex,
}

impl<'a> Matcher<'a> {
    /// Extends a match anchored at `origin[offset] == target[pos]` forward and
    /// backward. The backward walk stops at `floor`.
    fn extend(&self, offset: usize, pos: usize, forward: usize, floor: usize) -> Run {
        let back = common_suffix_len(&self.origin[..offset], &self.target[floor..pos]);
        Run {
            start: pos - back,
            offset: offset - back,
            len: back + forward,
        }
    }

    /// Applies the seam rule: a run that reaches back to the start of the
    /// pending copy absorbs it; any other run is trimmed to begin at `base`.
    fn clamp(run: Run, base: usize, pending: Option<Run>) -> Run {
        if run.start >= base || pending.is_some_and(|p| p.start == run.start) {
            return run;
        }
        let cut = base - run.start;
        Run {
            start: base,
            offset: run.offset + cut,
            len: run.len - cut,
        }
    }

    /// Looks for the next copy at or after `base`.
    fn next_copy(&self, base: usize, pending: Option<Run>, diagonal: isize) -> Option<Run> {
        let target = self.target;
        let floor = pending.map_or(base, |p| p.start);
        let mut hash = (!self.index.is_empty() && base + NHASH <= target.len())
            .then(|| RollingHash::new(target, base));

        for pos in base..target.len() {
            let mut best = self.aligned_candidate(pos, base, floor, pending, diagonal);

            if let Some(window) = &hash {
                for offset in self.index.candidates(window.value()) {
                    let forward = common_prefix_len(&self.origin[offset..], &target[pos..]);
                    if forward < NHASH {
                        continue;
                    }
                    let run = Self::clamp(self.extend(offset, pos, forward, floor), base, pending);
                    let literal = run.start.saturating_sub(base);
                    let cost = digit_count(literal as u64)
                        + digit_count(run.len as u64)
                        + digit_count(run.offset as u64)
                        + 3;
                    if run.len >= cost && best.is_none_or(|b| run.len > b.len) {
                        best = Some(run);
                    }
                }
            }

            if best.is_some() {
                return best;
            }

            if let Some(window) = hash.as_mut() {
                if pos + NHASH < target.len() {
                    window.advance(target[pos + NHASH]);
                } else {
                    hash = None;
                }
            }
        }

        None
    }

    /// Candidate that continues the alignment of the last copy.
    fn aligned_candidate(
        &self,
        pos: usize,
        base: usize,
        floor: usize,
        pending: Option<Run>,
        diagonal: isize,
    ) -> Option<Run> {
        let offset = usize::try_from(pos as isize + diagonal).ok()?;
        if offset >= self.origin.len() {
            return None;
        }

        let forward = common_prefix_len(&self.origin[offset..], &self.target[pos..]);
        if forward == 0 {
            return None;
        }

        let run = Self::clamp(self.extend(offset, pos, forward, floor), base, pending);
        let cost = digit_count(run.len as u64) + digit_count(run.offset as u64) + 1;
        (run.len >= cost).then_some(run)
    }
}

/// Writes operations, holding the last copy back so a later run can absorb it.
struct Emitter<'a> {
    target: &'a [u8],
    out: BufferStream,
    copies: usize,
    inserts: usize,
}

impl Emitter<'_> {
    fn copy(&mut self, run: Run) {
        tracing::trace!(len = run.len, offset = run.offset, at = run.start, "copy");
        write_op(
            &mut self.out,
            &DeltaOp::Copy {
                len: run.len,
                offset: run.offset,
            },
        );
        self.copies += 1;
    }

    fn insert(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        tracing::trace!(len = end - start, at = start, "insert");
        write_op(
            &mut self.out,
            &DeltaOp::Insert {
                data: &self.target[start..end],
            },
        );
        self.inserts += 1;
    }
}

/// Creates a delta that turns `origin` into `target`.
pub fn create(origin: &[u8], target: &[u8]) -> Vec<u8> {
    let matcher = Matcher {
        origin,
        target,
        index: OriginIndex::build(origin),
    };
    let mut emitter = Emitter {
        target,
        out: BufferStream::with_capacity(INIT_BUFFER_SIZE.min(target.len() + 32)),
        copies: 0,
        inserts: 0,
    };
    write_header(&mut emitter.out, target.len());

    let mut base = 0;
    let mut diagonal = 0isize;
    let mut pending: Option<Run> = None;

    while base < target.len() {
        let Some(run) = matcher.next_copy(base, pending, diagonal) else {
            break;
        };

        match pending.take() {
            Some(prev) if prev.start == run.start => {
                tracing::trace!(len = prev.len, at = prev.start, "copy absorbed");
            }
            Some(prev) => {
                emitter.copy(prev);
                emitter.insert(base, run.start);
            }
            None => emitter.insert(base, run.start),
        }

        base = run.end();
        diagonal = run.diagonal();
        pending = Some(run);
    }

    if let Some(prev) = pending {
        emitter.copy(prev);
    }
    emitter.insert(base, target.len());
    write_op(&mut emitter.out, &DeltaOp::Checksum(checksum(target)));

    tracing::debug!(
        origin_len = origin.len(),
        target_len = target.len(),
        delta_len = emitter.out.len(),
        copies = emitter.copies,
        inserts = emitter.inserts,
        "delta created"
    );

    emitter.out.into_vec()
}

/// Copies a fixed-size block out of `data` at `at`.
#[cfg(feature = "simd")]
#[inline]
fn block<const N: usize>(data: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[at..at + N]);
    out
}

/// Length of the common prefix of two byte slices.
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    let max_len = a.len().min(b.len());
    let mut len = 0;

    #[cfg(feature = "simd")]
    {
        use wide::u8x16;

        // Process 16 bytes at a time with SIMD
        while len + 16 <= max_len {
            if u8x16::new(block(a, len)) != u8x16::new(block(b, len)) {
                break;
            }
            len += 16;
        }
    }

    while len + 8 <= max_len {
        let a_chunk = u64::from_le_bytes(chunk8(a, len));
        let b_chunk = u64::from_le_bytes(chunk8(b, len));
        if a_chunk != b_chunk {
            break;
        }
        len += 8;
    }

    while len < max_len && a[len] == b[len] {
        len += 1;
    }

    len
}

/// Length of the common suffix of two byte slices.
fn common_suffix_len(a: &[u8], b: &[u8]) -> usize {
    let max_len = a.len().min(b.len());
    let mut len = 0;

    #[cfg(feature = "simd")]
    {
        use wide::u8x16;

        while len + 16 <= max_len {
            let a_start = a.len() - len - 16;
            let b_start = b.len() - len - 16;
            if u8x16::new(block(a, a_start)) != u8x16::new(block(b, b_start)) {
                break;
            }
            len += 16;
        }
    }

    while len + 8 <= max_len {
        let a_start = a.len() - len - 8;
        let b_start = b.len() - len - 8;
        if chunk8(a, a_start) != chunk8(b, b_start) {
            break;
        }
        len += 8;
    }

    while len < max_len && a[a.len() - len - 1] == b[b.len() - len - 1] {
        len += 1;
    }

    len
}

#[inline]
fn chunk8(data: &[u8], at: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&data[at..at + 8]);
    out
}
