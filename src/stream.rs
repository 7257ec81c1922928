//! Stream adapters around [`create`](crate::create) and [`apply`](crate::apply).
//!
//! The origin is read on demand through [`OriginSource`] and the target is
//! written to any [`Write`] sink as operations are replayed. Validation is the
//! same as for the in-memory functions, but bytes may already have reached
//! the sink when an error is returned: on `Err` the sink's content must be
//! discarded.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::apply::{Tally, copy_range};
use crate::create::create;
use crate::error::{DeltaError, Result};
use crate::format::{DeltaOp, DeltaReader};

/// Size of the scratch buffer used to move copied origin bytes.
const COPY_CHUNK: usize = 64 * 1024;

/// Random-access byte source for the origin of a delta.
pub trait OriginSource {
    /// Total length of the origin in bytes.
    fn len(&mut self) -> Result<u64>;

    /// Fills `buf` with origin bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

impl OriginSource for &[u8] {
    fn len(&mut self) -> Result<u64> {
        Ok(<[u8]>::len(*self) as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| DeltaError::OutOfBounds(format!("origin offset {} too large", offset)))?;
        let end = copy_range(start, buf.len(), <[u8]>::len(*self) as u64)?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }
}

/// [`OriginSource`] over a seekable reader such as a file.
#[derive(Debug)]
pub struct SeekOrigin<R> {
    inner: R,
    len: Option<u64>,
}

impl<R: Read + Seek> SeekOrigin<R> {
    /// Wraps a seekable reader.
    pub fn new(inner: R) -> Self {
        Self { inner, len: None }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> OriginSource for SeekOrigin<R> {
    fn len(&mut self) -> Result<u64> {
        if let Some(len) = self.len {
            return Ok(len);
        }
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.len = Some(len);
        Ok(len)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }
}

/// Applies `delta` to an origin source, writing the target to `sink`.
///
/// Returns the number of bytes written.
pub fn apply_stream<O, W>(origin: &mut O, delta: &[u8], sink: &mut W) -> Result<u64>
where
    O: OriginSource + ?Sized,
    W: Write + ?Sized,
{
    let reader = DeltaReader::new(delta)?;
    let origin_len = origin.len()?;
    let mut tally = Tally::new(reader.target_len());
    let mut scratch = Vec::new();

    for op in reader {
        match op? {
            DeltaOp::Copy { len, offset } => {
                tally.reserve(len)?;
                copy_range(offset, len, origin_len)?;

                scratch.resize(len.min(COPY_CHUNK), 0);
                let mut done = 0;
                while done < len {
                    let step = (len - done).min(COPY_CHUNK);
                    let chunk = &mut scratch[..step];
                    origin.read_at((offset + done) as u64, chunk)?;
                    tally.record(chunk);
                    sink.write_all(chunk)?;
                    done += step;
                }
            }
            DeltaOp::Insert { data } => {
                tally.reserve(data.len())?;
                tally.record(data);
                sink.write_all(data)?;
            }
            DeltaOp::Checksum(expected) => {
                tally.finish(expected)?;
                sink.flush()?;
                return Ok(tally.written() as u64);
            }
        }
    }

    Err(DeltaError::UnknownOperator {
        operator: None,
        position: delta.len(),
    })
}

/// Reads `origin` and `target` to the end and writes their delta to `sink`.
///
/// Returns the size of the delta.
pub fn create_stream<R1, R2, W>(mut origin: R1, mut target: R2, mut sink: W) -> Result<u64>
where
    R1: Read,
    R2: Read,
    W: Write,
{
    let mut origin_bytes = Vec::new();
    origin.read_to_end(&mut origin_bytes)?;
    let mut target_bytes = Vec::new();
    target.read_to_end(&mut target_bytes)?;

    let delta = create(&origin_bytes, &target_bytes);
    sink.write_all(&delta)?;
    sink.flush()?;
    Ok(delta.len() as u64)
}
