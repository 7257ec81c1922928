//! Delta wire format.
//!
//! ```text
//! <len> '\n' ( <n> '@' <offset> ',' | <n> ':' <n raw bytes> )* <checksum> ';'
//! ```
//!
//! Every integer is a base-64 digit run (see [`crate::varint`]). Copy offsets
//! are absolute positions in the origin. Anything after the terminal `;` is
//! ignored.

use crate::buffer::{BufferStream, SliceCursor};
use crate::error::{DeltaError, Result};
use crate::varint::{decode_int, digit_value, write_int};

/// Terminates the target length header.
pub const HEADER_END: u8 = b'\n';

/// Copy operator: `<len>@<offset>,`.
pub const COPY: u8 = b'@';

/// Terminates the offset of a copy.
pub const COPY_END: u8 = b',';

/// Insert operator: `<len>:<bytes>`.
pub const INSERT: u8 = b':';

/// Terminal operator: `<checksum>;`.
pub const CHECKSUM: u8 = b';';

/// A single operation of a delta, in target order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOp<'a> {
    /// Copy `len` bytes from the origin starting at `offset`.
    Copy {
        /// Number of bytes to copy.
        len: usize,
        /// Absolute offset in the origin.
        offset: usize,
    },
    /// Emit literal bytes carried by the delta.
    Insert {
        /// The literal bytes.
        data: &'a [u8],
    },
    /// Terminal operation carrying the checksum of the whole target.
    Checksum(u32),
}

/// Writes the target length header.
pub fn write_header(buffer: &mut BufferStream, target_len: usize) {
    write_int(buffer, target_len as u64);
    buffer.write_u8(HEADER_END);
}

/// Writes one operation.
pub fn write_op(buffer: &mut BufferStream, op: &DeltaOp<'_>) {
    match *op {
        DeltaOp::Copy { len, offset } => {
            write_int(buffer, len as u64);
            buffer.write_u8(COPY);
            write_int(buffer, offset as u64);
            buffer.write_u8(COPY_END);
        }
        DeltaOp::Insert { data } => {
            write_int(buffer, data.len() as u64);
            buffer.write_u8(INSERT);
            buffer.write_bytes(data);
        }
        DeltaOp::Checksum(sum) => {
            write_int(buffer, u64::from(sum));
            buffer.write_u8(CHECKSUM);
        }
    }
}

/// Lazy parser over the operations of a delta.
///
/// The header is parsed by [`DeltaReader::new`]; each call to `next` then
/// parses exactly one operation. The terminal [`DeltaOp::Checksum`] is the
/// last item; a delta that ends before it yields
/// [`DeltaError::UnknownOperator`] with `operator: None`. After the first
/// error the iterator is fused.
#[derive(Debug, Clone)]
pub struct DeltaReader<'a> {
    cursor: SliceCursor<'a>,
    target_len: usize,
    done: bool,
}

impl<'a> DeltaReader<'a> {
    /// Parses the header of `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::MalformedHeader`] if the delta does not start with
    /// a length followed by `'\n'`.
    pub fn new(delta: &'a [u8]) -> Result<Self> {
        let mut cursor = SliceCursor::new(delta);

        let (declared, used) = decode_int(delta, 0).map_err(|_| {
            DeltaError::MalformedHeader("missing target length".to_string())
        })?;
        cursor.advance(used);

        match cursor.read_u8() {
            Some(HEADER_END) => {}
            Some(other) => {
                return Err(DeltaError::MalformedHeader(format!(
                    "target length terminated by {:?} instead of '\\n'",
                    char::from(other)
                )));
            }
            None => {
                return Err(DeltaError::MalformedHeader(
                    "target length not terminated".to_string(),
                ));
            }
        }

        let target_len = usize::try_from(declared).map_err(|_| {
            DeltaError::MalformedHeader(format!("target length {} does not fit in memory", declared))
        })?;

        Ok(Self {
            cursor,
            target_len,
            done: false,
        })
    }

    /// Returns the target length declared by the header.
    #[inline]
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Returns the offset of the next unparsed byte of the delta.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    fn truncated(&self) -> DeltaError {
        DeltaError::UnknownOperator {
            operator: None,
            position: self.cursor.data().len(),
        }
    }

    /// Reads a digit run at the cursor. End of input counts as truncation,
    /// any other non-digit as an invalid integer.
    fn read_int(&mut self) -> Result<u64> {
        if self.cursor.is_exhausted() {
            return Err(self.truncated());
        }
        let (value, used) = decode_int(self.cursor.data(), self.cursor.position())?;
        self.cursor.advance(used);
        Ok(value)
    }

    fn read_len(&mut self) -> Result<usize> {
        let position = self.cursor.position();
        let value = self.read_int()?;
        usize::try_from(value).map_err(|_| DeltaError::InvalidInteger { position })
    }

    fn parse_op(&mut self) -> Result<DeltaOp<'a>> {
        let len_position = self.cursor.position();
        let len = self.read_len()?;

        let op_position = self.cursor.position();
        match self.cursor.read_u8() {
            Some(COPY) => {
                let offset = self.read_len()?;
                let end_position = self.cursor.position();
                match self.cursor.read_u8() {
                    Some(COPY_END) => Ok(DeltaOp::Copy { len, offset }),
                    Some(other) => Err(DeltaError::UnknownOperator {
                        operator: Some(other),
                        position: end_position,
                    }),
                    None => Err(self.truncated()),
                }
            }
            Some(INSERT) => match self.cursor.read_bytes(len) {
                Some(data) => Ok(DeltaOp::Insert { data }),
                None => Err(self.truncated()),
            },
            Some(CHECKSUM) => {
                let sum = u32::try_from(len).map_err(|_| DeltaError::InvalidInteger {
                    position: len_position,
                })?;
                Ok(DeltaOp::Checksum(sum))
            }
            Some(other) => {
                debug_assert!(digit_value(other).is_none());
                Err(DeltaError::UnknownOperator {
                    operator: Some(other),
                    position: op_position,
                })
            }
            None => Err(self.truncated()),
        }
    }
}

impl<'a> Iterator for DeltaReader<'a> {
    type Item = Result<DeltaOp<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let op = self.parse_op();
        if matches!(op, Ok(DeltaOp::Checksum(_)) | Err(_)) {
            self.done = true;
        }
        Some(op)
    }
}
