//! Base-64 digit encoding for every integer in the delta format.
//!
//! Integers are written big-endian as a minimal run of digits taken from a
//! 64-symbol ASCII alphabet. A run ends at the first byte that is not a digit,
//! which is how the operator bytes delimit fields.

use crate::buffer::BufferStream;
use crate::error::{DeltaError, Result};

/// Digit alphabet, indexed by digit value.
const DIGITS: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz~";

/// Number of value bits per digit.
const DIGIT_BITS: u32 = 6;

/// Marker for bytes outside the alphabet.
const NOT_A_DIGIT: u8 = 0xFF;

/// Longest encoding of a `u64` (ceil(64 / 6)).
const MAX_DIGITS: usize = 11;

/// Inverse of [`DIGITS`] over the full ASCII range.
static DIGIT_VALUES: [u8; 128] = build_digit_values();

const fn build_digit_values() -> [u8; 128] {
    let mut table = [NOT_A_DIGIT; 128];
    let mut i = 0;
    while i < DIGITS.len() {
        table[DIGITS[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Returns the value of `byte` as a digit, or `None` if it is not one.
#[inline]
pub fn digit_value(byte: u8) -> Option<u8> {
    match DIGIT_VALUES.get(byte as usize) {
        Some(&v) if v != NOT_A_DIGIT => Some(v),
        _ => None,
    }
}

/// Returns the number of digits [`encode_int`] produces for `value`.
pub fn digit_count(value: u64) -> usize {
    let mut count = 1;
    let mut rest = value >> DIGIT_BITS;
    while rest > 0 {
        count += 1;
        rest >>= DIGIT_BITS;
    }
    count
}

/// Writes `value` to the buffer as base-64 digits.
#[allow(clippy::cast_possible_truncation)]
pub fn write_int(buffer: &mut BufferStream, mut value: u64) {
    let mut digits = [0u8; MAX_DIGITS];
    let mut start = MAX_DIGITS;
    loop {
        start -= 1;
        digits[start] = DIGITS[(value & 0x3F) as usize];
        value >>= DIGIT_BITS;
        if value == 0 {
            break;
        }
    }
    buffer.write_bytes(&digits[start..]);
}

/// Encodes `value` as a minimal big-endian run of base-64 digits.
///
/// ```
/// assert_eq!(fdelta::encode_int(0), b"0");
/// assert_eq!(fdelta::encode_int(64), b"10");
/// assert_eq!(fdelta::encode_int(63), b"~");
/// ```
pub fn encode_int(value: u64) -> Vec<u8> {
    let mut buffer = BufferStream::with_capacity(MAX_DIGITS);
    write_int(&mut buffer, value);
    buffer.into_vec()
}

/// Decodes the digit run starting at `position`.
///
/// Returns the value and the number of bytes consumed. Fails with
/// [`DeltaError::InvalidInteger`] if no digit is present at `position` or the
/// value overflows a `u64`.
///
/// ```
/// let (value, used) = fdelta::decode_int(b"1a@0,", 0).unwrap();
/// assert_eq!((value, used), (101, 2));
/// ```
pub fn decode_int(bytes: &[u8], position: usize) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut consumed = 0;

    for &byte in bytes.get(position..).unwrap_or_default() {
        let Some(digit) = digit_value(byte) else {
            break;
        };
        value = value
            .checked_mul(1 << DIGIT_BITS)
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or(DeltaError::InvalidInteger { position })?;
        consumed += 1;
    }

    if consumed == 0 {
        return Err(DeltaError::InvalidInteger { position });
    }

    Ok((value, consumed))
}
