//! Mixed-radix field coding.
//!
//! A field is a big-endian unsigned number of known bit width. It is written
//! least-significant digit first, one digit per informative ply, where each
//! ply supplies its own radix. The field is complete at the first ply where
//! the product of the radices seen so far reaches `2^width`.

use super::bignum::Natural;
use super::CodecError;

/// Emits the digits of one field.
#[derive(Debug, Clone)]
pub struct FieldEncoder {
    value: Natural,
    width: usize,
    reach: Natural,
}

impl FieldEncoder {
    /// `bytes` as a big-endian field of `8 * bytes.len()` bits.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            value: Natural::from_be_bytes(bytes),
            width: bytes.len() * 8,
            reach: Natural::one(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_complete(&self) -> bool {
        self.reach.at_least_pow2(self.width)
    }

    /// Next digit for a ply of `radix` (>= 2).
    pub fn next_digit(&mut self, radix: u32) -> u32 {
        let digit = self.value.div_rem_small(radix);
        self.reach.mul_add_small(radix, 0);
        digit
    }
}

/// Accumulates the digits of one field.
#[derive(Debug, Clone)]
pub struct FieldDecoder {
    value: Natural,
    width: usize,
    reach: Natural,
}

impl FieldDecoder {
    pub fn new(width: usize) -> Self {
        Self {
            value: Natural::zero(),
            width,
            reach: Natural::one(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_complete(&self) -> bool {
        self.reach.at_least_pow2(self.width)
    }

    /// Adds `digit` (< `radix`) at the current place value.
    pub fn push(&mut self, digit: u32, radix: u32) -> Result<(), CodecError> {
        if digit >= radix {
            return Err(CodecError::DigitOutOfRange { digit, radix });
        }
        self.value.add_scaled(&self.reach, digit);
        self.reach.mul_add_small(radix, 0);
        Ok(())
    }

    /// Big-endian bytes of the decoded value.
    ///
    /// Fails with [`CodecError::FieldOverflow`] if the value does not fit
    /// the field width.
    pub fn into_bytes(self) -> Result<Vec<u8>, CodecError> {
        let width = self.width;
        self.value
            .to_be_bytes(width / 8)
            .ok_or(CodecError::FieldOverflow { width })
    }
}
