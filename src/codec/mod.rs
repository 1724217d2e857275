//! Symbol codec: framed payload <-> sequence of per-ply digits.
//!
//! This module provides:
//! - Arbitrary-precision naturals for the message field
//! - Mixed-radix field encoders and decoders
//! - The payload frame: 32-bit length, message, optional 32-bit tag
//!
//! Each informative ply contributes one digit whose radix is the number of
//! legal moves at that ply. Plies with a single legal move carry nothing and
//! are skipped by both directions.

pub mod bignum;
pub mod radix;

use std::collections::VecDeque;

use thiserror::Error;

pub use bignum::Natural;
pub use radix::{FieldDecoder, FieldEncoder};

use crate::{LENGTH_PREFIX_BYTES, TAG_BYTES};

/// Errors from frame decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Field of {width} bits overflowed")]
    FieldOverflow { width: usize },

    #[error("Declared length {len} exceeds maximum {max}")]
    LengthTooLarge { len: u64, max: usize },

    #[error("Digit stream ended before the frame was complete")]
    Truncated,

    #[error("Digit {digit} out of range for radix {radix}")]
    DigitOutOfRange { digit: u32, radix: u32 },
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message: Vec<u8>,
    pub tag: Option<[u8; TAG_BYTES]>,
}

/// Produces the digits of a framed payload.
#[derive(Debug, Clone)]
pub struct SymbolEncoder {
    fields: VecDeque<FieldEncoder>,
    digits_emitted: usize,
}

impl SymbolEncoder {
    /// Frames `message`, followed by `tag` when present.
    pub fn new(message: &[u8], tag: Option<[u8; TAG_BYTES]>) -> Self {
        let len = message.len() as u32;
        let mut fields = VecDeque::with_capacity(3);
        fields.push_back(FieldEncoder::from_bytes(&len.to_be_bytes()));
        fields.push_back(FieldEncoder::from_bytes(message));
        if let Some(tag) = tag {
            fields.push_back(FieldEncoder::from_bytes(&tag));
        }
        let mut encoder = Self {
            fields,
            digits_emitted: 0,
        };
        encoder.drop_complete();
        encoder
    }

    pub fn is_done(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total bits framed, including length and tag.
    pub fn frame_bits(message_len: usize, with_tag: bool) -> usize {
        let tag = if with_tag { TAG_BYTES } else { 0 };
        (LENGTH_PREFIX_BYTES + message_len + tag) * 8
    }

    pub fn digits_emitted(&self) -> usize {
        self.digits_emitted
    }

    /// Digit for a ply with `radix` legal moves.
    ///
    /// Returns `None` once the frame is complete. A forced ply (`radix <= 1`)
    /// yields `Some(0)` without consuming anything.
    pub fn next_digit(&mut self, radix: usize) -> Option<usize> {
        if radix <= 1 {
            return if self.is_done() { None } else { Some(0) };
        }
        let field = self.fields.front_mut()?;
        let digit = field.next_digit(radix as u32);
        self.digits_emitted += 1;
        self.drop_complete();
        Some(digit as usize)
    }

    fn drop_complete(&mut self) {
        while self.fields.front().is_some_and(|f| f.is_complete()) {
            self.fields.pop_front();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Length,
    Message,
    Tag,
    Done,
}

/// Rebuilds a frame from per-ply digits.
#[derive(Debug, Clone)]
pub struct SymbolDecoder {
    stage: Stage,
    current: FieldDecoder,
    max_len: usize,
    with_tag: bool,
    message: Vec<u8>,
    tag: Option<[u8; TAG_BYTES]>,
    digits_consumed: usize,
}

impl SymbolDecoder {
    /// Decoder rejecting declared lengths above `max_len`.
    pub fn new(max_len: usize, with_tag: bool) -> Self {
        Self {
            stage: Stage::Length,
            current: FieldDecoder::new(LENGTH_PREFIX_BYTES * 8),
            max_len,
            with_tag,
            message: Vec::new(),
            tag: None,
            digits_consumed: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    pub fn digits_consumed(&self) -> usize {
        self.digits_consumed
    }

    /// Declared message length, once the length field is complete.
    pub fn declared_len(&self) -> Option<usize> {
        match self.stage {
            Stage::Length => None,
            _ => Some(self.current_message_len()),
        }
    }

    fn current_message_len(&self) -> usize {
        match self.stage {
            Stage::Message => self.current.width() / 8,
            _ => self.message.len(),
        }
    }

    /// Feeds the digit of a ply with `radix` legal moves.
    ///
    /// Forced plies and digits after completion are ignored.
    pub fn push(&mut self, digit: usize, radix: usize) -> Result<(), CodecError> {
        if radix <= 1 || self.is_done() {
            return Ok(());
        }
        if digit >= radix {
            return Err(CodecError::DigitOutOfRange {
                digit: digit as u32,
                radix: radix as u32,
            });
        }
        self.current.push(digit as u32, radix as u32)?;
        self.digits_consumed += 1;
        while !self.is_done() && self.current.is_complete() {
            self.advance()?;
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<(), CodecError> {
        let finished = std::mem::replace(&mut self.current, FieldDecoder::new(0));
        let bytes = finished.into_bytes()?;
        match self.stage {
            Stage::Length => {
                let mut raw = [0u8; LENGTH_PREFIX_BYTES];
                raw.copy_from_slice(&bytes);
                let len = u32::from_be_bytes(raw) as u64;
                if len > self.max_len as u64 {
                    return Err(CodecError::LengthTooLarge {
                        len,
                        max: self.max_len,
                    });
                }
                self.current = FieldDecoder::new(len as usize * 8);
                self.stage = Stage::Message;
            }
            Stage::Message => {
                self.message = bytes;
                if self.with_tag {
                    self.current = FieldDecoder::new(TAG_BYTES * 8);
                    self.stage = Stage::Tag;
                } else {
                    self.stage = Stage::Done;
                }
            }
            Stage::Tag => {
                let mut tag = [0u8; TAG_BYTES];
                tag.copy_from_slice(&bytes);
                self.tag = Some(tag);
                self.stage = Stage::Done;
            }
            Stage::Done => {}
        }
        Ok(())
    }

    /// The decoded frame; [`CodecError::Truncated`] if digits ran out.
    pub fn finish(self) -> Result<Frame, CodecError> {
        if !self.is_done() {
            return Err(CodecError::Truncated);
        }
        Ok(Frame {
            message: self.message,
            tag: self.tag,
        })
    }
}
