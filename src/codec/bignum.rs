//! Minimal arbitrary-precision natural numbers for mixed-radix coding.
//!
//! Only the operations the codec needs: conversion from and to big-endian
//! bytes, division and multiply-add by a small radix, and bit length.
//! Limbs are little-endian `u32` with no trailing zero limbs.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Natural {
    limbs: Vec<u32>,
}

impl Natural {
    pub fn zero() -> Self {
        Self { limbs: Vec::new() }
    }

    pub fn one() -> Self {
        Self { limbs: vec![1] }
    }

    pub fn from_u64(value: u64) -> Self {
        let mut n = Self {
            limbs: vec![value as u32, (value >> 32) as u32],
        };
        n.trim();
        n
    }

    /// Interprets `bytes` as a big-endian unsigned integer.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let mut limbs = Vec::with_capacity(bytes.len() / 4 + 1);
        for chunk in bytes.rchunks(4) {
            let mut limb = 0u32;
            for &b in chunk {
                limb = (limb << 8) | b as u32;
            }
            limbs.push(limb);
        }
        let mut n = Self { limbs };
        n.trim();
        n
    }

    /// Big-endian bytes left-padded to `width`. Returns `None` if the
    /// value does not fit.
    pub fn to_be_bytes(&self, width: usize) -> Option<Vec<u8>> {
        if self.bits() > width * 8 {
            return None;
        }
        let mut out = vec![0u8; width];
        for (i, limb) in self.limbs.iter().enumerate() {
            for j in 0..4 {
                let pos = i * 4 + j;
                if pos < width {
                    out[width - 1 - pos] = (limb >> (8 * j)) as u8;
                }
            }
        }
        Some(out)
    }

    /// Value as `u64`, if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        match self.limbs.len() {
            0 => Some(0),
            1 => Some(self.limbs[0] as u64),
            2 => Some(self.limbs[0] as u64 | (self.limbs[1] as u64) << 32),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    /// Number of significant bits (0 for zero).
    pub fn bits(&self) -> usize {
        match self.limbs.last() {
            Some(&top) => (self.limbs.len() - 1) * 32 + (32 - top.leading_zeros() as usize),
            None => 0,
        }
    }

    /// True iff `self >= 2^exp`.
    pub fn at_least_pow2(&self, exp: usize) -> bool {
        self.bits() > exp
    }

    /// Divides in place by `divisor`, returning the remainder.
    pub fn div_rem_small(&mut self, divisor: u32) -> u32 {
        debug_assert!(divisor > 0);
        let d = divisor as u64;
        let mut rem = 0u64;
        for limb in self.limbs.iter_mut().rev() {
            let cur = (rem << 32) | *limb as u64;
            *limb = (cur / d) as u32;
            rem = cur % d;
        }
        self.trim();
        rem as u32
    }

    /// `self = self * mul + add`.
    pub fn mul_add_small(&mut self, mul: u32, add: u32) {
        let mut carry = add as u64;
        for limb in self.limbs.iter_mut() {
            let cur = *limb as u64 * mul as u64 + carry;
            *limb = cur as u32;
            carry = cur >> 32;
        }
        if carry > 0 {
            self.limbs.push(carry as u32);
        }
        self.trim();
    }

    /// `self += other * factor`.
    pub fn add_scaled(&mut self, other: &Natural, factor: u32) {
        if factor == 0 || other.is_zero() {
            return;
        }
        if self.limbs.len() < other.limbs.len() + 1 {
            self.limbs.resize(other.limbs.len() + 1, 0);
        }
        let mut carry = 0u64;
        for i in 0..self.limbs.len() {
            let scaled = other.limbs.get(i).copied().unwrap_or(0) as u64 * factor as u64;
            let cur = self.limbs[i] as u64 + scaled + carry;
            self.limbs[i] = cur as u32;
            carry = cur >> 32;
        }
        if carry > 0 {
            self.limbs.push(carry as u32);
        }
        self.trim();
    }

    fn trim(&mut self) {
        while self.limbs.last() == Some(&0) {
            self.limbs.pop();
        }
    }
}
