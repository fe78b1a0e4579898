// SPDX-License-Identifier: MIT

//! Fixed-length big-endian counters.
//!
//! A [`BigCounter`] holds the working state of the hash based
//! generators (`V`, `C`) as well as their reseed counters. The length
//! is fixed when the counter is created and all arithmetic is modulo
//! `2^(8 * len)`.
use alloc::{vec, vec::Vec};
use core::cmp::Ordering;
use zeroize::Zeroize;

/// Unsigned big-endian integer of fixed byte length.
#[derive(Clone, PartialEq, Eq)]
pub struct BigCounter {
    bytes: Vec<u8>,
}

impl core::fmt::Debug for BigCounter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BigCounter")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl BigCounter {
    /// A zero counter of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len],
        }
    }

    /// A counter holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// An 8 byte counter holding `value`.
    pub fn from_u64(value: u64) -> Self {
        Self::from_bytes(&value.to_be_bytes())
    }

    /// Width in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Big-endian value.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Overwrite the counter with `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly as long as the counter.
    pub fn set_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(self.bytes.len(), bytes.len(), "BigCounter length mismatch");
        self.bytes.copy_from_slice(bytes);
    }

    /// Overwrite the counter with `value`, right aligned.
    pub fn set_u64(&mut self, value: u64) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
        let be = value.to_be_bytes();
        let n = be.len().min(self.bytes.len());
        let dst = self.bytes.len() - n;
        self.bytes[dst..].copy_from_slice(&be[be.len() - n..]);
    }

    /// Add `other`, right aligned, with ripple carry. A carry out of the
    /// most significant byte is discarded.
    ///
    /// # Panics
    ///
    /// Panics if `other` is longer than the counter.
    pub fn add(&mut self, other: &[u8]) {
        assert!(other.len() <= self.bytes.len(), "addend longer than counter");
        let offset = self.bytes.len() - other.len();
        let mut carry = 0u16;
        for i in (0..self.bytes.len()).rev() {
            let addend = if i >= offset {
                other[i - offset] as u16
            } else if carry == 0 {
                break;
            } else {
                0
            };
            let sum = self.bytes[i] as u16 + addend + carry;
            self.bytes[i] = sum as u8;
            carry = sum >> 8;
        }
    }

    /// Increment by one.
    pub fn iterate(&mut self) {
        inc_bytes(&mut self.bytes);
    }

    /// Compare the counter against `limit` without allocating.
    ///
    /// Counters wider than 8 bytes compare greater whenever any of
    /// their high order bytes is set.
    pub fn compare_limit(&self, limit: u64) -> Ordering {
        let split = self.bytes.len().saturating_sub(8);
        if self.bytes[..split].iter().any(|b| *b != 0) {
            return Ordering::Greater;
        }
        let value = self.bytes[split..]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | *b as u64);
        value.cmp(&limit)
    }
}

impl Zeroize for BigCounter {
    fn zeroize(&mut self) {
        self.bytes.as_mut_slice().zeroize();
    }
}

impl Drop for BigCounter {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Increment a slice of bytes by 1 in big-endian order.
pub(crate) fn inc_bytes(block: &mut [u8]) {
    for bit in block.iter_mut().rev() {
        if *bit == 0xff {
            *bit = 0;
        } else {
            *bit += 1;
            break;
        }
    }
}
