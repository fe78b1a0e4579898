// SPDX-License-Identifier: MIT

//! Stream ciphers built from keyed extendable-output functions.
//!
//! An [`XofStream`] absorbs a key and nonce into a [`KeyedXof`] and XORs
//! the squeezed output with the data passed to
//! [`process`](XofStream::process). Encryption and decryption are the
//! same operation.
//!
//! # Example
//!
//! ```
//! use drbg_stream::xof::{Shake256Xof, XofStream};
//!
//! # fn main() -> Result<(), drbg_stream::Error> {
//! let key = [7u8; 32];
//! let nonce = [1u8; 12];
//!
//! let mut enc = XofStream::<Shake256Xof>::new();
//! enc.init(&key, Some(&nonce))?;
//! let mut data = *b"attack at dawn";
//! enc.apply_keystream(&mut data)?;
//!
//! let mut dec = XofStream::<Shake256Xof>::new();
//! dec.init(&key, Some(&nonce))?;
//! dec.apply_keystream(&mut data)?;
//! assert_eq!(b"attack at dawn", &data);
//! # Ok(())
//! # }
//! ```
use crate::Error;

use alloc::{vec, vec::Vec};
use core::iter::zip;
use tracing::trace;
use zeroize::Zeroize;

mod primitives;

pub use self::primitives::{Blake3Xof, CShake256Xof, KeyedXof, Shake128Xof, Shake256Xof};

/// Keyed XOF used as a stream cipher.
///
/// The stream remembers the state right after key and nonce absorption,
/// so [`reset`](Self::reset) restarts the keystream from the beginning.
/// Cloning produces an independent copy positioned at the same offset.
pub struct XofStream<X: KeyedXof> {
    reader: Option<X::Reader>,
    checkpoint: Option<X::Reader>,
    keystream: Vec<u8>,
    pos: usize,
}

/// Saved position of an [`XofStream`]. Restoring it rewinds (or
/// advances) the stream to the moment the snapshot was taken.
pub struct XofSnapshot<X: KeyedXof> {
    reader: Option<X::Reader>,
    checkpoint: Option<X::Reader>,
    keystream: Vec<u8>,
    pos: usize,
}

impl<X: KeyedXof> Drop for XofSnapshot<X> {
    fn drop(&mut self) {
        self.keystream.zeroize();
    }
}

impl<X: KeyedXof> Clone for XofSnapshot<X> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            checkpoint: self.checkpoint.clone(),
            keystream: self.keystream.clone(),
            pos: self.pos,
        }
    }
}

impl<X: KeyedXof> Drop for XofStream<X> {
    fn drop(&mut self) {
        self.keystream.zeroize();
    }
}

impl<X: KeyedXof> Clone for XofStream<X> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            checkpoint: self.checkpoint.clone(),
            keystream: self.keystream.clone(),
            pos: self.pos,
        }
    }
}

impl<X: KeyedXof> Default for XofStream<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: KeyedXof> XofStream<X> {
    /// An uninitialized stream. Call [`init`](Self::init) before
    /// processing data.
    pub fn new() -> Self {
        Self {
            reader: None,
            checkpoint: None,
            keystream: vec![0u8; X::BLOCK_LEN],
            pos: X::BLOCK_LEN,
        }
    }

    /// Key the stream.
    ///
    /// # Error
    ///
    /// Returns [`Error::InvalidParameter`] for an empty key, a missing
    /// nonce when the primitive requires one, or a key the primitive
    /// rejects.
    pub fn init(&mut self, key: &[u8], nonce: Option<&[u8]>) -> Result<(), Error> {
        if key.is_empty() {
            return Err(Error::InvalidParameter("XOF key is empty"));
        }
        if X::REQUIRES_NONCE && nonce.is_none() {
            return Err(Error::InvalidParameter("XOF requires a nonce"));
        }
        let reader = X::absorb(key, nonce)?;
        self.checkpoint = Some(reader.clone());
        self.reader = Some(reader);
        self.prime();
        trace!(xof = X::NAME, "keyed stream");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.reader.is_some()
    }

    pub fn algorithm_name(&self) -> &'static str {
        X::NAME
    }

    /// XOR `input` with the keystream into `output`. Only the first
    /// `input.len()` bytes of `output` are written.
    ///
    /// # Error
    ///
    /// Returns [`Error::NotInitialized`] before [`init`](Self::init)
    /// and [`Error::OutputTooShort`] when `output` is shorter than
    /// `input`.
    pub fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), Error> {
        if output.len() < input.len() {
            return Err(Error::OutputTooShort);
        }
        let output = &mut output[..input.len()];
        output.copy_from_slice(input);
        self.apply_keystream(output)
    }

    /// XOR `data` with the keystream in place.
    pub fn apply_keystream(&mut self, data: &mut [u8]) -> Result<(), Error> {
        let reader = self
            .reader
            .as_mut()
            .ok_or(Error::NotInitialized("XOF stream"))?;
        let mut done = 0;
        while done < data.len() {
            if self.pos == self.keystream.len() {
                X::squeeze(reader, &mut self.keystream);
                self.pos = 0;
            }
            let n = (self.keystream.len() - self.pos).min(data.len() - done);
            let ks = &self.keystream[self.pos..self.pos + n];
            for (d, k) in zip(&mut data[done..done + n], ks) {
                *d ^= k;
            }
            self.pos += n;
            done += n;
        }
        Ok(())
    }

    /// Restart the keystream from the state captured by
    /// [`init`](Self::init).
    pub fn reset(&mut self) -> Result<(), Error> {
        let checkpoint = self
            .checkpoint
            .as_ref()
            .ok_or(Error::NotInitialized("XOF stream"))?;
        self.reader = Some(checkpoint.clone());
        self.prime();
        trace!(xof = X::NAME, "reset stream");
        Ok(())
    }

    /// Capture the current position, including the reset checkpoint.
    pub fn snapshot(&self) -> XofSnapshot<X> {
        XofSnapshot {
            reader: self.reader.clone(),
            checkpoint: self.checkpoint.clone(),
            keystream: self.keystream.clone(),
            pos: self.pos,
        }
    }

    /// Return to the position captured by `snapshot`.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot's keystream buffer does not match this
    /// stream's.
    pub fn restore(&mut self, snapshot: &XofSnapshot<X>) {
        assert_eq!(
            self.keystream.len(),
            snapshot.keystream.len(),
            "XofSnapshot length mismatch"
        );
        self.reader = snapshot.reader.clone();
        self.checkpoint = snapshot.checkpoint.clone();
        self.keystream.copy_from_slice(&snapshot.keystream);
        self.pos = snapshot.pos;
    }

    /// Copy the complete state of `other` into this stream.
    pub fn restore_from(&mut self, other: &Self) {
        assert_eq!(
            self.keystream.len(),
            other.keystream.len(),
            "XofStream length mismatch"
        );
        self.reader = other.reader.clone();
        self.checkpoint = other.checkpoint.clone();
        self.keystream.copy_from_slice(&other.keystream);
        self.pos = other.pos;
    }

    /// Squeeze the first keystream block.
    fn prime(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            X::squeeze(reader, &mut self.keystream);
        }
        self.pos = 0;
    }
}
