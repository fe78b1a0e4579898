// SPDX-License-Identifier: MIT

//! Traits and types for defining entropy sources.
use crate::Error;

/// Represents a source of cryptograplicly secure random data. It's
/// primary use-case is to seed random number generators.
pub trait Entropy {
    /// Fill `bytes` with random data from the entropy source.
    ///
    /// # Error
    ///
    /// Returns an error if there is a problem with the underlying
    /// entropy source.
    fn fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Error>;

    /// Mix caller supplied seed material into the source.
    ///
    /// Seed material only ever supplements the source, it never
    /// replaces it. Sources that cannot absorb input, such as the
    /// operating system, ignore it.
    fn add_seed(&mut self, _seed: &[u8]) {}
}

impl<E: Entropy + ?Sized> Entropy for &mut E {
    fn fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Error> {
        (**self).fill_bytes(bytes)
    }

    fn add_seed(&mut self, seed: &[u8]) {
        (**self).add_seed(seed)
    }
}

/// An entropy source that draws random data from the host operating
/// system.
///
/// ```
/// use drbg_stream::entropy::{OsEntropy, Entropy};
///
/// # use drbg_stream::Error;
/// #
/// # fn main() -> Result<(), Error> {
/// #
/// let mut entropy = OsEntropy::default();
/// let mut random_data = [0u8; 32];
/// entropy.fill_bytes(&mut random_data)?;
/// #
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy {}

impl OsEntropy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Entropy for OsEntropy {
    /// Fill `bytes` with random data from the operating system using
    /// [`getrandom`](getrandom::getrandom).
    ///
    /// # Error
    ///
    /// Returns any error from `getrandom`.
    fn fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Error> {
        getrandom::getrandom(bytes).map_err(Error::entropy)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted entropy sources shared by the unit tests.
    use super::Entropy;
    use crate::Error;
    use alloc::vec::Vec;

    /// Replays a fixed list of entropy strings, one per request.
    #[derive(Default)]
    pub struct MockEntropy {
        pub bytes: Vec<Vec<u8>>,
        pub pos: usize,
    }

    impl MockEntropy {
        pub fn new(chunks: &[&[u8]]) -> Self {
            Self {
                bytes: chunks.iter().map(|c| c.to_vec()).collect(),
                pos: 0,
            }
        }
    }

    impl Entropy for MockEntropy {
        fn fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Error> {
            let entropy = &self.bytes[self.pos];
            bytes.copy_from_slice(entropy);
            self.pos += 1;
            Ok(())
        }
    }

    /// Deterministic, never exhausted source: each request is filled
    /// from a running byte counter seeded with `start`.
    #[derive(Clone)]
    pub struct CountingEntropy {
        pub next: u8,
        pub seeded: Vec<u8>,
    }

    impl CountingEntropy {
        pub fn new(start: u8) -> Self {
            Self {
                next: start,
                seeded: Vec::new(),
            }
        }
    }

    impl Entropy for CountingEntropy {
        fn fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Error> {
            for b in bytes.iter_mut() {
                *b = self.next;
                self.next = self.next.wrapping_add(1);
            }
            Ok(())
        }

        fn add_seed(&mut self, seed: &[u8]) {
            self.seeded.extend_from_slice(seed);
        }
    }

    /// Behaves like [`CountingEntropy`] for `draws` requests, then fails.
    pub struct FailingEntropy {
        pub inner: CountingEntropy,
        pub draws: usize,
    }

    impl FailingEntropy {
        pub fn new(start: u8, draws: usize) -> Self {
            Self {
                inner: CountingEntropy::new(start),
                draws,
            }
        }
    }

    impl Entropy for FailingEntropy {
        fn fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Error> {
            if self.draws == 0 {
                return Err(Error::entropy("source exhausted"));
            }
            self.draws -= 1;
            self.inner.fill_bytes(bytes)
        }

        fn add_seed(&mut self, seed: &[u8]) {
            self.inner.add_seed(seed)
        }
    }

    /// Always fails.
    pub struct BrokenEntropy;

    impl Entropy for BrokenEntropy {
        fn fill_bytes(&mut self, _bytes: &mut [u8]) -> Result<(), Error> {
            Err(Error::entropy("source offline"))
        }
    }
}
