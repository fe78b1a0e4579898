// SPDX-License-Identifier: MIT

//! A random source that XORs two independently seeded generators.
use crate::{
    drbg::{CtrDrbg, Drbg, DrbgBuilder, HashDrbg},
    entropy::Entropy,
    random::{BufferedRandom, Random},
    Error,
};

use alloc::{format, string::String, vec::Vec};
use core::iter::zip;
use sha2::Sha512;
use tracing::debug;
use zeroize::Zeroize;

#[cfg(feature = "rand_core")]
use rand_core::{TryCryptoRng, TryRngCore};

const STAGING_LEN: usize = 64;

/// XOR of a counter-mode source and a hash source.
///
/// The output stays unpredictable as long as either child is sound.
/// Output is drawn from the counter-mode source and the hash stream is
/// mixed in through a 64 byte staging buffer.
///
/// # Example
///
/// ```
/// use drbg_stream::{combined::CombinedRandom, entropy::OsEntropy, random::Random};
///
/// # fn main() -> Result<(), drbg_stream::Error> {
/// let mut rng = CombinedRandom::from_entropy(OsEntropy::default(), OsEntropy::default())?;
/// let mut key = [0u8; 32];
/// rng.fill(&mut key)?;
/// assert_eq!("CTR_DRBG/AES-256+Hash_DRBG/SHA-512", rng.algorithm_name());
/// # Ok(())
/// # }
/// ```
pub struct CombinedRandom<C, H> {
    ctr: BufferedRandom<C>,
    hash: BufferedRandom<H>,
    staging: [u8; STAGING_LEN],
    available: usize,
}

impl<C, H> Drop for CombinedRandom<C, H> {
    fn drop(&mut self) {
        self.staging.zeroize();
    }
}

impl<E1, E2> CombinedRandom<CtrDrbg<E1>, HashDrbg<Sha512, E2>>
where
    E1: Entropy,
    E2: Entropy,
{
    /// A CTR_DRBG (AES-256) source combined with a Hash_DRBG (SHA-512)
    /// source, each seeded from its own entropy source.
    pub fn from_entropy(ctr_entropy: E1, hash_entropy: E2) -> Result<Self, Error> {
        let ctr = DrbgBuilder::new(ctr_entropy).build_ctr()?;
        let hash = DrbgBuilder::new(hash_entropy).build_hash::<Sha512>()?;
        Ok(Self::new(
            BufferedRandom::new(ctr, false),
            BufferedRandom::new(hash, false),
        ))
    }
}

impl<C: Drbg, H: Drbg> CombinedRandom<C, H> {
    pub fn new(ctr: BufferedRandom<C>, hash: BufferedRandom<H>) -> Self {
        Self {
            ctr,
            hash,
            staging: [0u8; STAGING_LEN],
            available: 0,
        }
    }

    pub fn next_u32(&mut self) -> Result<u32, Error> {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn next_u64(&mut self) -> Result<u64, Error> {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn drop_staged(&mut self) {
        self.staging.zeroize();
        self.available = 0;
    }
}

impl<C: Drbg, H: Drbg> Random for CombinedRandom<C, H> {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.ctr.fill(dest)?;
        let mut pos = 0;
        while pos < dest.len() {
            if self.available == 0 {
                self.hash.fill(&mut self.staging)?;
                self.available = STAGING_LEN;
            }
            let start = STAGING_LEN - self.available;
            let n = self.available.min(dest.len() - pos);
            for (d, s) in zip(&mut dest[pos..pos + n], &self.staging[start..start + n]) {
                *d ^= s;
            }
            self.available -= n;
            pos += n;
        }
        Ok(())
    }

    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        self.drop_staged();
        self.ctr.reseed(additional)?;
        self.hash.reseed(additional)?;
        Ok(())
    }

    fn set_seed(&mut self, seed: &[u8]) -> Result<(), Error> {
        self.drop_staged();
        self.ctr.set_seed(seed)?;
        self.hash.set_seed(seed)?;
        debug!("mixed caller seed into both sources");
        Ok(())
    }

    fn generate_seed(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut seed = self.ctr.generate_seed(len)?;
        let mut other = self.hash.generate_seed(len)?;
        for (s, o) in zip(seed.iter_mut(), other.iter()) {
            *s ^= o;
        }
        other.zeroize();
        Ok(seed)
    }

    fn algorithm_name(&self) -> String {
        format!("{}+{}", self.ctr.algorithm_name(), self.hash.algorithm_name())
    }
}

#[cfg(feature = "rand_core")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand_core")))]
impl<C: Drbg, H: Drbg> TryCryptoRng for CombinedRandom<C, H> where CombinedRandom<C, H>: TryRngCore {}

#[cfg(feature = "rand_core")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand_core")))]
impl<C: Drbg, H: Drbg> TryRngCore for CombinedRandom<C, H> {
    type Error = Error;

    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        self.next_u32()
    }

    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        self.next_u64()
    }

    fn try_fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.fill(bytes)
    }
}
