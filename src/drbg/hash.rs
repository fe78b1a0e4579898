// SPDX-License-Identifier: MIT

//! Hash_DRBG as defined by SP 800-90A §10.1.1.
use super::{
    check_input, check_request, non_empty, Drbg, DrbgDigest, Generated, ReseedCounter,
    ENTROPY_LEN, MAX_BITS_REQUEST, MAX_RESEED_INTERVAL,
};
use crate::{counter::BigCounter, entropy::Entropy, Error};

use alloc::{format, string::String, vec, vec::Vec};
use core::marker::PhantomData;
use digest::Digest;
use tracing::debug;
use zeroize::Zeroizing;

/// Seed lengths in bytes from SP 800-90A Table 2.
const SHORT_SEED_LEN: usize = 440 / 8;
const LONG_SEED_LEN: usize = 888 / 8;

/// `hash_df` uses a one byte counter starting at 1.
const MAX_DF_ITERATIONS: usize = 255;

/// Hash_DRBG over the digest `D`.
///
/// # Example
///
/// ```
/// use drbg_stream::{drbg::{Drbg, DrbgBuilder, HashDrbg}, entropy::OsEntropy};
/// use sha2::Sha512;
///
/// # fn main() -> Result<(), drbg_stream::Error> {
/// let mut drbg: HashDrbg<Sha512, _> = DrbgBuilder::new(OsEntropy::default()).build_hash()?;
/// let mut random_data = [0u8; 64];
/// let _ = drbg.generate(&mut random_data, None, false)?;
/// drbg.reseed(None)?;
/// # Ok(())
/// # }
/// ```
pub struct HashDrbg<D, E> {
    v: BigCounter,
    c: BigCounter,
    reseed_ctr: ReseedCounter,
    entropy: E,
    digest: PhantomData<fn() -> D>,
}

/// Seed length for `D`: 888 bits when its output exceeds 256 bits,
/// 440 bits otherwise.
fn seed_len<D: Digest>() -> usize {
    if <D as Digest>::output_size() * 8 > 256 {
        LONG_SEED_LEN
    } else {
        SHORT_SEED_LEN
    }
}

fn digest_parts<D: Digest>(parts: &[&[u8]]) -> digest::Output<D> {
    let mut h = D::new();
    for part in parts {
        Digest::update(&mut h, part);
    }
    h.finalize()
}

/// Derive `output_bits` bits from `seed_material` (SP 800-90A §10.3.1).
///
/// The output is the concatenation of `D(counter || output_bits ||
/// seed_material)` for a one byte counter starting at 1, truncated to
/// the requested length.
///
/// # Error
///
/// Returns [`Error::InvalidParameter`] if `output_bits` is not a whole
/// number of bytes or needs more than 255 digest invocations.
pub fn hash_df<D: Digest>(seed_material: &[u8], output_bits: usize) -> Result<Vec<u8>, Error> {
    if output_bits % 8 != 0 {
        return Err(Error::InvalidParameter("hash_df output must be whole bytes"));
    }
    let mut output = vec![0u8; output_bits / 8];
    hash_df_into::<D>(&[seed_material], &mut output)?;
    Ok(output)
}

fn hash_df_into<D: Digest>(input: &[&[u8]], output: &mut [u8]) -> Result<(), Error> {
    let out_len = <D as Digest>::output_size();
    if output.len().div_ceil(out_len) > MAX_DF_ITERATIONS {
        return Err(Error::InvalidParameter("hash_df output too long"));
    }
    let bits = u32::try_from(output.len() * 8)
        .map_err(|_| Error::InvalidParameter("hash_df output too long"))?
        .to_be_bytes();
    let mut counter = 1u8;
    for blk in output.chunks_mut(out_len) {
        let mut h = D::new();
        Digest::update(&mut h, [counter]);
        Digest::update(&mut h, bits);
        for part in input {
            Digest::update(&mut h, part);
        }
        blk.copy_from_slice(&h.finalize()[..blk.len()]);
        counter = counter.wrapping_add(1);
    }
    Ok(())
}

impl<D, E> HashDrbg<D, E>
where
    D: DrbgDigest,
    E: Entropy,
{
    pub(crate) fn new(
        mut entropy: E,
        nonce: &[u8],
        personal: &[u8],
        reseed_itr: u64,
    ) -> Result<Self, Error> {
        let mut seed = Zeroizing::new([0u8; ENTROPY_LEN]);
        entropy.fill_bytes(&mut seed[..])?;

        let len = seed_len::<D>();
        let mut v = BigCounter::new(len);
        hash_df_into::<D>(&[&seed[..], nonce, personal], v.as_mut_bytes())?;
        let mut drbg = Self {
            v,
            c: BigCounter::new(len),
            reseed_ctr: ReseedCounter::new(reseed_itr.min(MAX_RESEED_INTERVAL)),
            entropy,
            digest: PhantomData,
        };
        drbg.derive_c()?;
        Ok(drbg)
    }

    /// C = hash_df(0x00 || V)
    fn derive_c(&mut self) -> Result<(), Error> {
        hash_df_into::<D>(&[&[0x00], self.v.as_bytes()], self.c.as_mut_bytes())
    }

    /// Hashgen: digest successive values of V into `bytes` (SP 800-90A
    /// §10.1.1.4).
    fn hashgen(&self, bytes: &mut [u8]) {
        let mut data = self.v.clone();
        for blk in bytes.chunks_mut(<D as Digest>::output_size()) {
            let d = <D as Digest>::digest(data.as_bytes());
            blk.copy_from_slice(&d[..blk.len()]);
            data.iterate();
        }
    }

    #[cfg(test)]
    pub(crate) fn set_reseed_counter(&mut self, value: u64) {
        self.reseed_ctr.set(value);
    }
}

impl<D, E> Drbg for HashDrbg<D, E>
where
    D: DrbgDigest,
    E: Entropy,
{
    fn block_size(&self) -> usize {
        <D as Digest>::output_size() * 8
    }

    fn generate(
        &mut self,
        bytes: &mut [u8],
        additional: Option<&[u8]>,
        prediction_resistant: bool,
    ) -> Result<Generated, Error> {
        check_request(bytes, MAX_BITS_REQUEST)?;
        check_input(additional, "additional info");
        if self.reseed_ctr.is_exhausted() {
            return Ok(Generated::ReseedRequired);
        }

        let mut additional = non_empty(additional);
        if prediction_resistant {
            self.reseed(additional)?;
            additional = None;
        }
        if let Some(add_bytes) = additional {
            let w = digest_parts::<D>(&[&[0x02], self.v.as_bytes(), add_bytes]);
            self.v.add(&w);
        }

        self.hashgen(bytes);

        let h = digest_parts::<D>(&[&[0x03], self.v.as_bytes()]);
        self.v.add(&h);
        self.v.add(self.c.as_bytes());
        self.v.add(self.reseed_ctr.as_bytes());
        self.reseed_ctr.advance();
        Ok(Generated::Bits(bytes.len() * 8))
    }

    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        check_input(additional, "additional info");
        let add_bytes = additional.unwrap_or(&[]);
        let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
        self.entropy.fill_bytes(&mut entropy[..])?;

        let mut v = BigCounter::new(self.v.len());
        hash_df_into::<D>(
            &[&[0x01], self.v.as_bytes(), &entropy[..], add_bytes],
            v.as_mut_bytes(),
        )?;
        self.v = v;
        self.derive_c()?;
        self.reseed_ctr.reset();
        debug!(digest = D::NAME, "reseeded Hash_DRBG");
        Ok(())
    }

    fn entropy_mut(&mut self) -> &mut dyn Entropy {
        &mut self.entropy
    }

    fn algorithm_name(&self) -> String {
        format!("Hash_DRBG/{}", D::NAME)
    }
}
