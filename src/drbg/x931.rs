// SPDX-License-Identifier: MIT

//! ANSI X9.31 random number generator with AES-256.
use super::{check_input, check_request, Drbg, Generated, ReseedCounter, MAX_BITS_REQUEST};
use crate::{counter::BigCounter, entropy::Entropy, Error};

use aes::{
    cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit, KeySizeUser},
    Aes256Enc, Block,
};
use alloc::string::String;
use core::iter::zip;
use tracing::debug;
use zeroize::Zeroize;

type Key = GenericArray<u8, <Aes256Enc as KeySizeUser>::KeySize>;

const BLK_LEN: usize = 16;

/// Reseed bound of the X9.31 generator, in generate calls.
const X931_RESEED_INTERVAL: u64 = 1 << 23;

/// ANSI X9.31 (Appendix A.2.4) generator keyed with AES-256.
///
/// The key and seed vector `V` come from the entropy source. The
/// date/time vector `DT` is the last 16 bytes of the nonce and is
/// incremented after every block. Personalization is not supported.
pub struct X931Drbg<E> {
    key: Key,
    v_blk: Block,
    dt: BigCounter,
    reseed_ctr: ReseedCounter,
    entropy: E,
}

impl<E> Drop for X931Drbg<E> {
    fn drop(&mut self) {
        self.key.iter_mut().for_each(|v| *v = 0);
        self.v_blk.iter_mut().for_each(|v| *v = 0);
    }
}

impl<E> X931Drbg<E>
where
    E: Entropy,
{
    pub(crate) fn new(
        mut entropy: E,
        nonce: &[u8],
        personal: &[u8],
        reseed_itr: u64,
    ) -> Result<Self, Error> {
        if !personal.is_empty() {
            return Err(Error::InvalidParameter(
                "X9.31 does not support personalization",
            ));
        }
        if nonce.len() < BLK_LEN {
            return Err(Error::InvalidParameter("X9.31 nonce shorter than a block"));
        }
        let mut key = Key::default();
        entropy.fill_bytes(&mut key)?;
        let mut v_blk = Block::default();
        entropy.fill_bytes(&mut v_blk)?;

        Ok(Self {
            key,
            v_blk,
            dt: BigCounter::from_bytes(&nonce[nonce.len() - BLK_LEN..]),
            reseed_ctr: ReseedCounter::new(reseed_itr.min(X931_RESEED_INTERVAL)),
            entropy,
        })
    }

    #[cfg(test)]
    pub(crate) fn set_reseed_counter(&mut self, value: u64) {
        self.reseed_ctr.set(value);
    }
}

impl<E> Drbg for X931Drbg<E>
where
    E: Entropy,
{
    fn block_size(&self) -> usize {
        BLK_LEN * 8
    }

    /// Additional input only matters for a prediction resistant
    /// request, where it is forwarded to [`reseed`](Drbg::reseed).
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
        if prediction_resistant {
            self.reseed(additional)?;
        }

        let cipher = Aes256Enc::new(&self.key);
        let mut i_blk = Block::default();
        let mut r_blk = Block::default();
        for blk in bytes.chunks_mut(BLK_LEN) {
            // I = E(DT)
            i_blk.copy_from_slice(self.dt.as_bytes());
            cipher.encrypt_block(&mut i_blk);
            // R = E(I ^ V)
            for (r, (i, v)) in zip(r_blk.iter_mut(), zip(i_blk.iter(), self.v_blk.iter())) {
                *r = i ^ v;
            }
            cipher.encrypt_block(&mut r_blk);
            // V = E(R ^ I)
            for (v, (r, i)) in zip(self.v_blk.iter_mut(), zip(r_blk.iter(), i_blk.iter())) {
                *v = r ^ i;
            }
            cipher.encrypt_block(&mut self.v_blk);
            self.dt.iterate();
            blk.copy_from_slice(&r_blk[..blk.len()]);
        }
        i_blk.as_mut_slice().zeroize();
        r_blk.as_mut_slice().zeroize();
        self.reseed_ctr.advance();
        Ok(Generated::Bits(bytes.len() * 8))
    }

    /// Mix 16 fresh bytes of entropy into `V`. `additional` is ignored.
    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        check_input(additional, "additional info");
        let mut fresh = Block::default();
        self.entropy.fill_bytes(&mut fresh)?;
        for (v, f) in zip(self.v_blk.iter_mut(), fresh.iter()) {
            *v ^= f;
        }
        fresh.as_mut_slice().zeroize();
        self.reseed_ctr.reset();
        debug!("reseeded X9.31 generator");
        Ok(())
    }

    fn entropy_mut(&mut self) -> &mut dyn Entropy {
        &mut self.entropy
    }

    fn algorithm_name(&self) -> String {
        String::from("X9.31/AES-256")
    }
}

#[cfg(test)]
mod tests {
    use super::X931_RESEED_INTERVAL;
    use crate::{
        drbg::{Drbg, DrbgBuilder, Generated},
        entropy::testing::{CountingEntropy, MockEntropy},
        Error,
    };
    use alloc::vec::Vec;

    #[test]
    fn x931_known_answer() -> Result<(), Error> {
        let key: Vec<u8> = (0..32).collect();
        let v: Vec<u8> = (96..112).collect();
        let dt: Vec<u8> = (32..48).collect();
        let mut drbg = DrbgBuilder::new(MockEntropy::new(&[&key[..], &v[..]]))
            .nonce(&dt)
            .build_x931()?;

        let mut bytes = [0u8; 48];
        assert_eq!(Generated::Bits(384), drbg.generate(&mut bytes, None, false)?);
        let expected = hex::decode(
            "16e4c1b18eb635030cbdd0f81cf661408f07c39a83a6a3a2a868dc585a9f5abb\
             e5cc2e3f40de96c2bbf00691879a5869",
        )
        .unwrap();
        assert_eq!(expected, bytes);
        Ok(())
    }

    #[test]
    fn x931_ignores_additional_input() -> Result<(), Error> {
        let build = || {
            DrbgBuilder::new(CountingEntropy::new(3))
                .nonce(&[0u8; 16])
                .build_x931()
        };
        let (mut a, mut b) = (build()?, build()?);
        let mut x = [0u8; 40];
        let mut y = [0u8; 40];
        let _ = a.generate(&mut x, Some(b"ignored"), false)?;
        let _ = b.generate(&mut y, None, false)?;
        assert_eq!(x, y);
        Ok(())
    }

    #[test]
    fn x931_rejects_personalization() {
        let result = DrbgBuilder::new(CountingEntropy::new(0))
            .personal(b"not supported")
            .build_x931();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn x931_reseed_interval_capped() -> Result<(), Error> {
        let mut drbg = DrbgBuilder::new(CountingEntropy::new(0)).build_x931()?;
        let mut bytes = [0u8; 16];
        drbg.set_reseed_counter(X931_RESEED_INTERVAL - 1);
        assert_eq!(Generated::Bits(128), drbg.generate(&mut bytes, None, false)?);
        assert_eq!(Generated::ReseedRequired, drbg.generate(&mut bytes, None, false)?);
        drbg.reseed(None)?;
        assert_eq!(Generated::Bits(128), drbg.generate(&mut bytes, None, false)?);
        Ok(())
    }

    #[test]
    fn x931_reseed_changes_stream() -> Result<(), Error> {
        let build = || {
            DrbgBuilder::new(CountingEntropy::new(0))
                .nonce(&[1u8; 16])
                .build_x931()
        };
        let (mut a, mut b) = (build()?, build()?);
        a.reseed(None)?;
        let mut x = [0u8; 16];
        let mut y = [0u8; 16];
        let _ = a.generate(&mut x, None, false)?;
        let _ = b.generate(&mut y, None, false)?;
        assert_ne!(x, y);
        Ok(())
    }
}
