// SPDX-License-Identifier: MIT

//! CTR_DRBG as defined by SP 800-90A §10.2, using AES-256 and the block
//! cipher derivation function.
use super::{
    check_input, check_request, non_empty, Drbg, Generated, ReseedCounter, ENTROPY_LEN,
    MAX_BITS_REQUEST, MAX_RESEED_INTERVAL,
};
use crate::{counter::inc_bytes, entropy::Entropy, Error};

use aes::{
    cipher::{
        generic_array::GenericArray, typenum::consts::U48, BlockEncrypt, KeyInit, KeySizeUser,
    },
    Aes256Enc, Block,
};
use alloc::{string::String, vec::Vec};
use core::iter::zip;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

type SeedData = GenericArray<u8, U48>;
type Key = GenericArray<u8, <Aes256Enc as KeySizeUser>::KeySize>;

//
// derivation function consts
//
const DF_BLK_LEN: usize = 16;
const DF_KEY_LEN: usize = 32;
const DF_BUF_LEN: usize = DF_BLK_LEN + DF_KEY_LEN;

/// Implementation of CTR_DRBG using AES-256 and the derivation
/// function outlined by [SP 800-90A
/// Rev. 1](https://csrc.nist.gov/publications/detail/sp/800-90a/rev-1/final). Instantiation
/// of this type is performed using [`DrbgBuilder`](super::DrbgBuilder).
///
/// # Example
///
/// ```
/// use drbg_stream::{drbg::{Drbg, DrbgBuilder}, entropy::OsEntropy};
///
/// # use drbg_stream::Error;
/// #
/// # fn main() -> Result<(), Error> {
/// #
/// // Build a new instance
/// let mut drbg = DrbgBuilder::new(OsEntropy::default()).build_ctr()?;
///
/// // Generate random data
/// let mut random_data = [0u8; 32];
/// let _ = drbg.generate(&mut random_data, None, false)?;
///
/// // Reseed the instance
/// drbg.reseed(None)?;
/// #
/// # Ok(())
/// # }
/// ```
pub struct CtrDrbg<E> {
    v_blk: Block,
    tmp_blk: Block,
    key: Key,
    tmp_buf: SeedData,
    reseed_ctr: ReseedCounter,
    entropy: E,
}

/// Cipher derivation function.
fn cipher_df(input: &[u8]) -> SeedData {
    let mut output = SeedData::default();
    let l: u32 = input.len() as u32;
    let n: u32 = output.len() as u32;
    // Build the S buffer which is a concatenation of the IV and input
    // values. Make sure the length is DF_BLK_LEN aligned.
    let len = ((DF_BLK_LEN + 8 + input.len() + 1) / DF_BLK_LEN) * DF_BLK_LEN;
    let mut s = Zeroizing::new(Vec::with_capacity(len));
    // padding for the IV
    s.resize(DF_BLK_LEN, 0);
    s.extend_from_slice(&l.to_be_bytes());
    s.extend_from_slice(&n.to_be_bytes());
    s.extend_from_slice(input);
    s.push(0x80);
    // pad to block len
    while s.len() % DF_BLK_LEN != 0 {
        s.push(0);
    }
    let k = b"\x00\x01\x02\x03\x04\x05\x06\x07\x08\x09\x0a\x0b\x0c\x0d\x0e\x0f\
              \x10\x11\x12\x13\x14\x15\x16\x17\x18\x19\x1a\x1b\x1c\x1d\x1e\x1f";
    let key = Key::from_slice(k);
    //
    // Build the initial buffer that contains the derived K and X
    // values.
    //
    let cipher = Aes256Enc::new(key);
    let mut tmp_buf = [0u8; DF_BUF_LEN];
    for blk in tmp_buf.chunks_mut(DF_BLK_LEN) {
        cipher_bcc(&cipher, &s, Block::from_mut_slice(blk));
        // increment the IV
        inc_bytes(&mut s[0..4]);
    }
    // K
    let key = Key::from_slice(&tmp_buf[0..DF_KEY_LEN]);
    // X
    let cipher = Aes256Enc::new(key);
    let x_blk = Block::from_mut_slice(&mut tmp_buf[DF_KEY_LEN..DF_BUF_LEN]);
    for blk in output.chunks_mut(DF_BLK_LEN) {
        cipher.encrypt_block(x_blk);
        blk.copy_from_slice(&x_blk[0..blk.len()]);
    }
    tmp_buf.zeroize();
    output
}

/// Block chaining function used by derivation function.
fn cipher_bcc(cipher: &Aes256Enc, input: &[u8], output: &mut Block) {
    debug_assert_eq!(input.len() % DF_BLK_LEN, 0);
    let mut tmp_blk = Block::default();
    for blk in input.chunks(DF_BLK_LEN) {
        for i in 0..DF_BLK_LEN {
            tmp_blk[i] = output[i] ^ blk[i];
        }
        output.copy_from_slice(&tmp_blk);
        cipher.encrypt_block(output);
    }
}

impl<E> Drop for CtrDrbg<E> {
    fn drop(&mut self) {
        self.v_blk.iter_mut().for_each(|v| *v = 0);
        self.tmp_blk.iter_mut().for_each(|v| *v = 0);
        self.key.iter_mut().for_each(|v| *v = 0);
        self.tmp_buf.iter_mut().for_each(|v| *v = 0);
    }
}

impl<E> CtrDrbg<E>
where
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

        let mut seed_input = Zeroizing::new(Vec::with_capacity(
            seed.len() + nonce.len() + personal.len(),
        ));
        seed_input.extend_from_slice(&seed[..]);
        seed_input.extend_from_slice(nonce);
        seed_input.extend_from_slice(personal);
        let seed = cipher_df(&seed_input);

        let mut c = Self {
            v_blk: Block::default(),
            key: Key::default(),
            reseed_ctr: ReseedCounter::new(reseed_itr.min(MAX_RESEED_INTERVAL)),
            tmp_buf: SeedData::default(),
            tmp_blk: Block::default(),
            entropy,
        };
        c.update(&seed);
        Ok(c)
    }

    fn update(&mut self, data: &SeedData) {
        self.update_with_cipher(&Aes256Enc::new(&self.key), data);
    }

    fn update_with_cipher(&mut self, cipher: &Aes256Enc, data: &SeedData) {
        let block_len = self.v_blk.len();
        for (data_blk, tmp_blk) in zip(data.chunks(block_len), self.tmp_buf.chunks_mut(block_len)) {
            inc_bytes(&mut self.v_blk);
            tmp_blk.copy_from_slice(&self.v_blk);
            cipher.encrypt_block(GenericArray::from_mut_slice(tmp_blk));
            for (i, j) in zip(tmp_blk, data_blk) {
                *i ^= *j
            }
        }
        let keylen = self.key.len();
        self.key.copy_from_slice(&self.tmp_buf[0..keylen]);
        self.v_blk.copy_from_slice(&self.tmp_buf[keylen..]);
    }

    #[cfg(test)]
    pub(crate) fn set_reseed_counter(&mut self, value: u64) {
        self.reseed_ctr.set(value);
    }
}

impl<E> Drbg for CtrDrbg<E>
where
    E: Entropy,
{
    fn block_size(&self) -> usize {
        self.v_blk.len() * 8
    }

    /// Fill `bytes` with output. Optional `additional` data is passed
    /// through the derivation function and mixed into the state.
    ///
    /// # Panics
    ///
    /// If `additional` exceeds the max input length of 2^32, this
    /// function panics.
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

        let mut add_bytes = non_empty(additional);
        if prediction_resistant {
            self.reseed(add_bytes)?;
            add_bytes = None;
        }
        let seed = match add_bytes {
            None => SeedData::default(),
            Some(add_bytes) => {
                let seed = cipher_df(add_bytes);
                self.update(&seed);
                seed
            }
        };
        let cipher = Aes256Enc::new(&self.key);
        for blk in bytes.chunks_mut(self.tmp_blk.len()) {
            inc_bytes(&mut self.v_blk);
            self.tmp_blk.copy_from_slice(&self.v_blk);
            cipher.encrypt_block(&mut self.tmp_blk);
            blk.copy_from_slice(&self.tmp_blk[0..blk.len()]);
        }
        self.update_with_cipher(&cipher, &seed);
        self.reseed_ctr.advance();
        Ok(Generated::Bits(bytes.len() * 8))
    }

    /// Reseed with 32 bytes of new entropy. Optional `additional`
    /// data may be provide, which is passed to the underlying
    /// derivation function as input.
    ///
    /// # Panics
    ///
    /// If `additional` exceeds the max input length of 2^32, this
    /// function panics.
    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        check_input(additional, "additional info");

        let add_bytes = additional.unwrap_or(&[]);
        let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
        self.entropy.fill_bytes(&mut entropy[..])?;
        let mut seed_input = Zeroizing::new(Vec::with_capacity(entropy.len() + add_bytes.len()));
        seed_input.extend_from_slice(&entropy[..]);
        seed_input.extend_from_slice(add_bytes);
        let seed = cipher_df(&seed_input);

        self.update(&seed);
        self.reseed_ctr.reset();
        debug!("reseeded CTR_DRBG");
        Ok(())
    }

    fn entropy_mut(&mut self) -> &mut dyn Entropy {
        &mut self.entropy
    }

    fn algorithm_name(&self) -> String {
        String::from("CTR_DRBG/AES-256")
    }
}
