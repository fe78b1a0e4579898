// SPDX-License-Identifier: MIT

//! Keyed extendable-output functions usable by [`XofStream`](super::XofStream).
use crate::Error;

use digest::{core_api::CoreWrapper, ExtendableOutput, Update, XofReader};
use sha3::{CShake256Core, CShake256Reader, Shake128, Shake128Reader, Shake256, Shake256Reader};

/// An extendable-output function that absorbs a key and an optional
/// nonce and then squeezes keystream.
pub trait KeyedXof {
    /// Human readable name, for diagnostics only.
    const NAME: &'static str;

    /// Native block length in bytes. Keystream is squeezed this many
    /// bytes at a time.
    const BLOCK_LEN: usize;

    /// Whether [`absorb`](Self::absorb) rejects a missing nonce.
    const REQUIRES_NONCE: bool;

    /// Squeezing state. Cloning it must produce an independent copy.
    type Reader: Clone;

    /// Absorb `key` and `nonce` and switch to squeezing.
    fn absorb(key: &[u8], nonce: Option<&[u8]>) -> Result<Self::Reader, Error>;

    /// Fill `out` with the next keystream bytes.
    fn squeeze(reader: &mut Self::Reader, out: &mut [u8]);
}

/// `u32_be(len(data)) || data`
fn absorb_framed(hasher: &mut impl Update, data: &[u8]) -> Result<(), Error> {
    let len = u32::try_from(data.len()).map_err(|_| Error::InvalidParameter("XOF input length"))?;
    hasher.update(&len.to_be_bytes());
    hasher.update(data);
    Ok(())
}

/// SHAKE128 over `u32_be(len(key)) || key || u32_be(len(nonce)) || nonce`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shake128Xof;

impl KeyedXof for Shake128Xof {
    const NAME: &'static str = "SHAKE128";
    const BLOCK_LEN: usize = 168;
    const REQUIRES_NONCE: bool = false;
    type Reader = Shake128Reader;

    fn absorb(key: &[u8], nonce: Option<&[u8]>) -> Result<Self::Reader, Error> {
        let mut hasher = Shake128::default();
        absorb_framed(&mut hasher, key)?;
        absorb_framed(&mut hasher, nonce.unwrap_or(&[]))?;
        Ok(hasher.finalize_xof())
    }

    fn squeeze(reader: &mut Self::Reader, out: &mut [u8]) {
        reader.read(out);
    }
}

/// SHAKE256 with the same framing as [`Shake128Xof`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Shake256Xof;

impl KeyedXof for Shake256Xof {
    const NAME: &'static str = "SHAKE256";
    const BLOCK_LEN: usize = 136;
    const REQUIRES_NONCE: bool = false;
    type Reader = Shake256Reader;

    fn absorb(key: &[u8], nonce: Option<&[u8]>) -> Result<Self::Reader, Error> {
        let mut hasher = Shake256::default();
        absorb_framed(&mut hasher, key)?;
        absorb_framed(&mut hasher, nonce.unwrap_or(&[]))?;
        Ok(hasher.finalize_xof())
    }

    fn squeeze(reader: &mut Self::Reader, out: &mut [u8]) {
        reader.read(out);
    }
}

/// cSHAKE256 with the nonce as customization string and an empty
/// function name. Only the framed key is absorbed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CShake256Xof;

impl KeyedXof for CShake256Xof {
    const NAME: &'static str = "cSHAKE256";
    const BLOCK_LEN: usize = 136;
    const REQUIRES_NONCE: bool = true;
    type Reader = CShake256Reader;

    fn absorb(key: &[u8], nonce: Option<&[u8]>) -> Result<Self::Reader, Error> {
        let nonce = nonce.ok_or(Error::InvalidParameter("cSHAKE256 requires a nonce"))?;
        let mut hasher = CoreWrapper::from_core(CShake256Core::new(nonce));
        absorb_framed(&mut hasher, key)?;
        Ok(hasher.finalize_xof())
    }

    fn squeeze(reader: &mut Self::Reader, out: &mut [u8]) {
        reader.read(out);
    }
}

/// BLAKE3 in keyed mode. The key must be exactly 32 bytes; the nonce,
/// if any, is the hashed input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Xof;

impl KeyedXof for Blake3Xof {
    const NAME: &'static str = "BLAKE3";
    const BLOCK_LEN: usize = 64;
    const REQUIRES_NONCE: bool = false;
    type Reader = blake3::OutputReader;

    fn absorb(key: &[u8], nonce: Option<&[u8]>) -> Result<Self::Reader, Error> {
        let key: &[u8; blake3::KEY_LEN] = key
            .try_into()
            .map_err(|_| Error::InvalidParameter("BLAKE3 key must be 32 bytes"))?;
        let mut hasher = blake3::Hasher::new_keyed(key);
        if let Some(nonce) = nonce {
            hasher.update(nonce);
        }
        Ok(hasher.finalize_xof())
    }

    fn squeeze(reader: &mut Self::Reader, out: &mut [u8]) {
        reader.fill(out);
    }
}
