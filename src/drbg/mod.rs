// SPDX-License-Identifier: MIT

//! Deterministic random bit generators.
//!
//! Every generator implements the [`Drbg`] trait. Concrete variants are
//! independent types:
//!
//! - [`HashDrbg`] (SP 800-90A §10.1.1) over SHA-256/384/512.
//! - [`HmacDrbg`] (SP 800-90A §10.1.2) over SHA-256/512.
//! - [`CtrDrbg`] (SP 800-90A §10.2) with AES-256 and derivation function.
//! - [`X931Drbg`], the ANSI X9.31 generator with AES-256.
//!
//! [`DrbgBuilder`] selects one of them from a [`DrbgKind`] and returns
//! it as an [`AnyDrbg`].
//!
//! A generator never reseeds on its own. When its reseed counter runs
//! out, [`Drbg::generate`] returns [`Generated::ReseedRequired`] and
//! leaves its state untouched; the caller reseeds and retries.
//! [`BufferedRandom`](crate::random::BufferedRandom) does that for you.
use crate::{counter::BigCounter, entropy::Entropy, Error};

use alloc::{boxed::Box, string::String, vec::Vec};
use core::cmp::Ordering;
use digest::{core_api::BlockSizeUser, Digest};
use sha2::{Sha256, Sha384, Sha512};
use tracing::{debug, warn};

mod ctr;
mod hash;
mod hmac;
mod x931;

pub use self::ctr::CtrDrbg;
pub use self::hash::{hash_df, HashDrbg};
pub use self::hmac::HmacDrbg;
pub use self::x931::X931Drbg;

/// Largest request a single SP 800-90A `generate` call accepts, in bits.
pub const MAX_BITS_REQUEST: usize = 1 << 18;

/// Reseed counter value at which SP 800-90A generators require a reseed.
pub const MAX_RESEED_INTERVAL: u64 = 1 << 47;

/// Bytes drawn from the entropy source per (re)seed.
pub(crate) const ENTROPY_LEN: usize = 32;

const MAX_INPUT_LEN: u64 = 1 << 32;
const MIN_NONCE_LEN: usize = 16;

/// Outcome of a [`Drbg::generate`] call.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    /// The output buffer was filled with this many bits.
    Bits(usize),
    /// The reseed counter is exhausted. Nothing was written and the
    /// generator state is unchanged.
    ReseedRequired,
}

/// Common contract of every generator variant.
pub trait Drbg {
    /// Native output block size in bits.
    fn block_size(&self) -> usize;

    /// Fill `bytes` with generator output.
    ///
    /// With `prediction_resistant` set the generator reseeds from its
    /// entropy source (using `additional` as reseed input) before
    /// producing output.
    ///
    /// # Error
    ///
    /// Returns [`Error::RequestTooLarge`] when `bytes` exceeds the per
    /// call limit and any entropy source error raised by a prediction
    /// resistant reseed.
    fn generate(
        &mut self,
        bytes: &mut [u8],
        additional: Option<&[u8]>,
        prediction_resistant: bool,
    ) -> Result<Generated, Error>;

    /// Reseed from the entropy source, mixing in optional `additional`
    /// input, and reset the reseed counter.
    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error>;

    /// The entropy source backing this generator.
    fn entropy_mut(&mut self) -> &mut dyn Entropy;

    /// Human readable name, for diagnostics only.
    fn algorithm_name(&self) -> String;
}

impl<D: Drbg + ?Sized> Drbg for Box<D> {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn generate(
        &mut self,
        bytes: &mut [u8],
        additional: Option<&[u8]>,
        prediction_resistant: bool,
    ) -> Result<Generated, Error> {
        (**self).generate(bytes, additional, prediction_resistant)
    }

    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        (**self).reseed(additional)
    }

    fn entropy_mut(&mut self) -> &mut dyn Entropy {
        (**self).entropy_mut()
    }

    fn algorithm_name(&self) -> String {
        (**self).algorithm_name()
    }
}

/// Digests usable by [`HashDrbg`] and [`HmacDrbg`].
pub trait DrbgDigest: Digest + BlockSizeUser + Clone {
    const NAME: &'static str;
}

impl DrbgDigest for Sha256 {
    const NAME: &'static str = "SHA-256";
}

impl DrbgDigest for Sha384 {
    const NAME: &'static str = "SHA-384";
}

impl DrbgDigest for Sha512 {
    const NAME: &'static str = "SHA-512";
}

/// Generate into `bytes`, reseeding once if the generator asks for it.
///
/// A second reseed request right after a reseed means the counter
/// arithmetic is broken and is reported as [`Error::ReseedLoop`].
pub(crate) fn generate_reseeding<D: Drbg + ?Sized>(
    drbg: &mut D,
    bytes: &mut [u8],
    additional: Option<&[u8]>,
    prediction_resistant: bool,
) -> Result<usize, Error> {
    match drbg.generate(bytes, additional, prediction_resistant)? {
        Generated::Bits(n) => Ok(n),
        Generated::ReseedRequired => {
            debug!(algorithm = %drbg.algorithm_name(), "reseed counter exhausted, reseeding");
            drbg.reseed(None)?;
            match drbg.generate(bytes, additional, prediction_resistant)? {
                Generated::Bits(n) => Ok(n),
                Generated::ReseedRequired => {
                    warn!(algorithm = %drbg.algorithm_name(), "reseed required after reseed");
                    Err(Error::ReseedLoop)
                }
            }
        }
    }
}

/// Reject requests above `max_bits`.
pub(crate) fn check_request(bytes: &[u8], max_bits: usize) -> Result<(), Error> {
    let requested = bytes.len().saturating_mul(8);
    if requested > max_bits {
        return Err(Error::RequestTooLarge {
            requested,
            limit: max_bits,
        });
    }
    Ok(())
}

/// Empty additional input is treated as absent.
pub(crate) fn non_empty(additional: Option<&[u8]>) -> Option<&[u8]> {
    additional.filter(|a| !a.is_empty())
}

/// # Panics
///
/// Panics if `input` is longer than 2^32 bytes.
pub(crate) fn check_input(input: Option<&[u8]>, what: &str) {
    if let Some(buf) = input {
        if buf.len() as u64 > MAX_INPUT_LEN {
            panic!("Drbg: {} exceeds max input length", what)
        }
    }
}

/// Number of generate calls since the last (re)seed, starting at 1.
pub(crate) struct ReseedCounter {
    count: BigCounter,
    limit: u64,
}

impl ReseedCounter {
    pub(crate) fn new(limit: u64) -> Self {
        Self {
            count: BigCounter::from_u64(1),
            limit,
        }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.count.compare_limit(self.limit) != Ordering::Less
    }

    pub(crate) fn advance(&mut self) {
        self.count.iterate();
    }

    pub(crate) fn reset(&mut self) {
        self.count.set_u64(1);
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.count.as_bytes()
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, value: u64) {
        self.count.set_u64(value);
    }
}

/// Generator variants selectable through [`DrbgBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrbgKind {
    #[default]
    HashSha256,
    HashSha384,
    HashSha512,
    HmacSha256,
    HmacSha512,
    CtrAes256,
    X931Aes256,
}

/// A generator of any [`DrbgKind`].
pub enum AnyDrbg<E> {
    HashSha256(HashDrbg<Sha256, E>),
    HashSha384(HashDrbg<Sha384, E>),
    HashSha512(HashDrbg<Sha512, E>),
    HmacSha256(HmacDrbg<Sha256, E>),
    HmacSha512(HmacDrbg<Sha512, E>),
    CtrAes256(CtrDrbg<E>),
    X931Aes256(X931Drbg<E>),
}

macro_rules! delegate {
    ($self:expr, $d:ident => $call:expr) => {
        match $self {
            AnyDrbg::HashSha256($d) => $call,
            AnyDrbg::HashSha384($d) => $call,
            AnyDrbg::HashSha512($d) => $call,
            AnyDrbg::HmacSha256($d) => $call,
            AnyDrbg::HmacSha512($d) => $call,
            AnyDrbg::CtrAes256($d) => $call,
            AnyDrbg::X931Aes256($d) => $call,
        }
    };
}

impl<E> AnyDrbg<E> {
    pub fn kind(&self) -> DrbgKind {
        match self {
            AnyDrbg::HashSha256(_) => DrbgKind::HashSha256,
            AnyDrbg::HashSha384(_) => DrbgKind::HashSha384,
            AnyDrbg::HashSha512(_) => DrbgKind::HashSha512,
            AnyDrbg::HmacSha256(_) => DrbgKind::HmacSha256,
            AnyDrbg::HmacSha512(_) => DrbgKind::HmacSha512,
            AnyDrbg::CtrAes256(_) => DrbgKind::CtrAes256,
            AnyDrbg::X931Aes256(_) => DrbgKind::X931Aes256,
        }
    }
}

impl<E: Entropy> Drbg for AnyDrbg<E> {
    fn block_size(&self) -> usize {
        delegate!(self, d => d.block_size())
    }

    fn generate(
        &mut self,
        bytes: &mut [u8],
        additional: Option<&[u8]>,
        prediction_resistant: bool,
    ) -> Result<Generated, Error> {
        delegate!(self, d => d.generate(bytes, additional, prediction_resistant))
    }

    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        delegate!(self, d => d.reseed(additional))
    }

    fn entropy_mut(&mut self) -> &mut dyn Entropy {
        delegate!(self, d => d.entropy_mut())
    }

    fn algorithm_name(&self) -> String {
        delegate!(self, d => d.algorithm_name())
    }
}

/// Builder class for instantiating generators.
///
/// Unless an entropy source other than
/// [`OsEntropy`](crate::entropy::OsEntropy) is required, it is
/// recommended to use the thread-local instance provided by
/// [`LocalRandom`](crate::thread::LocalRandom), rather than allocate this
/// type by hand.
///
/// # Example
/// ```
/// use drbg_stream::{drbg::{Drbg, DrbgBuilder, DrbgKind}, entropy::OsEntropy};
///
/// # use drbg_stream::Error;
/// #
/// # fn main() -> Result<(), Error> {
/// #
/// let my_info = 0u32;
/// let mut drbg = DrbgBuilder::new(OsEntropy::default())
///     .kind(DrbgKind::HashSha512)
///     .personal(&my_info.to_be_bytes())
///     .reseed_interval(1 << 14)
///     .build()?;
///
/// let mut random_data = [0u8; 32];
/// let _ = drbg.generate(&mut random_data, None, false)?;
/// #
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DrbgBuilder<'a, E> {
    kind: DrbgKind,
    personal: Option<&'a [u8]>,
    nonce: Option<&'a [u8]>,
    reseed_itr: u64,
    entropy: E,
}

impl<'a, E> DrbgBuilder<'a, E>
where
    E: Entropy,
{
    pub fn new(entropy: E) -> Self {
        Self {
            kind: DrbgKind::default(),
            personal: None,
            nonce: None,
            reseed_itr: MAX_RESEED_INTERVAL,
            entropy,
        }
    }

    /// Select the generator variant built by [`build`](Self::build).
    ///
    /// By default, this is [`DrbgKind::HashSha256`].
    pub fn kind(mut self, kind: DrbgKind) -> Self {
        self.kind = kind;
        self
    }

    /// Specify the nonce used to instantiate the generator.
    ///
    /// By default, this value is 16 bytes read from the `Entropy`
    /// source.
    ///
    /// # Panics
    ///
    /// This function panics if the the length of `nonce` is not `16 <=
    /// nonce <= 2^32`.
    pub fn nonce(mut self, nonce: &'a [u8]) -> Self {
        check_input(Some(nonce), "nonce");
        if nonce.len() < MIN_NONCE_LEN {
            panic!("Drbg: nonce is less than min length")
        }
        self.nonce = Some(nonce);
        self
    }

    /// Specify the reseed counter limit.
    ///
    /// Once a generator's reseed counter reaches this value, the next
    /// generate call requests a reseed. Lowering this value increases
    /// security at the cost of more frequent calls to the entropy
    /// source. Variants with a smaller built-in limit (X9.31) use the
    /// smaller of the two.
    ///
    /// By default, this value is 2^47.
    ///
    /// # Panics
    ///
    /// Panics unless `2 <= reseed_itr <= 2^47`.
    pub fn reseed_interval(mut self, reseed_itr: u64) -> Self {
        if reseed_itr > MAX_RESEED_INTERVAL {
            panic!("Drbg: reseed interval exceeds max interval")
        }
        if reseed_itr < 2 {
            panic!("Drbg: reseed interval must allow at least one request")
        }
        self.reseed_itr = reseed_itr;
        self
    }

    /// Specify the personalization info used to instantiate the
    /// generator.
    ///
    /// By default, this value is empty.
    ///
    /// # Panics
    ///
    /// The max length for the personalized info is 2^32. This
    /// function panics if that threshold is exceeded.
    pub fn personal(mut self, personal: &'a [u8]) -> Self {
        check_input(Some(personal), "personalization");
        self.personal = Some(personal);
        self
    }

    /// Build the generator selected by [`kind`](Self::kind).
    ///
    /// # Error
    ///
    /// Returns an error when there is an problem reading from the
    /// entropy source or the variant rejects its inputs.
    pub fn build(self) -> Result<AnyDrbg<E>, Error> {
        let drbg = match self.kind {
            DrbgKind::HashSha256 => AnyDrbg::HashSha256(self.build_hash()?),
            DrbgKind::HashSha384 => AnyDrbg::HashSha384(self.build_hash()?),
            DrbgKind::HashSha512 => AnyDrbg::HashSha512(self.build_hash()?),
            DrbgKind::HmacSha256 => AnyDrbg::HmacSha256(self.build_hmac()?),
            DrbgKind::HmacSha512 => AnyDrbg::HmacSha512(self.build_hmac()?),
            DrbgKind::CtrAes256 => AnyDrbg::CtrAes256(self.build_ctr()?),
            DrbgKind::X931Aes256 => AnyDrbg::X931Aes256(self.build_x931()?),
        };
        debug!(algorithm = %drbg.algorithm_name(), "instantiated generator");
        Ok(drbg)
    }

    /// Build a [`HashDrbg`] over `D`, ignoring [`kind`](Self::kind).
    pub fn build_hash<D: DrbgDigest>(self) -> Result<HashDrbg<D, E>, Error> {
        let (entropy, nonce, personal, reseed_itr) = self.into_parts()?;
        HashDrbg::new(entropy, &nonce, personal, reseed_itr)
    }

    /// Build an [`HmacDrbg`] over `D`, ignoring [`kind`](Self::kind).
    pub fn build_hmac<D: DrbgDigest>(self) -> Result<HmacDrbg<D, E>, Error> {
        let (entropy, nonce, personal, reseed_itr) = self.into_parts()?;
        HmacDrbg::new(entropy, &nonce, personal, reseed_itr)
    }

    /// Build a [`CtrDrbg`], ignoring [`kind`](Self::kind).
    pub fn build_ctr(self) -> Result<CtrDrbg<E>, Error> {
        let (entropy, nonce, personal, reseed_itr) = self.into_parts()?;
        CtrDrbg::new(entropy, &nonce, personal, reseed_itr)
    }

    /// Build an [`X931Drbg`], ignoring [`kind`](Self::kind).
    pub fn build_x931(self) -> Result<X931Drbg<E>, Error> {
        let (entropy, nonce, personal, reseed_itr) = self.into_parts()?;
        X931Drbg::new(entropy, &nonce, personal, reseed_itr)
    }

    fn into_parts(mut self) -> Result<(E, Vec<u8>, &'a [u8], u64), Error> {
        let personal = self.personal.unwrap_or(&[]);
        let nonce = match self.nonce {
            Some(nonce) => nonce.to_vec(),
            None => {
                let mut nonce = alloc::vec![0u8; MIN_NONCE_LEN];
                self.entropy.fill_bytes(&mut nonce)?;
                nonce
            }
        };
        Ok((self.entropy, nonce, personal, self.reseed_itr))
    }
}
