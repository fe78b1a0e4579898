// SPDX-License-Identifier: MIT

//! General purpose random sources built on top of a [`Drbg`].
use crate::{
    drbg::{generate_reseeding, Drbg, MAX_BITS_REQUEST},
    Error,
};

use alloc::{string::String, vec, vec::Vec};
use tracing::{debug, trace};
use zeroize::Zeroize;

#[cfg(feature = "rand_core")]
use rand_core::{TryCryptoRng, TryRngCore};

/// Capabilities shared by every random source in this crate.
pub trait Random {
    /// Fill `dest` with random data.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), Error>;

    /// Force a reseed from the entropy source, mixing in optional
    /// `additional` input. Buffered output is discarded.
    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error>;

    /// Mix `seed` into the source. The seed supplements the entropy
    /// source and never replaces it, so two sources given the same seed
    /// still produce unrelated output.
    fn set_seed(&mut self, seed: &[u8]) -> Result<(), Error>;

    /// [`set_seed`](Self::set_seed) with the big-endian bytes of `seed`.
    fn set_seed_u64(&mut self, seed: u64) -> Result<(), Error> {
        self.set_seed(&seed.to_be_bytes())
    }

    /// `len` bytes drawn straight from the entropy source. The output
    /// stream of the source is not affected.
    fn generate_seed(&mut self, len: usize) -> Result<Vec<u8>, Error>;

    /// Name of the underlying algorithm, for diagnostics.
    fn algorithm_name(&self) -> String;
}

/// Buffers the output of a [`Drbg`] one native block at a time.
///
/// When the generator reports that its reseed counter is exhausted the
/// buffer reseeds it from its entropy source and retries once.
///
/// In prediction resistant mode every [`fill`](Random::fill) bypasses
/// the buffer and requests output with a fresh reseed, split into
/// chunks of at most 2^18 bits.
///
/// # Example
///
/// ```
/// use drbg_stream::{
///     drbg::{DrbgBuilder, DrbgKind},
///     entropy::OsEntropy,
///     random::{BufferedRandom, Random},
/// };
///
/// # fn main() -> Result<(), drbg_stream::Error> {
/// let drbg = DrbgBuilder::new(OsEntropy::default())
///     .kind(DrbgKind::CtrAes256)
///     .build()?;
/// let mut rng = BufferedRandom::new(drbg, false);
/// let mut nonce = [0u8; 12];
/// rng.fill(&mut nonce)?;
/// let n = rng.next_u64()?;
/// # let _ = n;
/// # Ok(())
/// # }
/// ```
pub struct BufferedRandom<D> {
    drbg: D,
    buf: Vec<u8>,
    available: usize,
    prediction_resistant: bool,
}

impl<D> Drop for BufferedRandom<D> {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

impl<D: Drbg> BufferedRandom<D> {
    /// # Panics
    ///
    /// Panics if the generator's block is shorter than one byte.
    pub fn new(drbg: D, prediction_resistant: bool) -> Self {
        let len = drbg.block_size() / 8;
        assert!(len > 0, "generator block size below 8 bits");
        Self {
            drbg,
            buf: vec![0u8; len],
            available: 0,
            prediction_resistant,
        }
    }

    pub fn is_prediction_resistant(&self) -> bool {
        self.prediction_resistant
    }

    pub fn drbg(&self) -> &D {
        &self.drbg
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

    fn fill_resistant(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        trace!(len = dest.len(), "prediction resistant fill");
        for chunk in dest.chunks_mut(MAX_BITS_REQUEST / 8) {
            generate_reseeding(&mut self.drbg, chunk, None, true)?;
        }
        self.invalidate();
        Ok(())
    }

    fn refill(&mut self) -> Result<(), Error> {
        generate_reseeding(&mut self.drbg, &mut self.buf, None, false)?;
        self.available = self.buf.len();
        Ok(())
    }

    // Zero in place, the buffer keeps its length.
    fn invalidate(&mut self) {
        self.buf.as_mut_slice().zeroize();
        self.available = 0;
    }
}

impl<D: Drbg> Random for BufferedRandom<D> {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        if self.prediction_resistant {
            return self.fill_resistant(dest);
        }
        let mut pos = 0;
        while pos < dest.len() {
            if self.available == 0 {
                self.refill()?;
            }
            let start = self.buf.len() - self.available;
            let n = self.available.min(dest.len() - pos);
            dest[pos..pos + n].copy_from_slice(&self.buf[start..start + n]);
            self.buf[start..start + n].zeroize();
            self.available -= n;
            pos += n;
        }
        Ok(())
    }

    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        self.invalidate();
        self.drbg.reseed(additional)?;
        debug!(algorithm = %self.drbg.algorithm_name(), "forced reseed");
        Ok(())
    }

    fn set_seed(&mut self, seed: &[u8]) -> Result<(), Error> {
        self.invalidate();
        self.drbg.entropy_mut().add_seed(seed);
        self.drbg.reseed(Some(seed))?;
        debug!(algorithm = %self.drbg.algorithm_name(), len = seed.len(), "mixed in caller seed");
        Ok(())
    }

    fn generate_seed(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut seed = vec![0u8; len];
        self.drbg.entropy_mut().fill_bytes(&mut seed)?;
        Ok(seed)
    }

    fn algorithm_name(&self) -> String {
        self.drbg.algorithm_name()
    }
}

#[cfg(feature = "rand_core")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand_core")))]
impl<D: Drbg> TryCryptoRng for BufferedRandom<D> where BufferedRandom<D>: TryRngCore {}

#[cfg(feature = "rand_core")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand_core")))]
impl<D: Drbg> TryRngCore for BufferedRandom<D> {
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

#[cfg(test)]
mod tests {
    use super::{BufferedRandom, Random};
    use crate::{
        drbg::{Drbg, DrbgBuilder, DrbgKind, Generated, MAX_BITS_REQUEST},
        entropy::{
            testing::{CountingEntropy, FailingEntropy},
            Entropy,
        },
        Error,
    };
    use alloc::{string::String, vec, vec::Vec};

    const NONCE: [u8; 16] = [0x5a; 16];

    fn buffered(
        entropy: &mut CountingEntropy,
        kind: DrbgKind,
        prediction_resistant: bool,
    ) -> Result<BufferedRandom<impl Drbg + '_>, Error> {
        let drbg = DrbgBuilder::new(entropy)
            .kind(kind)
            .nonce(&NONCE)
            .reseed_interval(1 << 20)
            .build()?;
        Ok(BufferedRandom::new(drbg, prediction_resistant))
    }

    #[test]
    fn output_matches_block_sized_generate_calls() -> Result<(), Error> {
        for kind in [DrbgKind::HashSha384, DrbgKind::CtrAes256, DrbgKind::HmacSha512] {
            let mut src_a = CountingEntropy::new(11);
            let mut src_b = CountingEntropy::new(11);
            let mut rng = buffered(&mut src_a, kind, false)?;
            let mut drbg = DrbgBuilder::new(&mut src_b)
                .kind(kind)
                .nonce(&NONCE)
                .reseed_interval(1 << 20)
                .build()?;

            let mut actual = vec![0u8; 300];
            let mut pos = 0;
            for step in [1, 7, 64, 3, 100, 125] {
                rng.fill(&mut actual[pos..pos + step])?;
                pos += step;
            }

            let block = drbg.block_size() / 8;
            let mut expected = Vec::new();
            while expected.len() < actual.len() {
                let mut blk = vec![0u8; block];
                assert_eq!(Generated::Bits(block * 8), drbg.generate(&mut blk, None, false)?);
                expected.extend_from_slice(&blk);
            }
            assert_eq!(expected[..actual.len()], actual[..], "{:?}", kind);
        }
        Ok(())
    }

    #[test]
    fn reseeds_when_counter_runs_out() -> Result<(), Error> {
        let mut src = CountingEntropy::new(0);
        {
            let drbg = DrbgBuilder::new(&mut src)
                .nonce(&NONCE)
                .reseed_interval(2)
                .build()?;
            let mut rng = BufferedRandom::new(drbg, false);
            // three 32 byte blocks, the last two after a reseed
            let mut out = [0u8; 96];
            rng.fill(&mut out)?;
        }
        assert_eq!(96, src.next);
        Ok(())
    }

    #[test]
    fn prediction_resistance_reseeds_every_fill() -> Result<(), Error> {
        let mut src = CountingEntropy::new(0);
        {
            let mut rng = buffered(&mut src, DrbgKind::HashSha256, true)?;
            assert!(rng.is_prediction_resistant());
            let mut out = [0u8; 5];
            rng.fill(&mut out)?;
            rng.fill(&mut out)?;
        }
        // instantiate plus one reseed per fill
        assert_eq!(96, src.next);
        Ok(())
    }

    #[test]
    fn prediction_resistance_splits_large_requests() -> Result<(), Error> {
        let mut src = CountingEntropy::new(0);
        {
            let mut rng = buffered(&mut src, DrbgKind::HmacSha256, true)?;
            let mut out = vec![0u8; MAX_BITS_REQUEST / 8 + 1];
            rng.fill(&mut out)?;
        }
        assert_eq!(96, src.next);
        Ok(())
    }

    #[test]
    fn set_seed_is_additive_and_drops_buffer() -> Result<(), Error> {
        let mut src_a = CountingEntropy::new(0);
        let mut src_b = CountingEntropy::new(0);
        {
            let mut a = buffered(&mut src_a, DrbgKind::HashSha256, false)?;
            let mut b = buffered(&mut src_b, DrbgKind::HashSha256, false)?;
            let mut x = [0u8; 8];
            let mut y = [0u8; 8];
            a.fill(&mut x)?;
            b.fill(&mut y)?;
            assert_eq!(x, y);

            a.set_seed(b"caller seed")?;
            a.fill(&mut x)?;
            b.fill(&mut y)?;
            assert_ne!(x, y);
        }
        assert_eq!(b"caller seed", &src_a.seeded[..]);
        // the seed forced a reseed
        assert_eq!(64, src_a.next);
        assert_eq!(32, src_b.next);
        Ok(())
    }

    #[test]
    fn set_seed_u64_uses_big_endian_bytes() -> Result<(), Error> {
        let mut src = CountingEntropy::new(0);
        {
            let mut rng = buffered(&mut src, DrbgKind::HmacSha256, false)?;
            rng.set_seed_u64(0x0102_0304_0506_0708)?;
        }
        assert_eq!(&[1, 2, 3, 4, 5, 6, 7, 8], &src.seeded[..]);
        Ok(())
    }

    #[test]
    fn reseed_discards_buffered_output() -> Result<(), Error> {
        let mut src_a = CountingEntropy::new(0);
        let mut src_b = CountingEntropy::new(0);
        let mut a = buffered(&mut src_a, DrbgKind::CtrAes256, false)?;
        let mut b = buffered(&mut src_b, DrbgKind::CtrAes256, false)?;
        let mut x = [0u8; 4];
        let mut y = [0u8; 4];
        a.fill(&mut x)?;
        b.fill(&mut y)?;
        a.reseed(None)?;
        a.fill(&mut x)?;
        b.fill(&mut y)?;
        assert_ne!(x, y);
        Ok(())
    }

    #[test]
    fn fill_after_reseed_keeps_block_buffer() -> Result<(), Error> {
        let mut src = CountingEntropy::new(0);
        let mut rng = buffered(&mut src, DrbgKind::HashSha256, false)?;
        let mut out = [0u8; 40];
        rng.fill(&mut out[..5])?;
        rng.reseed(None)?;
        assert_eq!(32, rng.buf.len());
        assert_eq!(0, rng.available);
        rng.fill(&mut out)?;
        assert_eq!(24, rng.available);
        rng.set_seed(b"again")?;
        assert_eq!(32, rng.buf.len());
        rng.fill(&mut out)?;
        assert_ne!([0u8; 40], out);
        Ok(())
    }

    #[test]
    fn failed_set_seed_drops_buffer() -> Result<(), Error> {
        // enough for instantiation only
        let mut src = FailingEntropy::new(0, 1);
        let drbg = DrbgBuilder::new(&mut src)
            .kind(DrbgKind::HmacSha256)
            .nonce(&NONCE)
            .build()?;
        let mut rng = BufferedRandom::new(drbg, false);
        let mut out = [0u8; 4];
        rng.fill(&mut out)?;
        assert_eq!(28, rng.available);

        assert!(matches!(rng.set_seed(b"late"), Err(Error::Entropy(_))));
        assert_eq!(0, rng.available);
        assert_eq!([0u8; 32], rng.buf[..]);
        assert!(rng.reseed(None).is_err());
        assert_eq!(0, rng.available);

        // the generator itself is still usable
        rng.fill(&mut out)?;
        assert_eq!(32, rng.buf.len());
        Ok(())
    }

    struct TinyBlock(CountingEntropy);

    impl Drbg for TinyBlock {
        fn block_size(&self) -> usize {
            4
        }

        fn generate(
            &mut self,
            dest: &mut [u8],
            _additional: Option<&[u8]>,
            _prediction_resistance: bool,
        ) -> Result<Generated, Error> {
            Ok(Generated::Bits(dest.len() * 8))
        }

        fn reseed(&mut self, _additional: Option<&[u8]>) -> Result<(), Error> {
            Ok(())
        }

        fn entropy_mut(&mut self) -> &mut dyn Entropy {
            &mut self.0
        }

        fn algorithm_name(&self) -> String {
            String::from("tiny")
        }
    }

    #[test]
    #[should_panic(expected = "block size")]
    fn sub_byte_block_panics() {
        let _ = BufferedRandom::new(TinyBlock(CountingEntropy::new(0)), false);
    }

    #[test]
    fn generate_seed_reads_entropy_source() -> Result<(), Error> {
        let mut src = CountingEntropy::new(0);
        let mut rng = buffered(&mut src, DrbgKind::HashSha512, false)?;
        let mut before = [0u8; 16];
        rng.fill(&mut before)?;
        assert_eq!(vec![32u8, 33, 34, 35], rng.generate_seed(4)?);
        assert!(rng.generate_seed(0)?.is_empty());
        Ok(())
    }

    #[test]
    fn next_integers() -> Result<(), Error> {
        let mut src_a = CountingEntropy::new(4);
        let mut src_b = CountingEntropy::new(4);
        let mut a = buffered(&mut src_a, DrbgKind::HashSha256, false)?;
        let mut b = buffered(&mut src_b, DrbgKind::HashSha256, false)?;
        let mut bytes = [0u8; 12];
        b.fill(&mut bytes)?;
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), a.next_u32()?);
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&bytes[4..]);
        assert_eq!(u64::from_le_bytes(tail), a.next_u64()?);
        Ok(())
    }

    #[test]
    fn name_comes_from_generator() -> Result<(), Error> {
        let mut src = CountingEntropy::new(0);
        let rng = buffered(&mut src, DrbgKind::X931Aes256, false)?;
        assert_eq!("X9.31/AES-256", rng.algorithm_name());
        Ok(())
    }

    #[cfg(feature = "rand_core")]
    #[test]
    fn rand_core_interface() -> Result<(), Error> {
        use rand_core::TryRngCore;

        let mut src = CountingEntropy::new(0);
        let mut rng = buffered(&mut src, DrbgKind::HashSha256, false)?;
        let mut buf = [0u8; 40];
        rng.try_fill_bytes(&mut buf)?;
        assert_ne!([0u8; 40], buf);
        let _ = rng.try_next_u64()?;
        Ok(())
    }
}
