// SPDX-License-Identifier: MIT

//! HMAC_DRBG as defined by SP 800-90A §10.1.2.
use super::{
    check_input, check_request, non_empty, Drbg, DrbgDigest, Generated, ReseedCounter,
    ENTROPY_LEN, MAX_BITS_REQUEST, MAX_RESEED_INTERVAL,
};
use crate::{entropy::Entropy, Error};

use alloc::{format, string::String, vec, vec::Vec};
use core::marker::PhantomData;
use digest::Digest;
use hmac::{Mac, SimpleHmac};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

/// HMAC_DRBG keyed with HMAC over the digest `D`.
pub struct HmacDrbg<D, E> {
    k: Vec<u8>,
    v: Vec<u8>,
    reseed_ctr: ReseedCounter,
    entropy: E,
    digest: PhantomData<fn() -> D>,
}

/// HMAC(key, parts[0] || parts[1] || ...) written into `out`.
fn hmac_into<D: DrbgDigest>(key: &[u8], parts: &[&[u8]], out: &mut [u8]) -> Result<(), Error> {
    let mut mac = <SimpleHmac<D> as Mac>::new_from_slice(key)
        .map_err(|_| Error::InvalidParameter("HMAC key"))?;
    for part in parts {
        Mac::update(&mut mac, part);
    }
    out.copy_from_slice(&Mac::finalize(mac).into_bytes());
    Ok(())
}

impl<D, E> HmacDrbg<D, E>
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

        let out_len = <D as Digest>::output_size();
        let mut drbg = Self {
            k: vec![0x00; out_len],
            v: vec![0x01; out_len],
            reseed_ctr: ReseedCounter::new(reseed_itr.min(MAX_RESEED_INTERVAL)),
            entropy,
            digest: PhantomData,
        };
        drbg.update(&[&seed[..], nonce, personal])?;
        Ok(drbg)
    }

    /// HMAC_DRBG_Update (SP 800-90A §10.1.2.2). `provided` is the
    /// concatenation of its parts.
    fn update(&mut self, provided: &[&[u8]]) -> Result<(), Error> {
        let mut k = Zeroizing::new(vec![0u8; self.k.len()]);
        for round in [0x00u8, 0x01] {
            if round == 0x01 && provided.iter().all(|p| p.is_empty()) {
                break;
            }
            // K = HMAC(K, V || round || provided)
            let round = [round];
            let mut parts: Vec<&[u8]> = Vec::with_capacity(provided.len() + 2);
            parts.push(self.v.as_slice());
            parts.push(&round);
            parts.extend_from_slice(provided);
            hmac_into::<D>(&self.k, &parts, &mut k)?;
            self.k.copy_from_slice(&k);
            // V = HMAC(K, V)
            hmac_into::<D>(&self.k, &[self.v.as_slice()], &mut k)?;
            self.v.copy_from_slice(&k);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_reseed_counter(&mut self, value: u64) {
        self.reseed_ctr.set(value);
    }
}

impl<D, E> Drop for HmacDrbg<D, E> {
    fn drop(&mut self) {
        self.k.zeroize();
        self.v.zeroize();
    }
}

impl<D, E> Drbg for HmacDrbg<D, E>
where
    D: DrbgDigest,
    E: Entropy,
{
    fn block_size(&self) -> usize {
        self.v.len() * 8
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

        let mut add_bytes = non_empty(additional);
        if prediction_resistant {
            self.reseed(add_bytes)?;
            add_bytes = None;
        }
        if let Some(add_bytes) = add_bytes {
            self.update(&[add_bytes])?;
        }

        let mut tmp = Zeroizing::new(vec![0u8; self.v.len()]);
        for blk in bytes.chunks_mut(self.v.len()) {
            hmac_into::<D>(&self.k, &[self.v.as_slice()], &mut tmp)?;
            self.v.copy_from_slice(&tmp);
            blk.copy_from_slice(&self.v[..blk.len()]);
        }
        self.update(&[add_bytes.unwrap_or(&[])])?;
        self.reseed_ctr.advance();
        Ok(Generated::Bits(bytes.len() * 8))
    }

    fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), Error> {
        check_input(additional, "additional info");
        let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
        self.entropy.fill_bytes(&mut entropy[..])?;
        self.update(&[&entropy[..], additional.unwrap_or(&[])])?;
        self.reseed_ctr.reset();
        debug!(digest = D::NAME, "reseeded HMAC_DRBG");
        Ok(())
    }

    fn entropy_mut(&mut self) -> &mut dyn Entropy {
        &mut self.entropy
    }

    fn algorithm_name(&self) -> String {
        format!("HMAC_DRBG/{}", D::NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::HmacDrbg;
    use crate::{
        drbg::{Drbg, DrbgBuilder, DrbgDigest, Generated, MAX_RESEED_INTERVAL},
        entropy::testing::{CountingEntropy, MockEntropy},
        Error,
    };
    use alloc::vec::Vec;
    use sha2::{Sha256, Sha512};

    //
    // CAVS 14.3, HMAC_DRBG SHA-256, no reseed, no prediction resistance
    //

    #[test]
    fn hmac_drbg_sha256_cavs() -> Result<(), Error> {
        let entropy =
            hex::decode("ca851911349384bffe89de1cbdc46e6831e44d34a4fb935ee285dd14b71a7488")
                .unwrap();
        let nonce = hex::decode("659ba96c601dc69fc902940805ec0ca8").unwrap();
        let output = hex::decode(
            "e528e9abf2dece54d47c7e75e5fe302149f817ea9fb4bee6f4199697d04d5b89\
             d54fbb978a15b5c443c9ec21036d2460b6f73ebad0dc2aba6e624abf07745bc1\
             07694bb7547bb0995f70de25d6b29e2d3011bb19d27676c07162c8b5ccde0668\
             961df86803482cb37ed6d5c0bb8d50cf1f50d476aa0458bdaba806f48be9dcb8",
        )
        .unwrap();

        let mut drbg: HmacDrbg<Sha256, _> = DrbgBuilder::new(MockEntropy::new(&[&entropy[..]]))
            .nonce(&nonce)
            .build_hmac()?;
        let mut bytes = [0u8; 128];
        let _ = drbg.generate(&mut bytes, None, false)?;
        let _ = drbg.generate(&mut bytes, None, false)?;
        assert_eq!(output, bytes);
        Ok(())
    }

    fn run_known_answer<D: DrbgDigest>(expected: [&str; 3]) -> Result<(), Error> {
        let entropy: Vec<u8> = (0..32).collect();
        let reseed: Vec<u8> = (64..96).collect();
        let nonce: Vec<u8> = (32..48).collect();
        let additional = [0xabu8; 16];

        let mut drbg: HmacDrbg<D, _> =
            DrbgBuilder::new(MockEntropy::new(&[&entropy[..], &reseed[..]]))
                .nonce(&nonce)
                .personal(b"drbg-stream test")
                .build_hmac()?;
        let mut bytes = [0u8; 64];
        let _ = drbg.generate(&mut bytes, None, false)?;
        assert_eq!(hex::decode(expected[0]).unwrap(), bytes);
        let _ = drbg.generate(&mut bytes, Some(&additional), false)?;
        assert_eq!(hex::decode(expected[1]).unwrap(), bytes);
        drbg.reseed(Some(&additional))?;
        let _ = drbg.generate(&mut bytes, None, false)?;
        assert_eq!(hex::decode(expected[2]).unwrap(), bytes);
        Ok(())
    }

    #[test]
    fn hmac_drbg_sha256_known_answer() -> Result<(), Error> {
        run_known_answer::<Sha256>([
            "7925326e7916c0040365e4a98a2f77c1754b55bb2fbe1bc18bb17422d5fab414\
             e67385ab1e73e971acee5da417483110dd888300c6e31de491b85fe1f4674bd0",
            "a792644dde122a2fece0f892a8e395a00b948fbd15c5d550ac769cd7beae9574\
             8d9a56f2f5510812945c556f6e043cae7b2a6b63e6c91e56d623b57f054e21bf",
            "04077afb99af75d709afa68b7acad8340dab5a390374bf4d82fcbb5e6a0e2772\
             f8f3a2e55a7993c9e0f6f4b77df60803310aef16427148b8a914b14ec113a3e8",
        ])
    }

    #[test]
    fn hmac_drbg_sha512_known_answer() -> Result<(), Error> {
        run_known_answer::<Sha512>([
            "d45e1531715c4f15bc04f85412d8d05bd07fb783ad012bf6ecee3fc38074231a\
             db6279be555a970931273d47bb23a8ffb814f73a1f7613ac746fc143fad7fb94",
            "257039fbb1e2f3f013c0177e7b9ef1a82aa673f0f5f8b74159983df7eaae5380\
             3ebae483847c44a2d6dbe1226a2c3c448c962224b527e932f9ce166ea9328d0d",
            "a68f2877ffa17ef91724c54431fd8e451134a8f2d04c614c369b6280cc71f41a\
             60355e97534f7b7a66569a73f945f42f18bb50b5646ca94c4dddfeb9c6016754",
        ])
    }

    #[test]
    fn hmac_drbg_reseed_required_at_limit() -> Result<(), Error> {
        let mut drbg: HmacDrbg<Sha256, _> =
            DrbgBuilder::new(CountingEntropy::new(0)).build_hmac()?;
        let mut bytes = [0u8; 32];
        drbg.set_reseed_counter(MAX_RESEED_INTERVAL);
        assert_eq!(Generated::ReseedRequired, drbg.generate(&mut bytes, None, false)?);
        drbg.reseed(None)?;
        assert_eq!(Generated::Bits(256), drbg.generate(&mut bytes, None, false)?);
        Ok(())
    }

    #[test]
    fn hmac_drbg_partial_block() -> Result<(), Error> {
        let build = || {
            DrbgBuilder::new(CountingEntropy::new(0))
                .nonce(&[2u8; 16])
                .build_hmac::<Sha256>()
        };
        let (mut a, mut b) = (build()?, build()?);
        let mut short = [0u8; 20];
        let mut long = [0u8; 64];
        let _ = a.generate(&mut short, None, false)?;
        let _ = b.generate(&mut long, None, false)?;
        assert_eq!(short[..], long[..20]);
        Ok(())
    }
}
