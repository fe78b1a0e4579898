// SPDX-License-Identifier: MIT

//! Deterministic random bit generators and keystream sources.
//!
//! This crate implements the Hash_DRBG, HMAC_DRBG and CTR_DRBG
//! constructions defined by NIST [SP 800-90A
//! Rev. 1](https://csrc.nist.gov/publications/detail/sp/800-90a/rev-1/final),
//! the ANSI X9.31 generator, and the plumbing that turns them into
//! general purpose random sources:
//!
//! - [`BufferedRandom`](crate::random::BufferedRandom) buffers one
//!   generator block at a time, reseeds when the generator asks for it
//!   and supports prediction resistance.
//! - [`CombinedRandom`](crate::combined::CombinedRandom) XORs a
//!   counter-mode source with a hash source.
//! - [`XofStream`](crate::xof::XofStream) turns a keyed
//!   extendable-output function into a stream cipher.
//!
//! # Quick Example
//!
//! A simple way to obtain crypographic random data is to use the
//! [`LocalRandom::default()`](crate::thread::LocalRandom::default())
//! function. This returns a handle to a thread-local generator seeded
//! from the OS. The `std` feature is required for this approach.
//!
//! ```
//! # #[cfg(feature = "std")]
//! use drbg_stream::thread::LocalRandom;
//!
//! # use drbg_stream::Error;
//! #
//! # fn main() -> Result<(), Error> {
//! #
//! # #[cfg(feature = "std")]
//! let rng = LocalRandom::default();
//! let mut random_data = [0u8; 32];
//! # #[cfg(feature = "std")]
//! rng.fill_bytes(&mut random_data)?;
//! #
//! # Ok(())
//! # }
//! ```
//!
//! Otherwise a generator may be constructed by hand using
//! [`DrbgBuilder`](crate::drbg::DrbgBuilder) and wrapped in a
//! [`BufferedRandom`](crate::random::BufferedRandom). This approach
//! doesn't require the `std` feature.
//!
//! ```
//! use drbg_stream::{
//!     drbg::{DrbgBuilder, DrbgKind},
//!     entropy::OsEntropy,
//!     random::{BufferedRandom, Random},
//! };
//!
//! # fn main() -> Result<(), drbg_stream::Error> {
//! let drbg = DrbgBuilder::new(OsEntropy::default())
//!     .kind(DrbgKind::HmacSha256)
//!     .personal(b"my app")
//!     .build()?;
//! let mut rng = BufferedRandom::new(drbg, false);
//! let mut key = [0u8; 32];
//! rng.fill(&mut key)?;
//! # Ok(())
//! # }
//! ```
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod combined;
pub mod counter;
pub mod drbg;
pub mod entropy;
mod error;
pub mod random;
pub mod xof;

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod thread;

pub use error::Error;
