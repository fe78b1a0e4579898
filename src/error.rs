// SPDX-License-Identifier: MIT

use alloc::string::{String, ToString};
use core::fmt::{Debug, Display};
use thiserror::Error;

/// Errors reported by generators, random sources and stream adapters.
#[derive(Debug, Error)]
pub enum Error {
    /// The entropy source failed to produce seed material.
    #[error("entropy error: {0}")]
    Entropy(String),

    /// A key, nonce, personalization string or other input was rejected.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The operation needs a prior `init`.
    #[error("{0} not initialised")]
    NotInitialized(&'static str),

    /// A single request asked for more output than the generator may
    /// produce per call. The caller must split the request.
    #[error("request for {requested} bits exceeds the limit of {limit} bits per call")]
    RequestTooLarge { requested: usize, limit: usize },

    /// The output buffer is shorter than the input.
    #[error("output buffer too short")]
    OutputTooShort,

    /// The generator still asked for a reseed right after being reseeded.
    #[error("generator requires reseed immediately after reseed")]
    ReseedLoop,

    /// A shared instance lock was poisoned by a panicking holder.
    #[error("instance lock poisoned")]
    Poisoned,
}

impl Error {
    /// Create a new error by wrapping an underlying entropy source
    /// error.
    ///
    /// # Example
    /// ```
    /// use drbg_stream::Error;
    ///
    /// fn fill_bytes(bytes: &mut [u8]) -> Result<(), Error> {
    ///    getrandom::getrandom(bytes).map_err(Error::entropy)
    /// }
    /// ```
    pub fn entropy<E>(error: E) -> Self
    where
        E: Display + Debug,
    {
        Self::Entropy(error.to_string())
    }
}
