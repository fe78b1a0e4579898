// SPDX-License-Identifier: MIT

//! Thread-local and shared handles to random sources and streams.
use crate::{
    drbg::{DrbgBuilder, HashDrbg},
    entropy::OsEntropy,
    random::{BufferedRandom, Random},
    xof::{KeyedXof, XofStream},
    Error,
};

use sha2::Sha512;
use std::{
    cell::RefCell,
    rc::Rc,
    string::String,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread_local,
    vec::Vec,
};
use tracing::warn;

#[cfg(feature = "rand_core")]
use rand_core::{TryCryptoRng, TryRngCore};

type LocalSource = BufferedRandom<HashDrbg<Sha512, OsEntropy>>;

/// A thread-local buffered Hash_DRBG.
///
/// A call to [`LocalRandom::default()`] returns a handle to a
/// pre-allocated thread-local instance. Each instance is
/// automatically configured with the following configuration:
///
/// - Hash_DRBG over SHA-512.
///
/// - [`OsEntropy`] as entropy source.
///
/// - Reseed interval of 2^14.
///
/// - 8 byte unique ID as personalization information.
///
/// # Example
///
/// ```
/// # use drbg_stream::Error;
/// use drbg_stream::thread::LocalRandom;
///
/// # fn main() -> Result<(),Error> {
/// let rng = LocalRandom::default();
/// let mut random_data = [0u8; 32];
/// rng.fill_bytes(&mut random_data)?;
/// # Ok(())
/// # }
/// ```
pub struct LocalRandom {
    rng: Rc<RefCell<LocalSource>>,
}

const RESEED_INTERVAL: u64 = 1 << 14;

static NEXT_LOCAL_ID: AtomicU64 = AtomicU64::new(0);

thread_local!(
    static LOCAL_RNG: Rc<RefCell<LocalSource>> = {
        let entropy = OsEntropy::default();
        let id = NEXT_LOCAL_ID.fetch_add(1, Ordering::Relaxed);
        let drbg = DrbgBuilder::new(entropy)
            .personal(&id.to_be_bytes())
            .reseed_interval(RESEED_INTERVAL)
            .build_hash::<Sha512>()
            .expect("DrbgBuilder failure");

        Rc::new(RefCell::new(BufferedRandom::new(drbg, false)))
    }
);

impl Default for LocalRandom {
    fn default() -> Self {
        Self {
            rng: LOCAL_RNG.with(|v| v.clone()),
        }
    }
}

impl LocalRandom {
    /// See [`Random::fill`] for details.
    pub fn fill_bytes(&self, bytes: &mut [u8]) -> Result<(), Error> {
        self.rng.borrow_mut().fill(bytes)
    }

    /// See [`Random::reseed`] for details.
    pub fn reseed(&self, additional: Option<&[u8]>) -> Result<(), Error> {
        self.rng.borrow_mut().reseed(additional)
    }
}

#[cfg(feature = "rand_core")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand_core")))]
impl TryCryptoRng for LocalRandom where LocalRandom: TryRngCore {}

#[cfg(feature = "rand_core")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand_core")))]
impl TryRngCore for LocalRandom {
    type Error = Error;

    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        self.rng.borrow_mut().next_u32()
    }

    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        self.rng.borrow_mut().next_u64()
    }

    fn try_fill_bytes(&mut self, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.rng.borrow_mut().fill(bytes)
    }
}

/// A component shared between threads.
///
/// Every operation holds the lock for its whole duration. A lock
/// poisoned by a panicking holder is reported as [`Error::Poisoned`].
///
/// # Example
///
/// ```
/// use drbg_stream::{
///     drbg::DrbgBuilder, entropy::OsEntropy, random::BufferedRandom, thread::Shared,
/// };
/// use std::thread;
///
/// # fn main() -> Result<(), drbg_stream::Error> {
/// let drbg = DrbgBuilder::new(OsEntropy::default()).build()?;
/// let rng = Shared::new(BufferedRandom::new(drbg, false));
///
/// let worker = rng.clone();
/// let handle = thread::spawn(move || {
///     let mut buf = [0u8; 16];
///     worker.fill(&mut buf).map(|_| buf)
/// });
/// let mut buf = [0u8; 16];
/// rng.fill(&mut buf)?;
/// let theirs = handle.join().unwrap()?;
/// assert_ne!(buf, theirs);
/// # Ok(())
/// # }
/// ```
pub struct Shared<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Shared<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Run `f` with exclusive access to the component.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, Error> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    fn lock(&self) -> Result<MutexGuard<'_, T>, Error> {
        self.inner.lock().map_err(|_| {
            warn!("shared instance lock poisoned");
            Error::Poisoned
        })
    }
}

impl<R: Random> Shared<R> {
    pub fn fill(&self, dest: &mut [u8]) -> Result<(), Error> {
        self.lock()?.fill(dest)
    }

    pub fn reseed(&self, additional: Option<&[u8]>) -> Result<(), Error> {
        self.lock()?.reseed(additional)
    }

    pub fn set_seed(&self, seed: &[u8]) -> Result<(), Error> {
        self.lock()?.set_seed(seed)
    }

    pub fn generate_seed(&self, len: usize) -> Result<Vec<u8>, Error> {
        self.lock()?.generate_seed(len)
    }

    pub fn algorithm_name(&self) -> Result<String, Error> {
        Ok(self.lock()?.algorithm_name())
    }
}

impl<X: KeyedXof> Shared<XofStream<X>> {
    pub fn process(&self, input: &[u8], output: &mut [u8]) -> Result<(), Error> {
        self.lock()?.process(input, output)
    }

    pub fn apply_keystream(&self, data: &mut [u8]) -> Result<(), Error> {
        self.lock()?.apply_keystream(data)
    }

    pub fn reset(&self) -> Result<(), Error> {
        self.lock()?.reset()
    }
}
