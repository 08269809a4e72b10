// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

mod util;

use std::sync::Arc;

use crate::crypto::util::{l_function, mod_inverse};
use crate::error::{Error, Result};

use log::{debug, warn};
use num_bigint_dig::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public parameters of the cryptosystem.
///
/// The modulus is `n = pq`, the generator is fixed to `g = n + 1`, and `n²`
/// is cached since every encryption and homomorphic operation works mod `n²`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) n: BigUint,
    pub(crate) g: BigUint,
    pub(crate) n_squared: BigUint,

    /// Largest magnitude an encoded mantissa may carry, `n / 3 - 1`.
    pub(crate) max_int: BigUint,
}

impl PublicKey {
    /// Construct a public key from its modulus.
    ///
    /// The modulus must be odd and at least 3.
    pub fn from_n(n: BigUint) -> Result<Self> {
        if n.is_even() || n < BigUint::from(3u32) {
            return Err(Error::InvalidKeyFormat("modulus must be an odd integer >= 3".into()));
        }

        let g = &n + BigUint::one();
        let n_squared = &n * &n;
        let max_int = &n / BigUint::from(3u32) - BigUint::one();

        Ok(Self { n, g, n_squared, max_int })
    }

    /// Return the public modulus `n`.
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Return the generator `g = n + 1`.
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// Return the cached `n²`.
    pub fn n_squared(&self) -> &BigUint {
        &self.n_squared
    }

    /// Return the largest magnitude an encoding may represent.
    pub fn max_int(&self) -> &BigUint {
        &self.max_int
    }

    /// Return the bit length of the modulus.
    pub fn bit_length(&self) -> usize {
        self.n.bits()
    }
}

/// Two handles refer to the same key when they share an allocation or are equal.
pub(crate) fn same_key(a: &Arc<PublicKey>, b: &Arc<PublicKey>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

/// Secret key material.
///
/// Holds `λ = lcm(p-1, q-1)` and `μ = L(g^λ mod n²)⁻¹ mod n`. The primes are
/// not retained. Sensitive fields are zeroized on drop.
#[allow(missing_debug_implementations)]
#[derive(PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "expose-secret", derive(Debug))]
pub struct PrivateKey {
    #[zeroize(skip)]
    pub(crate) public_key: Arc<PublicKey>,
    pub(crate) lambda: BigUint,
    pub(crate) mu: BigUint,
}

impl PrivateKey {
    /// Construct a private key from `λ` and `μ`.
    ///
    /// Validates `μ · L(g^λ mod n²) ≡ 1 (mod n)`.
    pub fn new(public_key: Arc<PublicKey>, lambda: BigUint, mu: BigUint) -> Result<Self> {
        if lambda.is_zero() || mu.is_zero() || mu >= public_key.n {
            return Err(Error::InvalidKeyFormat("lambda and mu must lie in [1, n)".into()));
        }

        let x = public_key.g.modpow(&lambda, &public_key.n_squared);
        let l = l_function(&x, &public_key.n)
            .map_err(|_| Error::InvalidKeyFormat("lambda does not match the modulus".into()))?;

        if !((l * &mu) % &public_key.n).is_one() {
            return Err(Error::InvalidKeyFormat("mu is not the inverse of L(g^lambda)".into()));
        }

        Ok(Self { public_key, lambda, mu })
    }

    /// Derive the private key from the two secret primes of `n`.
    pub fn from_primes(public_key: Arc<PublicKey>, p: &BigUint, q: &BigUint) -> Result<Self> {
        if &(p * q) != public_key.n() {
            return Err(Error::InvalidKeyFormat("primes do not reconstruct the modulus".into()));
        }

        let lambda = (p - BigUint::one()).lcm(&(q - BigUint::one()));

        // With g = n + 1, L(g^λ mod n²) = λ mod n, so μ is simply λ⁻¹ mod n.
        let mu = mod_inverse(&lambda, public_key.n())
            .ok_or_else(|| Error::KeyGeneration("lambda is not invertible mod n".into()))?;

        Self::new(public_key, lambda, mu)
    }

    /// Return a reference to the associated public key.
    pub fn public_key(&self) -> &Arc<PublicKey> {
        &self.public_key
    }

    pub(crate) fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    pub(crate) fn mu(&self) -> &BigUint {
        &self.mu
    }
}

/// A complete key pair consisting of public and private components.
///
/// Secret material is zeroized when dropped.
#[allow(missing_debug_implementations)]
#[derive(PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "expose-secret", derive(Debug))]
pub struct KeyPair {
    #[zeroize(skip)]
    public: Arc<PublicKey>,
    secret: PrivateKey,
}

impl KeyPair {
    /// Generate a key pair with default parameters (2048-bit modulus).
    pub fn generate() -> Result<Self> {
        KeyPairBuilder::new().build()
    }

    /// Generate a key pair with a custom modulus size.
    pub fn generate_with_size(bit_length: usize) -> Result<Self> {
        KeyPairBuilder::new().bit_length(bit_length).build()
    }

    /// Assemble a key pair from an existing private key.
    pub fn from_private_key(secret: PrivateKey) -> Self {
        Self { public: Arc::clone(secret.public_key()), secret }
    }

    /// Return the public key.
    pub fn public_key(&self) -> &Arc<PublicKey> {
        &self.public
    }

    /// Return the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.secret
    }
}

/// Builder for generating key pairs with configurable parameters.
#[derive(Debug)]
pub struct KeyPairBuilder {
    bit_length: usize,
    max_attempts: usize,
}

impl KeyPairBuilder {
    /// Create a builder with default parameters.
    pub fn new() -> Self {
        Self { bit_length: Self::DEFAULT_BITS, max_attempts: Self::DEFAULT_MAX_ATTEMPTS }
    }

    pub const DEFAULT_BITS: usize = 2048;

    /// Minimum recommended for production (NIST/ENISA standard)
    pub const MIN_SECURE_BITS: usize = 2048;

    /// Prime pairs drawn before giving up.
    pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

    /// Absolute minimum enforced in production builds
    /// Can be bypassed with `allow-weak-keys` feature flag
    #[cfg(not(feature = "allow-weak-keys"))]
    pub const ABSOLUTE_MIN_BITS: usize = 512;

    #[cfg(feature = "allow-weak-keys")]
    pub const ABSOLUTE_MIN_BITS: usize = 128;

    /// Set the desired modulus bit length.
    pub fn bit_length(mut self, bits: usize) -> Self {
        self.bit_length = bits;
        self
    }

    /// Set how many prime pairs may be drawn before generation fails.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Generate the key pair using the operating system's CSPRNG.
    pub fn build(self) -> Result<KeyPair> {
        self.build_with_rng(&mut OsRng)
    }

    /// Generate the key pair drawing all randomness from `rng`.
    pub fn build_with_rng<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<KeyPair> {
        // Hard block dangerously small keys
        if self.bit_length < Self::ABSOLUTE_MIN_BITS {
            return Err(Error::InvalidKeySize {
                min: Self::ABSOLUTE_MIN_BITS,
                actual: self.bit_length,
            });
        }

        if self.bit_length < Self::MIN_SECURE_BITS {
            warn!(
                "{}-bit key is cryptographically weak, use {} bits minimum for production",
                self.bit_length,
                Self::MIN_SECURE_BITS
            );
        }

        debug!("generating a paillier keypair with keysize of {}", self.bit_length);

        for attempt in 1..=self.max_attempts {
            let Some(pair) = util::candidate_pair(self.bit_length, rng) else {
                debug!("prime pair rejected on attempt {attempt}, retrying");
                continue;
            };

            let public = Arc::new(PublicKey::from_n(&pair.p * &pair.q)?);
            let secret = PrivateKey::from_primes(Arc::clone(&public), &pair.p, &pair.q)?;

            debug!("keys generated after {attempt} attempt(s)");
            return Ok(KeyPair { public, secret });
        }

        Err(Error::KeyGeneration(format!(
            "no usable prime pair found in {} attempts",
            self.max_attempts
        )))
    }
}

impl Default for KeyPairBuilder {
    fn default() -> Self {
        Self::new()
    }
}
