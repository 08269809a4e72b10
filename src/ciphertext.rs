// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use num_bigint_dig::BigUint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::crypto::util::mod_inverse;
use crate::crypto::{obfuscator, random_unit, raw_encrypt};
use crate::encoding::{Encodable, EncodedNumber, exponent_factor};
use crate::error::{Error, Result};
use crate::keypair::{PublicKey, same_key};

/// An encrypted fixed-point number.
///
/// Homomorphic operations only need the public key. Operands must share it,
/// and are rescaled to a common exponent before they are combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedNumber {
    public_key: Arc<PublicKey>,
    ciphertext: BigUint,
    exponent: i32,
}

impl EncryptedNumber {
    /// Wrap a raw ciphertext, which must lie in `[0, n²)`.
    pub fn new(public_key: Arc<PublicKey>, ciphertext: BigUint, exponent: i32) -> Result<Self> {
        if &ciphertext >= public_key.n_squared() {
            return Err(Error::InvalidCiphertext("value is not below n²".into()));
        }
        Ok(Self { public_key, ciphertext, exponent })
    }

    pub(crate) fn from_raw(public_key: Arc<PublicKey>, ciphertext: BigUint, exponent: i32) -> Self {
        Self { public_key, ciphertext, exponent }
    }

    pub fn public_key(&self) -> &Arc<PublicKey> {
        &self.public_key
    }

    /// Return the raw ciphertext integer.
    pub fn ciphertext(&self) -> &BigUint {
        &self.ciphertext
    }

    /// Return the base-16 exponent.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Multiply in a fresh `r^n`, producing an unlinkable ciphertext of the
    /// same plaintext.
    pub fn obfuscate(&self) -> Self {
        self.obfuscate_with_rng(&mut OsRng)
    }

    /// Like [`obfuscate`](Self::obfuscate), drawing `r` from `rng`.
    pub fn obfuscate_with_rng<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Self {
        let key = &self.public_key;
        let r = random_unit(key, rng);
        let ciphertext = (&self.ciphertext * obfuscator(key, &r)) % key.n_squared();
        Self::from_raw(Arc::clone(key), ciphertext, self.exponent)
    }

    /// Lower the exponent to `new_exponent` by raising the ciphertext to
    /// `BASE^(exponent - new_exponent)`, which multiplies the plaintext.
    ///
    /// Raising the exponent would require dividing the plaintext, which is
    /// not possible homomorphically, and fails with [`Error::PrecisionLoss`].
    /// So does a factor above `max_int`, which would wrap the plaintext
    /// modulo `n`.
    pub fn decrease_exponent_to(&self, new_exponent: i32) -> Result<Self> {
        let factor = exponent_factor(&self.public_key, self.exponent, new_exponent)?;
        let ciphertext = self.ciphertext.modpow(&factor, self.public_key.n_squared());
        Ok(Self::from_raw(Arc::clone(&self.public_key), ciphertext, new_exponent))
    }

    /// E(a) · E(b) = E(a + b)
    pub fn add_encrypted(&self, other: &EncryptedNumber) -> Result<Self> {
        self.ensure_same_key(&other.public_key)?;

        let exponent = self.exponent.min(other.exponent);
        let a = self.decrease_exponent_to(exponent)?;
        let b = other.decrease_exponent_to(exponent)?;

        Ok(a.raw_add(&b.ciphertext))
    }

    /// Add a plaintext that is already encoded under the same key.
    ///
    /// The plaintext is folded in without an obfuscator; the result inherits
    /// the randomness of `self`.
    pub fn add_encoded(&self, encoded: &EncodedNumber) -> Result<Self> {
        self.ensure_same_key(encoded.public_key())?;

        let exponent = self.exponent.min(encoded.exponent());
        let a = self.decrease_exponent_to(exponent)?;
        let b = encoded.decrease_exponent_to(exponent)?;

        let plain = raw_encrypt(&self.public_key, b.encoding(), None);
        Ok(a.raw_add(&plain))
    }

    /// Add an unencrypted scalar.
    pub fn add_scalar<T: Encodable>(&self, value: T) -> Result<Self> {
        let encoded =
            EncodedNumber::encode_with_max_exponent(&self.public_key, value, self.exponent)?;
        self.add_encoded(&encoded)
    }

    /// Subtract an unencrypted scalar.
    pub fn sub_scalar<T: Encodable>(&self, value: T) -> Result<Self> {
        let encoded =
            EncodedNumber::encode_with_max_exponent(&self.public_key, value, self.exponent)?;
        let negated = EncodedNumber::from_mantissa(
            &self.public_key,
            &-encoded.decode_integer()?,
            encoded.exponent(),
        )?;
        self.add_encoded(&negated)
    }

    /// E(a) - E(b) = E(a) · E(b)⁻¹
    pub fn sub_encrypted(&self, other: &EncryptedNumber) -> Result<Self> {
        self.add_encrypted(&other.negate()?)
    }

    /// E(a)^k = E(a · k)
    ///
    /// The scalar is encoded at its natural exponent, and the result's
    /// exponent is the sum of both exponents.
    pub fn mul_scalar<T: Encodable>(&self, value: T) -> Result<Self> {
        let encoded = EncodedNumber::encode(&self.public_key, value)?;
        self.mul_encoded(&encoded)
    }

    /// Multiply by a plaintext that is already encoded under the same key.
    pub fn mul_encoded(&self, encoded: &EncodedNumber) -> Result<Self> {
        self.ensure_same_key(encoded.public_key())?;

        let exponent = self.exponent.checked_add(encoded.exponent()).ok_or_else(|| {
            Error::InvalidOperation("product exponent is out of range".into())
        })?;

        let ciphertext = self.raw_mul(encoded.encoding())?;
        Ok(Self::from_raw(Arc::clone(&self.public_key), ciphertext, exponent))
    }

    /// Paillier is only additively homomorphic; this always fails.
    pub fn mul_encrypted(&self, _other: &EncryptedNumber) -> Result<Self> {
        Err(Error::UnsupportedOperation("cannot multiply two encrypted numbers".into()))
    }

    /// E(a)⁻¹ = E(-a)
    pub fn negate(&self) -> Result<Self> {
        let inverse = mod_inverse(&self.ciphertext, self.public_key.n_squared())
            .ok_or_else(|| Error::InvalidCiphertext("ciphertext is not invertible".into()))?;
        Ok(Self::from_raw(Arc::clone(&self.public_key), inverse, self.exponent))
    }

    fn raw_add(&self, other: &BigUint) -> Self {
        let ciphertext = (&self.ciphertext * other) % self.public_key.n_squared();
        Self::from_raw(Arc::clone(&self.public_key), ciphertext, self.exponent)
    }

    /// c^k mod n²
    ///
    /// Scalars in the negative range are applied as `(c⁻¹)^(n - k)` so the
    /// exponent stays as small as the scalar's magnitude.
    fn raw_mul(&self, k: &BigUint) -> Result<BigUint> {
        let key = &self.public_key;
        let n_squared = key.n_squared();

        if k >= &(key.n() - key.max_int()) {
            let inverse = mod_inverse(&self.ciphertext, n_squared)
                .ok_or_else(|| Error::InvalidCiphertext("ciphertext is not invertible".into()))?;
            Ok(inverse.modpow(&(key.n() - k), n_squared))
        } else {
            Ok(self.ciphertext.modpow(k, n_squared))
        }
    }

    fn ensure_same_key(&self, other: &Arc<PublicKey>) -> Result<()> {
        if !same_key(&self.public_key, other) {
            return Err(Error::InvalidOperation(
                "operands were encrypted under different public keys".into(),
            ));
        }
        Ok(())
    }
}

impl Add for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn add(self, rhs: Self) -> Self::Output {
        self.add_encrypted(rhs)
    }
}

impl Add<f64> for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn add(self, rhs: f64) -> Self::Output {
        self.add_scalar(rhs)
    }
}

impl Add<i64> for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn add(self, rhs: i64) -> Self::Output {
        self.add_scalar(rhs)
    }
}

impl Add<&EncodedNumber> for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn add(self, rhs: &EncodedNumber) -> Self::Output {
        self.add_encoded(rhs)
    }
}

impl Sub for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.sub_encrypted(rhs)
    }
}

impl Sub<f64> for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn sub(self, rhs: f64) -> Self::Output {
        self.sub_scalar(rhs)
    }
}

impl Sub<i64> for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn sub(self, rhs: i64) -> Self::Output {
        self.sub_scalar(rhs)
    }
}

impl Mul<f64> for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn mul(self, rhs: f64) -> Self::Output {
        self.mul_scalar(rhs)
    }
}

impl Mul<i64> for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn mul(self, rhs: i64) -> Self::Output {
        self.mul_scalar(rhs)
    }
}

impl Mul for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn mul(self, rhs: Self) -> Self::Output {
        self.mul_encrypted(rhs)
    }
}

impl Neg for &EncryptedNumber {
    type Output = Result<EncryptedNumber>;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}
