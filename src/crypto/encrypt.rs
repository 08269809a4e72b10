// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use super::Encrypt;
use crate::ciphertext::EncryptedNumber;
use crate::encoding::{Encodable, EncodedNumber};
use crate::error::{Error, Result};
use crate::keypair::{KeyPair, PublicKey, same_key};

use num_bigint_dig::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};

impl Encrypt for Arc<PublicKey> {
    fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        plaintext: &EncodedNumber,
        rng: &mut R,
    ) -> Result<EncryptedNumber> {
        if !same_key(self, plaintext.public_key()) {
            return Err(Error::InvalidOperation(
                "plaintext was encoded under a different public key".into(),
            ));
        }

        let r = random_unit(self, rng);
        let c = raw_encrypt(self, plaintext.encoding(), Some(&r));

        Ok(EncryptedNumber::from_raw(Arc::clone(self), c, plaintext.exponent()))
    }

    fn encrypt_value<T: Encodable>(&self, value: T) -> Result<EncryptedNumber> {
        self.encrypt(&EncodedNumber::encode(self, value)?)
    }
}

impl Encrypt for KeyPair {
    fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        plaintext: &EncodedNumber,
        rng: &mut R,
    ) -> Result<EncryptedNumber> {
        self.public_key().encrypt_with_rng(plaintext, rng)
    }

    fn encrypt_value<T: Encodable>(&self, value: T) -> Result<EncryptedNumber> {
        self.public_key().encrypt_value(value)
    }
}

/// c = (1 + m·n) · r^n mod n²
///
/// With `g = n + 1` the binomial theorem gives `g^m ≡ 1 + m·n (mod n²)`,
/// so no exponentiation is needed for the message part. Passing `None` for
/// `r` skips the obfuscator, which is only sound when the result is folded
/// into an already randomized ciphertext.
pub(crate) fn raw_encrypt(key: &PublicKey, m: &BigUint, r: Option<&BigUint>) -> BigUint {
    let nude = (m * &key.n + BigUint::one()) % &key.n_squared;
    match r {
        Some(r) => (nude * obfuscator(key, r)) % &key.n_squared,
        None => nude,
    }
}

/// r^n mod n²
pub(crate) fn obfuscator(key: &PublicKey, r: &BigUint) -> BigUint {
    r.modpow(&key.n, &key.n_squared)
}

/// Sample `r` uniformly from `[1, n)` with `gcd(r, n) = 1`.
pub(crate) fn random_unit<R: RngCore + CryptoRng>(key: &PublicKey, rng: &mut R) -> BigUint {
    loop {
        let r = rng.gen_biguint_range(&BigUint::one(), &key.n);
        if r.gcd(&key.n).is_one() {
            return r;
        }
    }
}
