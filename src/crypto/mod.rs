// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

mod decrypt;
mod encrypt;
pub(crate) mod util;

pub(crate) use encrypt::{obfuscator, random_unit, raw_encrypt};

use crate::ciphertext::EncryptedNumber;
use crate::encoding::{Encodable, EncodedNumber};
use crate::error::Result;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

/// Encrypts encoded plaintexts under a public key.
pub trait Encrypt {
    /// Encrypt with fresh randomness from the operating system.
    ///
    /// Two encryptions of the same plaintext yield unrelated ciphertexts.
    fn encrypt(&self, plaintext: &EncodedNumber) -> Result<EncryptedNumber> {
        self.encrypt_with_rng(plaintext, &mut OsRng)
    }

    /// Encrypt, drawing the obfuscation factor from `rng`.
    ///
    /// The plaintext must have been encoded under the same public key.
    fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        plaintext: &EncodedNumber,
        rng: &mut R,
    ) -> Result<EncryptedNumber>;

    /// Encode `value` at its natural exponent and encrypt it.
    fn encrypt_value<T: Encodable>(&self, value: T) -> Result<EncryptedNumber>;
}

/// Recovers encoded plaintexts from ciphertexts.
pub trait Decrypt {
    /// Recover the encoded plaintext, keeping the ciphertext's exponent.
    fn decrypt(&self, ciphertext: &EncryptedNumber) -> Result<EncodedNumber>;

    /// Decrypt and decode to the nearest double.
    fn decrypt_value(&self, ciphertext: &EncryptedNumber) -> Result<f64> {
        self.decrypt(ciphertext)?.decode()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]

    use std::sync::OnceLock;

    use crate::keypair::{KeyPair, KeyPairBuilder};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();
    static OTHER_KEYPAIR: OnceLock<KeyPair> = OnceLock::new();

    fn seeded(seed: u64) -> KeyPair {
        let mut rng = StdRng::seed_from_u64(seed);
        KeyPairBuilder::new().bit_length(512).build_with_rng(&mut rng).unwrap()
    }

    /// A 512-bit key pair shared by every test in the crate.
    pub fn keypair() -> &'static KeyPair {
        KEYPAIR.get_or_init(|| seeded(0x5eed))
    }

    /// A second, unrelated key pair for mismatch tests.
    pub fn other_keypair() -> &'static KeyPair {
        OTHER_KEYPAIR.get_or_init(|| seeded(0xf00d))
    }
}


#[cfg(test)]
mod test_decryption {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use super::test_support::{keypair, other_keypair};
    use super::*;
    use crate::Error;

    use num_bigint_dig::BigUint;

    #[test]
    fn roundtrip_values() {
        let keypair = keypair();
        for value in [0.0, 1.0, -1.0, 0.1, -123.456, 2.5e10, -7.0e-12, 3.14159] {
            let ciphertext = keypair.public_key().encrypt_value(value).unwrap();
            let decrypted = keypair.private_key().decrypt_value(&ciphertext).unwrap();
            assert_eq!(decrypted, value, "value {value}");
        }
    }

    #[test]
    fn roundtrip_integers() {
        let keypair = keypair();
        for value in [0i64, 1, -1, i64::MAX, i64::MIN] {
            let ciphertext = keypair.public_key().encrypt_value(value).unwrap();
            let decrypted = keypair.private_key().decrypt(&ciphertext).unwrap();
            assert_eq!(decrypted.decode_integer().unwrap(), value.into());
        }
    }

    #[test]
    fn decrypt_keeps_exponent() {
        let keypair = keypair();
        let ciphertext = keypair.public_key().encrypt_value(0.75f64).unwrap();
        let decrypted = keypair.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted.exponent(), ciphertext.exponent());
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let ciphertext = keypair().public_key().encrypt_value(2.5f64).unwrap();
        let result = other_keypair().private_key().decrypt(&ciphertext);
        assert!(matches!(result, Err(Error::Decryption(_))));
    }

    #[test]
    fn decrypt_rejects_non_residue() {
        let keypair = keypair();
        let key = keypair.public_key();

        for value in [BigUint::from(0u32), key.n().clone()] {
            let bogus = EncryptedNumber::new(Arc::clone(key), value, 0).unwrap();
            let result = keypair.decrypt(&bogus);
            assert!(matches!(result, Err(Error::Decryption(_))));
        }
    }
}
