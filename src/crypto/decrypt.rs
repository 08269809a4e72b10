// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use super::{Decrypt, util};
use crate::ciphertext::EncryptedNumber;
use crate::encoding::EncodedNumber;
use crate::error::{Error, Result};
use crate::keypair::{KeyPair, PrivateKey, same_key};

impl Decrypt for PrivateKey {
    fn decrypt(&self, ciphertext: &EncryptedNumber) -> Result<EncodedNumber> {
        // Ensure the ciphertext was produced for this key.
        if !same_key(ciphertext.public_key(), &self.public_key) {
            return Err(Error::Decryption(
                "ciphertext was encrypted under a different public key".into(),
            ));
        }

        let n = self.public_key.n();
        let n_squared = self.public_key.n_squared();

        let c = ciphertext.ciphertext();
        if c >= n_squared {
            return Err(Error::Decryption("ciphertext is not below n²".into()));
        }

        // m = L(c^λ mod n²) · μ mod n
        let x = c.modpow(self.lambda(), n_squared);
        let l = util::l_function(&x, n)?;
        let m = (l * self.mu()) % n;

        EncodedNumber::new(Arc::clone(&self.public_key), m, ciphertext.exponent())
    }
}

impl Decrypt for KeyPair {
    fn decrypt(&self, ciphertext: &EncryptedNumber) -> Result<EncodedNumber> {
        self.private_key().decrypt(ciphertext)
    }
}
