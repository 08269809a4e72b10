// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Paillier Cryptosystem
//!
//! Probabilistic public-key encryption with additive homomorphism, based on
//! the decisional composite residuosity assumption over n = pq.
//!
//! Reference: [Paillier (1999), EUROCRYPT](https://link.springer.com/chapter/10.1007/3-540-48910-X_16)
//!
//! Plaintexts are signed integers or doubles, encoded as a mantissa and a
//! base-16 exponent. Ciphertexts under the same key can be added together,
//! offset by a plaintext, or scaled by a plaintext without decrypting.
//!
//! ## Security
//!
//! The private key (λ, μ) is zeroized on drop via the `zeroize` crate.
//! Keys shorter than [`KeyPairBuilder::MIN_SECURE_BITS`] are accepted with a
//! warning.
//!
//! ## Example
//!
//! ```rust,no_run
//! use paillier::{Decrypt, Encrypt, KeyPairBuilder};
//!
//! let keypair = KeyPairBuilder::new().bit_length(2048).build().expect("key generation failed");
//! let public_key = keypair.public_key();
//!
//! let a = public_key.encrypt_value(2.5f64).expect("encryption failed");
//! let b = public_key.encrypt_value(4.75f64).expect("encryption failed");
//!
//! let sum = a.add_encrypted(&b).expect("addition failed");
//! let doubled = sum.mul_scalar(2i64).expect("multiplication failed");
//!
//! assert_eq!(keypair.decrypt_value(&sum).expect("decryption failed"), 7.25);
//! assert_eq!(keypair.decrypt_value(&doubled).expect("decryption failed"), 14.5);
//! ```

mod ciphertext;
mod crypto;
mod encoding;
mod error;
mod keypair;
pub mod serialize;

pub use ciphertext::EncryptedNumber;
pub use crypto::{Decrypt, Encrypt};
pub use encoding::{BASE, Encodable, EncodedNumber, PrecisionPolicy};
pub use error::{Error, Result};
pub use keypair::{KeyPair, KeyPairBuilder, PrivateKey, PublicKey};
pub use serialize::{CiphertextRecord, PrivateKeyRecord, PublicKeyRecord};
