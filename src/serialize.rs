// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON records exchanged with the command line layer.
//!
//! Keys use a JWK-like shape (`kty = "DAJ"`, `alg = "PAI-GN1"`) with big
//! integers as unpadded base64url of their big-endian bytes. A ciphertext is
//! `{"v": "<decimal>", "e": <exponent>}`, always emitted at an exponent of
//! at most [`CANONICAL_EXPONENT`].

use std::sync::Arc;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use log::debug;
use num_bigint_dig::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ciphertext::EncryptedNumber;
use crate::error::{Error, Result};
use crate::keypair::{KeyPair, PrivateKey, PublicKey};

pub const KEY_TYPE: &str = "DAJ";
pub const ALGORITHM: &str = "PAI-GN1";
pub const OP_ENCRYPT: &str = "encrypt";
pub const OP_DECRYPT: &str = "decrypt";

/// Every serialized ciphertext carries at least this much precision.
pub const CANONICAL_EXPONENT: i32 = -32;

/// URL-safe alphabet, no padding on output, padding tolerated on input.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode an unsigned integer as base64url of its minimal big-endian bytes.
pub fn int_to_base64(value: &BigUint) -> String {
    if value.is_zero() {
        return String::new();
    }
    BASE64_URL.encode(value.to_bytes_be())
}

/// Decode base64url (padded or not) into an unsigned integer.
pub fn base64_to_int(encoded: &str) -> Result<BigUint> {
    let bytes = BASE64_URL
        .decode(encoded)
        .map_err(|e| Error::InvalidKeyFormat(format!("bad base64url integer: {e}")))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Serialized public key.
///
/// Fields are optional so that missing entries surface as
/// [`Error::InvalidKeyFormat`] rather than a generic parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default)]
    pub key_ops: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl PublicKeyRecord {
    /// Parse the record without validating its contents.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidKeyFormat(e.to_string()))
    }

    /// Serialize as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidKeyFormat(e.to_string()))
    }

    /// Validate the record and rebuild the public key.
    pub fn to_public_key(&self) -> Result<Arc<PublicKey>> {
        debug!("loading public key");

        let alg = self.alg.as_deref().ok_or_else(|| invalid("public key is missing alg"))?;
        if alg != ALGORITHM {
            return Err(invalid(format!("unsupported algorithm {alg:?}")));
        }
        if self.kty.as_deref() != Some(KEY_TYPE) {
            return Err(invalid("public key kty must be DAJ"));
        }

        let n = self.n.as_deref().ok_or_else(|| invalid("public key is missing n"))?;
        Ok(Arc::new(PublicKey::from_n(base64_to_int(n)?)?))
    }
}

/// Serialized private key, embedding its public key under `pub`.
#[allow(missing_debug_implementations)]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "expose-secret", derive(Debug))]
pub struct PrivateKeyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(default)]
    pub key_ops: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mu: Option<String>,
    #[zeroize(skip)]
    #[serde(default, rename = "pub", skip_serializing_if = "Option::is_none")]
    pub public: Option<PublicKeyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl PrivateKeyRecord {
    /// Parse the record without validating its contents.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidKeyFormat(e.to_string()))
    }

    /// Serialize as compact JSON. The output contains `λ` and `μ`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidKeyFormat(e.to_string()))
    }

    /// Return the embedded public key record.
    pub fn extract_public(&self) -> Result<&PublicKeyRecord> {
        let public = self.public.as_ref().ok_or_else(|| invalid("private key is missing pub"))?;
        if self.kty.as_deref() != Some(KEY_TYPE) {
            return Err(invalid("private key kty must be DAJ"));
        }
        Ok(public)
    }

    /// Validate the record and rebuild the private key.
    pub fn to_private_key(&self) -> Result<PrivateKey> {
        let public_key = self.extract_public()?.to_public_key()?;

        debug!("loading private key");
        if !self.key_ops.iter().any(|op| op == OP_DECRYPT) {
            return Err(invalid("private key key_ops must contain decrypt"));
        }

        let mu = self.mu.as_deref().ok_or_else(|| invalid("private key is missing mu"))?;
        let lambda =
            self.lambda.as_deref().ok_or_else(|| invalid("private key is missing lambda"))?;

        PrivateKey::new(public_key, base64_to_int(lambda)?, base64_to_int(mu)?)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidKeyFormat(message.into())
}

impl PublicKey {
    /// Export as a `PAI-GN1` record labelled with `kid`.
    pub fn to_record(&self, kid: impl Into<String>) -> PublicKeyRecord {
        PublicKeyRecord {
            kty: Some(KEY_TYPE.into()),
            alg: Some(ALGORITHM.into()),
            key_ops: vec![OP_ENCRYPT.into()],
            n: Some(int_to_base64(self.n())),
            kid: Some(kid.into()),
        }
    }
}

impl PrivateKey {
    /// Export the secret key. This is the only path by which `λ` and `μ`
    /// leave the process.
    pub fn to_record(
        &self,
        kid: impl Into<String>,
        public_kid: impl Into<String>,
    ) -> PrivateKeyRecord {
        PrivateKeyRecord {
            kty: Some(KEY_TYPE.into()),
            key_ops: vec![OP_DECRYPT.into()],
            lambda: Some(int_to_base64(self.lambda())),
            mu: Some(int_to_base64(self.mu())),
            public: Some(self.public_key().to_record(public_kid)),
            kid: Some(kid.into()),
        }
    }
}

/// Parse a public key from its JSON record.
pub fn public_key_from_json(json: &str) -> Result<Arc<PublicKey>> {
    PublicKeyRecord::from_json(json)?.to_public_key()
}

/// Parse a private key from its JSON record.
pub fn private_key_from_json(json: &str) -> Result<PrivateKey> {
    PrivateKeyRecord::from_json(json)?.to_private_key()
}

/// Parse a private key record into a full key pair.
pub fn keypair_from_json(json: &str) -> Result<KeyPair> {
    Ok(KeyPair::from_private_key(private_key_from_json(json)?))
}

/// Parse a ciphertext record and bind it to `public_key`.
pub fn ciphertext_from_json(public_key: &Arc<PublicKey>, json: &str) -> Result<EncryptedNumber> {
    EncryptedNumber::from_json(public_key, json)
}

/// Serialized ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextRecord {
    /// Ciphertext integer in decimal.
    pub v: String,
    /// Base-16 exponent.
    pub e: i32,
}

impl CiphertextRecord {
    /// Parse `{"v": ..., "e": ...}`; both fields are required.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidCiphertext(e.to_string()))
    }

    /// Serialize as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidCiphertext(e.to_string()))
    }
}

impl EncryptedNumber {
    /// Export as a record, first lowering the exponent to
    /// [`CANONICAL_EXPONENT`] when it is above it.
    pub fn to_record(&self) -> Result<CiphertextRecord> {
        let canonical = if self.exponent() > CANONICAL_EXPONENT {
            self.decrease_exponent_to(CANONICAL_EXPONENT)?
        } else {
            debug!("exponent {} is already below {CANONICAL_EXPONENT}", self.exponent());
            self.clone()
        };

        Ok(CiphertextRecord { v: canonical.ciphertext().to_string(), e: canonical.exponent() })
    }

    /// Rebuild a ciphertext under `public_key` from its record.
    pub fn from_record(public_key: &Arc<PublicKey>, record: &CiphertextRecord) -> Result<Self> {
        if record.v.is_empty() || !record.v.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCiphertext("v must be a decimal integer".into()));
        }

        let value: BigUint = record
            .v
            .parse()
            .map_err(|_| Error::InvalidCiphertext("v must be a decimal integer".into()))?;

        EncryptedNumber::new(Arc::clone(public_key), value, record.e)
    }

    /// Serialize through [`to_record`](Self::to_record).
    ///
    /// Fails with [`Error::PrecisionLoss`] when the exponent is too far above
    /// [`CANONICAL_EXPONENT`] to be lowered under this key.
    pub fn to_json(&self) -> Result<String> {
        self.to_record()?.to_json()
    }

    /// Parse a ciphertext record and bind it to `public_key`.
    pub fn from_json(public_key: &Arc<PublicKey>, json: &str) -> Result<Self> {
        Self::from_record(public_key, &CiphertextRecord::from_json(json)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::crypto::test_support::{keypair, other_keypair};
    use crate::crypto::{Decrypt, Encrypt};

    use serde_json::{Value, json};

    #[test]
    fn base64_known_vectors() {
        assert_eq!(int_to_base64(&BigUint::from(65537u32)), "AQAB");
        assert_eq!(int_to_base64(&BigUint::from(255u32)), "_w");
        assert_eq!(int_to_base64(&BigUint::from(0u32)), "");

        assert_eq!(base64_to_int("AQAB").unwrap(), BigUint::from(65537u32));
        assert_eq!(base64_to_int("_w").unwrap(), BigUint::from(255u32));
        assert_eq!(base64_to_int("_w==").unwrap(), BigUint::from(255u32));
        assert_eq!(base64_to_int("").unwrap(), BigUint::from(0u32));
    }

    #[test]
    fn base64_rejects_standard_alphabet() {
        assert!(matches!(base64_to_int("/w"), Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn public_record_shape() {
        let record = keypair().public_key().to_record("test key");
        let value: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(value["kty"], "DAJ");
        assert_eq!(value["alg"], "PAI-GN1");
        assert_eq!(value["key_ops"], json!(["encrypt"]));
        assert_eq!(value["kid"], "test key");
        assert_eq!(
            base64_to_int(value["n"].as_str().unwrap()).unwrap(),
            *keypair().public_key().n()
        );
    }

    #[test]
    fn public_key_roundtrip() {
        let json = keypair().public_key().to_record("k").to_json().unwrap();
        let loaded = public_key_from_json(&json).unwrap();
        assert_eq!(&loaded, keypair().public_key());
    }

    #[test]
    fn public_key_requires_alg() {
        let mut value: Value =
            serde_json::from_str(&keypair().public_key().to_record("k").to_json().unwrap())
                .unwrap();
        value.as_object_mut().unwrap().remove("alg");

        let result = public_key_from_json(&value.to_string());
        assert!(matches!(result, Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn public_key_rejects_wrong_alg_or_kty() {
        let mut record = keypair().public_key().to_record("k");
        record.alg = Some("RSA-OAEP".into());
        assert!(matches!(record.to_public_key(), Err(Error::InvalidKeyFormat(_))));

        let mut record = keypair().public_key().to_record("k");
        record.kty = Some("RSA".into());
        assert!(matches!(record.to_public_key(), Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn public_key_rejects_garbage_json() {
        assert!(matches!(public_key_from_json("{\"alg\": 5}"), Err(Error::InvalidKeyFormat(_))));
        assert!(matches!(public_key_from_json("not json"), Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn private_record_shape() {
        let record = keypair().private_key().to_record("secret", "public");
        let value: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(value["kty"], "DAJ");
        assert_eq!(value["key_ops"], json!(["decrypt"]));
        assert_eq!(value["kid"], "secret");
        assert_eq!(value["pub"]["kid"], "public");
        assert_eq!(value["pub"]["alg"], "PAI-GN1");
        assert!(value["lambda"].is_string());
        assert!(value["mu"].is_string());
    }

    #[test]
    fn private_key_roundtrip_decrypts() {
        let json = keypair().private_key().to_record("s", "p").to_json().unwrap();
        let loaded = keypair_from_json(&json).unwrap();

        let ciphertext = keypair().public_key().encrypt_value(-12.125f64).unwrap();
        let rebound = EncryptedNumber::new(
            Arc::clone(loaded.public_key()),
            ciphertext.ciphertext().clone(),
            ciphertext.exponent(),
        )
        .unwrap();

        assert_eq!(loaded.decrypt_value(&rebound).unwrap(), -12.125);
        // Equal keys are interchangeable even without sharing an allocation.
        assert_eq!(loaded.decrypt_value(&ciphertext).unwrap(), -12.125);
    }

    #[test]
    fn private_key_requires_decrypt_op() {
        let mut record = keypair().private_key().to_record("s", "p");
        record.key_ops = vec!["encrypt".into()];
        assert!(matches!(record.to_private_key(), Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn private_key_requires_all_fields() {
        let base: Value = serde_json::from_str(
            &keypair().private_key().to_record("s", "p").to_json().unwrap(),
        )
        .unwrap();

        for field in ["pub", "kty", "key_ops", "mu", "lambda"] {
            let mut value = base.clone();
            value.as_object_mut().unwrap().remove(field);

            let result = private_key_from_json(&value.to_string());
            assert!(matches!(result, Err(Error::InvalidKeyFormat(_))), "missing {field}");
        }
    }

    #[test]
    fn private_key_rejects_mismatched_mu() {
        let mut record = keypair().private_key().to_record("s", "p");
        record.mu = other_keypair().private_key().to_record("s", "p").mu.clone();
        assert!(matches!(record.to_private_key(), Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn extract_public_returns_nested_record() {
        let record = keypair().private_key().to_record("s", "p");
        let public = record.extract_public().unwrap();
        assert_eq!(public, &keypair().public_key().to_record("p"));
    }

    #[test]
    fn ciphertext_is_canonicalized_to_minus_32() {
        let ciphertext = keypair().public_key().encrypt_value(3.14159f64).unwrap();
        assert!(ciphertext.exponent() > CANONICAL_EXPONENT);

        let record = ciphertext.to_record().unwrap();
        assert_eq!(record.e, CANONICAL_EXPONENT);

        let loaded = EncryptedNumber::from_record(keypair().public_key(), &record).unwrap();
        let value = keypair().decrypt_value(&loaded).unwrap();
        assert!((value - 3.14159).abs() < 2f64.powi(-32));
    }

    #[test]
    fn fine_exponents_are_emitted_as_is() {
        let ciphertext = keypair().public_key().encrypt_value(1.0e-30f64).unwrap();
        assert!(ciphertext.exponent() <= CANONICAL_EXPONENT);

        let record = ciphertext.to_record().unwrap();
        assert_eq!(record.e, ciphertext.exponent());
        assert_eq!(record.v, ciphertext.ciphertext().to_string());
    }

    #[test]
    fn ciphertext_json_shape() {
        let ciphertext = keypair().public_key().encrypt_value(1i64).unwrap();
        let value: Value = serde_json::from_str(&ciphertext.to_json().unwrap()).unwrap();

        assert!(value["v"].is_string());
        assert_eq!(value["e"], json!(-32));
    }

    #[test]
    fn ciphertext_json_roundtrip() {
        let key = keypair().public_key();
        let ciphertext = key.encrypt_value(-0.5f64).unwrap();
        let loaded = ciphertext_from_json(key, &ciphertext.to_json().unwrap()).unwrap();
        assert_eq!(keypair().decrypt_value(&loaded).unwrap(), -0.5);
    }

    #[test]
    fn ciphertext_record_rejects_bad_values() {
        let key = keypair().public_key();

        for v in ["", "12a", "-5", " 7"] {
            let record = CiphertextRecord { v: v.into(), e: -32 };
            let result = EncryptedNumber::from_record(key, &record);
            assert!(matches!(result, Err(Error::InvalidCiphertext(_))), "v = {v:?}");
        }

        let too_big = CiphertextRecord { v: key.n_squared().to_string(), e: -32 };
        let result = EncryptedNumber::from_record(key, &too_big);
        assert!(matches!(result, Err(Error::InvalidCiphertext(_))));
    }

    #[test]
    fn extreme_record_exponents_fail_fast() {
        let key = keypair().public_key();
        let v = key.encrypt_value(1.5f64).unwrap().ciphertext().to_string();

        let high = CiphertextRecord { v: v.clone(), e: i32::MAX };
        let high = EncryptedNumber::from_record(key, &high).unwrap();
        assert!(matches!(high.to_json(), Err(Error::PrecisionLoss(_))));
        assert!(matches!(high.add_scalar(1.5), Err(Error::PrecisionLoss(_))));

        let low = CiphertextRecord { v, e: i32::MIN };
        let low = EncryptedNumber::from_record(key, &low).unwrap();
        assert!(matches!(low.add_scalar(1.5), Err(Error::PrecisionLoss(_))));

        let record = low.to_record().unwrap();
        assert_eq!(record.e, i32::MIN);
        let reloaded = ciphertext_from_json(key, &record.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, low);
    }

    #[test]
    fn ciphertext_record_requires_both_fields() {
        let key = keypair().public_key();
        assert!(matches!(
            EncryptedNumber::from_json(key, "{\"v\": \"1\"}"),
            Err(Error::InvalidCiphertext(_))
        ));
        assert!(matches!(
            EncryptedNumber::from_json(key, "{\"e\": -32}"),
            Err(Error::InvalidCiphertext(_))
        ));
    }
}
