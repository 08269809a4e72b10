// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Errors that can occur during key handling, encoding and homomorphic operations.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid key size: must be at least {min} bits, got {actual}")]
    InvalidKeySize { min: usize, actual: usize },

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Precision loss: {0}")]
    PrecisionLoss(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Encoded value overflowed the representable range")]
    EncodingOverflow,

    #[error("Cannot encode NaN or infinite values")]
    NonFiniteValue,

    #[error("Ciphertext is invalid or corrupted: {0}")]
    InvalidCiphertext(String),
}

pub type Result<T> = std::result::Result<T, Error>;
