#![no_main]

use libfuzzer_sys::fuzz_target;
use paillier::{Decrypt, Encrypt, KeyPair, KeyPairBuilder};
use std::sync::OnceLock;

static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let Some(bytes) = data.get(..8) else {
        return;
    };
    let bytes: [u8; 8] = bytes.try_into().unwrap();

    let keypair = KEYPAIR.get_or_init(|| KeyPairBuilder::new().bit_length(512).build().unwrap());
    let public_key = keypair.public_key();

    // Integers decode exactly.
    let integer = i64::from_be_bytes(bytes);
    let ciphertext = public_key.encrypt_value(integer).unwrap();
    let decrypted = keypair.decrypt(&ciphertext).unwrap();
    assert_eq!(decrypted.decode_integer().unwrap(), integer.into());

    // Every finite double survives the round trip bit for bit.
    let float = f64::from_be_bytes(bytes);
    if !float.is_finite() {
        assert!(public_key.encrypt_value(float).is_err());
        return;
    }
    let Ok(ciphertext) = public_key.encrypt_value(float) else {
        return;
    };
    let decrypted = keypair.decrypt_value(&ciphertext).unwrap();
    assert_eq!(decrypted, float);
});
