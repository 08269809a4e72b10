#![no_main]

use libfuzzer_sys::fuzz_target;
use paillier::serialize::{private_key_from_json, public_key_from_json};
use paillier::{Decrypt, EncryptedNumber, KeyPair, KeyPairBuilder};

use std::sync::OnceLock;

static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let keypair = KEYPAIR.get_or_init(|| KeyPairBuilder::new().bit_length(512).build().unwrap());

    // Untrusted records must fail cleanly, never panic.
    let _ = public_key_from_json(json);
    let _ = private_key_from_json(json);

    if let Ok(ciphertext) = EncryptedNumber::from_json(keypair.public_key(), json) {
        assert!(ciphertext.ciphertext() < keypair.public_key().n_squared());
        let _ = keypair.decrypt(&ciphertext);

        // Extreme exponents must fail fast.
        let _ = ciphertext.to_json();
        let _ = ciphertext.add_scalar(1.5f64);
        let _ = ciphertext.mul_scalar(-2i64);
    }
});
