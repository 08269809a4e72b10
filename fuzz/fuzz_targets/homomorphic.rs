#![no_main]

use libfuzzer_sys::fuzz_target;
use paillier::{Decrypt, Encrypt, Error, KeyPair, KeyPairBuilder};

use std::sync::OnceLock;

static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    if data.len() < 28 {
        return;
    }
    let keypair = KEYPAIR.get_or_init(|| KeyPairBuilder::new().bit_length(512).build().unwrap());
    let public_key = keypair.public_key();

    let a = i32::from_be_bytes(data[0..4].try_into().unwrap()) as i64;
    let b = i32::from_be_bytes(data[4..8].try_into().unwrap()) as i64;
    let k = i32::from_be_bytes(data[8..12].try_into().unwrap()) as i64;

    let ca = public_key.encrypt_value(a).unwrap();
    let cb = public_key.encrypt_value(b).unwrap();

    let sum = ca.add_encrypted(&cb).unwrap();
    assert_eq!(keypair.decrypt(&sum).unwrap().decode_integer().unwrap(), (a + b).into());

    let offset = ca.add_scalar(k).unwrap();
    assert_eq!(keypair.decrypt(&offset).unwrap().decode_integer().unwrap(), (a + k).into());

    let scaled = ca.mul_scalar(k).unwrap();
    assert_eq!(keypair.decrypt(&scaled).unwrap().decode_integer().unwrap(), (a * k).into());

    // Mixed exponents align before adding.
    let half = public_key.encrypt_value(0.5f64).unwrap();
    let mixed = ca.add_encrypted(&half).unwrap();
    assert_eq!(keypair.decrypt_value(&mixed).unwrap(), a as f64 + 0.5);

    // Floats of any magnitude either align exactly or refuse.
    let x = f64::from_be_bytes(data[12..20].try_into().unwrap());
    let y = f64::from_be_bytes(data[20..28].try_into().unwrap());
    if !x.is_finite() || !y.is_finite() {
        return;
    }
    let cx = public_key.encrypt_value(x).unwrap();
    let cy = public_key.encrypt_value(y).unwrap();
    match cx.add_encrypted(&cy) {
        Ok(sum) => {
            let gap = (cx.exponent() - cy.exponent()).unsigned_abs();
            // Below 16 hex digits of alignment both 53-bit mantissas fit.
            if gap < 16 {
                let expected = x + y;
                if expected.is_normal() {
                    assert_eq!(keypair.decrypt_value(&sum).unwrap(), expected);
                }
            }
        }
        Err(e) => assert!(matches!(e, Error::PrecisionLoss(_)), "{e}"),
    }
});
