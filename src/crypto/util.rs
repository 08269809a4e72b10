// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use num_bigint_dig::{BigUint, ModInverse};
use num_integer::Integer;
use num_traits::One;

use crate::{Error, Result};

/// L(x) = (x - 1) / n
///
/// The division is exact only when `x ≡ 1 (mod n)`, which holds for
/// `x = c^λ mod n²` whenever `c` is a valid ciphertext under the key.
/// Anything else is reported as a structurally invalid ciphertext.
#[inline]
pub fn l_function(x: &BigUint, n: &BigUint) -> Result<BigUint> {
    let (quotient, remainder) = x.div_rem(n);
    if !remainder.is_one() {
        return Err(Error::Decryption("L(x) undefined: x is not 1 mod n".into()));
    }
    Ok(quotient)
}

/// Computes modular inverse a⁻¹ mod m.
///
/// Returns `None` when `a` and `m` are not coprime.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    a.mod_inverse(m)?.to_biguint()
}

/// Computes `base^exponent` exactly.
pub fn pow_of(base: u32, exponent: u32) -> BigUint {
    num_traits::pow(BigUint::from(base), exponent as usize)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn l_function_divides_exactly() {
        let n = BigUint::from(35u32);
        let x = BigUint::from(3u32 * 35 + 1);
        assert_eq!(l_function(&x, &n).unwrap(), BigUint::from(3u32));
    }

    #[test]
    fn l_function_rejects_non_unit_residue() {
        let n = BigUint::from(35u32);
        assert!(matches!(l_function(&BigUint::from(72u32), &n), Err(Error::Decryption(_))));
        assert!(matches!(l_function(&BigUint::from(0u32), &n), Err(Error::Decryption(_))));
    }

    #[test]
    fn mod_inverse_of_coprime_values() {
        let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(11u32)).unwrap();
        assert_eq!(inv, BigUint::from(4u32));
    }

    #[test]
    fn mod_inverse_fails_when_not_coprime() {
        assert!(mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)).is_none());
    }

    #[test]
    fn pow_of_base_sixteen() {
        assert_eq!(pow_of(16, 0), BigUint::one());
        assert_eq!(pow_of(16, 3), BigUint::from(4096u32));
    }
}
