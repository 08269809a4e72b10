// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::{BigUint, RandPrime};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Miller-Rabin rounds used to confirm each prime. 4⁻⁶⁴ = 2⁻¹²⁸.
pub const MILLER_RABIN_ROUNDS: usize = 64;

/// The two secret primes of a candidate modulus, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrimePair {
    pub p: BigUint,
    pub q: BigUint,
}

/// Draws a random prime of exactly `bits` bits.
///
/// `gen_prime` already runs its own probabilistic test; the extra rounds
/// bring the error probability below 2⁻¹²⁸.
pub fn generate_prime<R: RngCore + CryptoRng>(bits: usize, rng: &mut R) -> BigUint {
    loop {
        let candidate = rng.gen_prime(bits);
        if probably_prime(&candidate, MILLER_RABIN_ROUNDS) {
            return candidate;
        }
    }
}

/// Draws one candidate pair for an `n_bits` modulus.
///
/// Returns `None` when the pair is unusable: equal primes, a modulus of the
/// wrong size, or `gcd(pq, (p-1)(q-1)) != 1`.
pub fn candidate_pair<R: RngCore + CryptoRng>(n_bits: usize, rng: &mut R) -> Option<PrimePair> {
    let half = n_bits / 2;
    let p = generate_prime(half, rng);
    let q = generate_prime(n_bits - half, rng);

    if p == q {
        return None;
    }

    let n = &p * &q;
    if n.bits() != n_bits {
        return None;
    }

    let phi = (&p - BigUint::one()) * (&q - BigUint::one());
    if !n.gcd(&phi).is_one() {
        return None;
    }

    Some(PrimePair { p, q })
}
