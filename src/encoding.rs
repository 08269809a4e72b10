// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-point encoding of signed numbers into the plaintext space `ℤ_n`.
//!
//! A value `v` is represented as `mantissa · BASE^exponent`. The mantissa is
//! stored modulo `n`: non-negative mantissas up to `max_int` map to
//! themselves, negative ones to `n + mantissa`. The band in between is never
//! produced by an encoder and only appears when homomorphic arithmetic
//! overflows, so decoding it is an error rather than a silent wrap.

use std::sync::Arc;

use num_bigint_dig::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::crypto::util::pow_of;
use crate::error::{Error, Result};
use crate::keypair::PublicKey;

/// Base of the exponent. Powers of two keep float scaling exact.
pub const BASE: u32 = 16;

/// `log2(BASE)`.
pub const LOG2_BASE: i32 = 4;

/// Significand bits of an IEEE 754 double, including the implicit bit.
pub const FLOAT_MANTISSA_BITS: i32 = 53;

/// What to do when encoding at a fixed exponent would discard digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionPolicy {
    /// Fail with [`Error::PrecisionLoss`].
    #[default]
    Strict,
    /// Round half to even and carry on.
    Truncate,
}

/// A plaintext number that can be encoded under a public key.
pub trait Encodable: Copy {
    /// The largest exponent at which the value is still represented exactly.
    fn natural_exponent(&self) -> Result<i32>;

    /// Returns `round(self / BASE^exponent)`.
    ///
    /// Under [`PrecisionPolicy::Strict`] any non-zero remainder is an error.
    /// A result wider than `max_bits` fails with [`Error::PrecisionLoss`]
    /// before it is computed.
    fn scaled_mantissa(
        &self,
        exponent: i32,
        policy: PrecisionPolicy,
        max_bits: usize,
    ) -> Result<BigInt>;
}

impl Encodable for i64 {
    fn natural_exponent(&self) -> Result<i32> {
        Ok(0)
    }

    fn scaled_mantissa(
        &self,
        exponent: i32,
        policy: PrecisionPolicy,
        max_bits: usize,
    ) -> Result<BigInt> {
        let magnitude = BigUint::from(self.unsigned_abs());
        scale_dyadic(*self < 0, magnitude, 0, exponent, policy, max_bits)
    }
}

impl Encodable for f64 {
    fn natural_exponent(&self) -> Result<i32> {
        let (_, mantissa, exp2) = decompose_f64(*self)?;
        let lsb_exponent = if mantissa == 0 {
            -FLOAT_MANTISSA_BITS
        } else {
            // Matches frexp: normalise the significand to 53 bits.
            let bit_len = 64 - mantissa.leading_zeros() as i32;
            exp2 + bit_len - FLOAT_MANTISSA_BITS
        };
        Ok(lsb_exponent.div_euclid(LOG2_BASE))
    }

    fn scaled_mantissa(
        &self,
        exponent: i32,
        policy: PrecisionPolicy,
        max_bits: usize,
    ) -> Result<BigInt> {
        let (negative, mantissa, exp2) = decompose_f64(*self)?;
        scale_dyadic(negative, BigUint::from(mantissa), exp2, exponent, policy, max_bits)
    }
}

/// Splits a finite double into `(negative, significand, exp2)` such that
/// `|v| = significand · 2^exp2`.
fn decompose_f64(value: f64) -> Result<(bool, u64, i32)> {
    if !value.is_finite() {
        return Err(Error::NonFiniteValue);
    }

    let bits = value.to_bits();
    let negative = bits >> 63 == 1;
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);

    Ok(if biased == 0 {
        (negative, fraction, -1074)
    } else {
        (negative, fraction | (1u64 << 52), biased - 1075)
    })
}

/// Computes `round(±magnitude · 2^exp2 / BASE^exponent)`.
///
/// Shift widths are checked against `max_bits` and the operand size before
/// any shift is performed, so extreme exponents cost no allocation.
fn scale_dyadic(
    negative: bool,
    magnitude: BigUint,
    exp2: i32,
    exponent: i32,
    policy: PrecisionPolicy,
    max_bits: usize,
) -> Result<BigInt> {
    if magnitude.is_zero() {
        return Ok(BigInt::zero());
    }

    let shift = exp2 as i64 - LOG2_BASE as i64 * exponent as i64;
    let bits = magnitude.bits() as i64;

    let scaled = if shift >= 0 {
        if bits + shift > max_bits as i64 {
            return Err(Error::PrecisionLoss(format!(
                "mantissa needs {} bits, only {max_bits} available at exponent {exponent}",
                bits + shift
            )));
        }
        magnitude << shift as usize
    } else if -shift > bits {
        // Everything is dropped and the remainder is below one half.
        if policy == PrecisionPolicy::Strict {
            return Err(Error::PrecisionLoss(format!(
                "value is not representable at exponent {exponent}"
            )));
        }
        BigUint::zero()
    } else {
        let drop = (-shift) as usize;
        let quotient = &magnitude >> drop;
        let remainder = &magnitude - (&quotient << drop);

        if remainder.is_zero() {
            quotient
        } else if policy == PrecisionPolicy::Strict {
            return Err(Error::PrecisionLoss(format!(
                "value is not representable at exponent {exponent}"
            )));
        } else {
            let half = BigUint::one() << (drop - 1);
            if remainder > half || (remainder == half && quotient.is_odd()) {
                quotient + BigUint::one()
            } else {
                quotient
            }
        }
    };

    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok(BigInt::from_biguint(sign, scaled))
}

/// Computes `±magnitude · 2^exp2` as the nearest double.
fn dyadic_to_f64(negative: bool, magnitude: &BigUint, exp2: i64) -> f64 {
    let bits = magnitude.bits();
    let (top, exp2) = if bits > 64 {
        let shift = bits - 64;
        let top = magnitude >> shift;
        // Sticky bit keeps round-to-nearest correct after the truncation.
        let sticky = &top << shift != *magnitude;
        let top = top.to_u64().unwrap_or(u64::MAX) | u64::from(sticky);
        (top, exp2 + shift as i64)
    } else {
        (magnitude.to_u64().unwrap_or(u64::MAX), exp2)
    };

    let value = scale_by_power_of_two(top as f64, exp2);
    if negative { -value } else { value }
}

fn scale_by_power_of_two(mut value: f64, mut exp2: i64) -> f64 {
    const STEP: i64 = 1000;

    while exp2 > STEP && value.is_finite() {
        value *= 2f64.powi(STEP as i32);
        exp2 -= STEP;
    }
    while exp2 < -STEP && value != 0.0 {
        value *= 2f64.powi(-STEP as i32);
        exp2 += STEP;
    }
    value * 2f64.powi(exp2.clamp(-STEP, STEP) as i32)
}

/// A plaintext number encoded for a particular public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedNumber {
    public_key: Arc<PublicKey>,
    encoding: BigUint,
    exponent: i32,
}

impl EncodedNumber {
    /// Wrap a raw encoding.
    ///
    /// The encoding must lie in `[0, n)`.
    pub fn new(public_key: Arc<PublicKey>, encoding: BigUint, exponent: i32) -> Result<Self> {
        if &encoding >= public_key.n() {
            return Err(Error::EncodingOverflow);
        }
        Ok(Self { public_key, encoding, exponent })
    }

    /// Encode `value` at its natural exponent, without rounding.
    pub fn encode<T: Encodable>(public_key: &Arc<PublicKey>, value: T) -> Result<Self> {
        let exponent = value.natural_exponent()?;
        let mantissa =
            value.scaled_mantissa(exponent, PrecisionPolicy::Strict, budget(public_key))?;
        Self::from_mantissa(public_key, &mantissa, exponent)
    }

    /// Encode `value` at `min(natural exponent, max_exponent)`.
    ///
    /// Lowering the exponent only adds digits, so this never rounds.
    pub fn encode_with_max_exponent<T: Encodable>(
        public_key: &Arc<PublicKey>,
        value: T,
        max_exponent: i32,
    ) -> Result<Self> {
        let exponent = value.natural_exponent()?.min(max_exponent);
        let mantissa =
            value.scaled_mantissa(exponent, PrecisionPolicy::Strict, budget(public_key))?;
        Self::from_mantissa(public_key, &mantissa, exponent)
    }

    /// Encode `value` at exactly `exponent`.
    ///
    /// If the exponent is above the value's natural exponent, low-order
    /// digits are lost and `policy` decides whether that is an error.
    pub fn encode_at<T: Encodable>(
        public_key: &Arc<PublicKey>,
        value: T,
        exponent: i32,
        policy: PrecisionPolicy,
    ) -> Result<Self> {
        let mantissa = value.scaled_mantissa(exponent, policy, budget(public_key))?;
        Self::from_mantissa(public_key, &mantissa, exponent)
    }

    /// Encode a signed mantissa, rejecting magnitudes above `max_int`.
    pub fn from_mantissa(
        public_key: &Arc<PublicKey>,
        mantissa: &BigInt,
        exponent: i32,
    ) -> Result<Self> {
        let (sign, magnitude) = (mantissa.sign(), mantissa_magnitude(mantissa));
        if &magnitude > public_key.max_int() {
            return Err(Error::PrecisionLoss(format!(
                "mantissa needs {} bits, only {} available at exponent {exponent}",
                magnitude.bits(),
                public_key.max_int().bits()
            )));
        }

        let encoding = if sign == Sign::Minus && !magnitude.is_zero() {
            public_key.n() - magnitude
        } else {
            magnitude
        };

        Ok(Self { public_key: Arc::clone(public_key), encoding, exponent })
    }

    /// Return the public key this number was encoded for.
    pub fn public_key(&self) -> &Arc<PublicKey> {
        &self.public_key
    }

    /// Return the raw encoding in `[0, n)`.
    pub fn encoding(&self) -> &BigUint {
        &self.encoding
    }

    /// Return the base-16 exponent.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Recover the signed mantissa.
    ///
    /// Encodings in the band `(max_int, n - max_int)` are the result of an
    /// overflow and fail with [`Error::EncodingOverflow`].
    pub fn decode_integer(&self) -> Result<BigInt> {
        let n = self.public_key.n();
        let max_int = self.public_key.max_int();

        if &self.encoding >= n {
            Err(Error::EncodingOverflow)
        } else if &self.encoding <= max_int {
            Ok(BigInt::from_biguint(Sign::Plus, self.encoding.clone()))
        } else if self.encoding >= n - max_int {
            Ok(BigInt::from_biguint(Sign::Minus, n - &self.encoding))
        } else {
            Err(Error::EncodingOverflow)
        }
    }

    /// Decode to the nearest double.
    ///
    /// Values beyond the range of `f64` fail with [`Error::EncodingOverflow`].
    pub fn decode(&self) -> Result<f64> {
        let mantissa = self.decode_integer()?;
        let exp2 = LOG2_BASE as i64 * self.exponent as i64;
        let value =
            dyadic_to_f64(mantissa.sign() == Sign::Minus, &mantissa_magnitude(&mantissa), exp2);

        if !value.is_finite() {
            return Err(Error::EncodingOverflow);
        }
        Ok(value)
    }

    /// Rescale to a lower exponent by multiplying the mantissa by
    /// `BASE^(exponent - new_exponent)`.
    pub fn decrease_exponent_to(&self, new_exponent: i32) -> Result<Self> {
        let factor = exponent_factor(&self.public_key, self.exponent, new_exponent)?;
        let mantissa = self.decode_integer()? * BigInt::from_biguint(Sign::Plus, factor);
        Self::from_mantissa(&self.public_key, &mantissa, new_exponent)
    }
}

fn mantissa_magnitude(mantissa: &BigInt) -> BigUint {
    mantissa.abs().to_biguint().unwrap_or_default()
}

/// Bit budget of a mantissa under `public_key`.
fn budget(public_key: &PublicKey) -> usize {
    public_key.max_int().bits()
}

/// Returns the rescaling factor `BASE^(from - to)`.
///
/// Fails with [`Error::PrecisionLoss`] when `to > from`, or when the factor
/// itself exceeds `max_int`. The width is checked before the power is built.
pub(crate) fn exponent_factor(public_key: &PublicKey, from: i32, to: i32) -> Result<BigUint> {
    if to > from {
        return Err(Error::PrecisionLoss(format!(
            "cannot raise exponent from {from} to {to} without losing digits"
        )));
    }

    let gap = from as i64 - to as i64;
    if gap * LOG2_BASE as i64 >= budget(public_key) as i64 {
        return Err(Error::PrecisionLoss(format!(
            "exponent gap {from} -> {to} exceeds the key's headroom"
        )));
    }

    // gap < max_int.bits() / 4 here, so it fits in a u32.
    let factor = pow_of(BASE, gap as u32);
    if &factor > public_key.max_int() {
        return Err(Error::PrecisionLoss(format!(
            "exponent gap {from} -> {to} exceeds the key's headroom"
        )));
    }
    Ok(factor)
}

impl PublicKey {
    /// Encode `value` under this key at its natural exponent.
    pub fn encode<T: Encodable>(self: &Arc<Self>, value: T) -> Result<EncodedNumber> {
        EncodedNumber::encode(self, value)
    }
}
