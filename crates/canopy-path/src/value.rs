//! The path integer.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use std::fmt;

/// An arbitrary-precision, non-negative path integer.
///
/// Membership is exact divisibility: a node is on the route when its value
/// divides the path, and a target when the square of its value does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathValue(BigUint);

impl PathValue {
    /// The empty path. Divisible by no node value.
    pub fn one() -> Self {
        Self(BigUint::one())
    }

    /// Decode from big-endian magnitude bytes.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    /// Big-endian magnitude bytes, no sign.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// `value | path`: the node is on the route.
    pub fn contains(&self, value: u64) -> bool {
        value != 0 && (&self.0 % value).is_zero()
    }

    /// `value² | path`: the node is an intended target.
    pub fn targets(&self, value: u64) -> bool {
        if value < 2 || self.0.is_zero() {
            return false;
        }
        let value = BigUint::from(value);
        (&self.0 % (&value * &value)).is_zero()
    }

    /// How many times `value` divides the path.
    pub fn multiplicity(&self, value: u64) -> u32 {
        if value < 2 || self.0.is_zero() {
            return 0;
        }
        let mut rest = self.0.clone();
        let mut count = 0;
        loop {
            let (quotient, remainder) = rest.div_rem(&BigUint::from(value));
            if !remainder.is_zero() {
                return count;
            }
            rest = quotient;
            count += 1;
        }
    }

    /// Multiply `value` in once.
    pub fn mul_value(&mut self, value: u64) {
        self.0 *= value;
    }

    /// Divide `value` out once. Returns false and leaves the path untouched
    /// when `value` does not divide it.
    pub fn div_value(&mut self, value: u64) -> bool {
        if !self.contains(value) {
            return false;
        }
        self.0 /= value;
        true
    }

    /// Least common multiple of two paths.
    pub fn lcm(&self, other: &PathValue) -> PathValue {
        PathValue(self.0.lcm(&other.0))
    }

    /// Size in bits.
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl Default for PathValue {
    fn default() -> Self {
        Self::one()
    }
}

impl From<u64> for PathValue {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for PathValue {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes_be()))
    }
}
