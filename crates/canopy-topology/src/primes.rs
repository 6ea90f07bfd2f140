//! Prime generation for node values.
//!
//! Values stay small relative to the number of nodes (the n-th prime is
//! roughly `n ln n`), so trial division is plenty.

/// Primality by trial division over `6k ± 1`.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5u64;
    while i <= n / i {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Smallest prime strictly greater than `after`.
///
/// `next_prime(0) == 2`, `next_prime(2) == 3`.
pub fn next_prime(after: u64) -> u64 {
    let mut candidate = after.saturating_add(1).max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}
