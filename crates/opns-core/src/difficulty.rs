//! Proof-of-work difficulty predicate for mined characters.
//!
//! A character `c` mined under a record whose commitment is `prior` is valid
//! when `dsha256(prior || c || nonce)`, read as a big integer in reversed
//! byte order and shifted right by `256 - DIFFICULTY`, equals zero.

use alloc::vec::Vec;
use crate::hash::{count_leading_zeros, double_sha256};

/// Protocol difficulty in leading zero bits.
pub const DIFFICULTY: u32 = 22;

/// Length of a proof-of-work nonce in bytes.
pub const NONCE_SIZE: usize = 32;

/// Build the proof-of-work preimage `prior || character || nonce`.
pub fn pow_preimage(prior: &[u8], character: u8, nonce: &[u8; NONCE_SIZE]) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(prior.len() + 1 + NONCE_SIZE);
    preimage.extend_from_slice(prior);
    preimage.push(character);
    preimage.extend_from_slice(nonce);
    preimage
}

/// Compute the proof-of-work digest for a nonce.
#[inline]
pub fn pow_digest(prior: &[u8], character: u8, nonce: &[u8; NONCE_SIZE]) -> [u8; 32] {
    double_sha256(&pow_preimage(prior, character, nonce))
}

/// Check whether a digest meets the given difficulty.
///
/// Equivalent to `int(reverse(hash)) >> (256 - difficulty) == 0`.
#[inline]
pub fn meets_difficulty(hash: &[u8; 32], difficulty: u32) -> bool {
    count_leading_zeros(hash) >= difficulty
}

/// Verify a nonce, returning the digest when it meets the difficulty.
pub fn verify_pow(
    prior: &[u8],
    character: u8,
    nonce: &[u8; NONCE_SIZE],
    difficulty: u32,
) -> Option<[u8; 32]> {
    let hash = pow_digest(prior, character, nonce);
    meets_difficulty(&hash, difficulty).then_some(hash)
}

/// Estimate average attempts needed to find a nonce at a difficulty.
pub fn expected_attempts(difficulty: u32) -> f64 {
    let mut attempts = 1.0f64;
    for _ in 0..difficulty {
        attempts *= 2.0;
    }
    attempts
}

/// Format a hash rate for display (e.g., "1.23 MH/s").
pub fn format_hash_rate(hashes_per_second: f64) -> alloc::string::String {
    if hashes_per_second >= 1e9 {
        alloc::format!("{:.2} GH/s", hashes_per_second / 1e9)
    } else if hashes_per_second >= 1e6 {
        alloc::format!("{:.2} MH/s", hashes_per_second / 1e6)
    } else if hashes_per_second >= 1e3 {
        alloc::format!("{:.2} KH/s", hashes_per_second / 1e3)
    } else {
        alloc::format!("{:.2} H/s", hashes_per_second)
    }
}
