//! SHA256 double-hashing and related digests.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Double SHA256: SHA256(SHA256(data)).
///
/// This is used for transaction IDs, signature digests and the
/// proof-of-work commitment of every mined character.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Single SHA256 hash.
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// RIPEMD160(SHA256(data)), the public key hash used by P2PKH.
#[inline]
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let hash = Ripemd160::digest(sha256(data));
    let mut result = [0u8; 20];
    result.copy_from_slice(&hash);
    result
}

/// Reverse the byte order of a 32-byte array.
///
/// Transaction ids and proof-of-work digests are displayed (and compared as
/// integers) in reverse byte order.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> alloc::string::String {
    hex::encode(reverse_bytes(hash))
}

/// Count leading zero bits of the hash read as a reversed-byte integer.
///
/// The most significant byte of that integer is the LAST byte of the
/// internal digest, so zeros are counted from the end of the array.
pub fn count_leading_zeros(hash: &[u8; 32]) -> u32 {
    let mut zeros = 0u32;
    for byte in hash.iter().rev() {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256() {
        let hash = double_sha256(b"hello");

        let expected = hex::decode(
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        ).unwrap();

        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_hash160_empty() {
        let expected = hex::decode("b472a266d0bd89c13706a4132ccfb16f7c3b9fcb").unwrap();
        assert_eq!(hash160(b"").as_slice(), expected.as_slice());
    }

    #[test]
    fn test_count_leading_zeros() {
        assert_eq!(count_leading_zeros(&[0x00; 32]), 256);

        let mut hash = [0xFF; 32];
        hash[31] = 0x00;
        hash[30] = 0x00;
        hash[29] = 0x03; // 6 leading zeros in this byte
        assert_eq!(count_leading_zeros(&hash), 22);
    }

    #[test]
    fn test_reverse_bytes() {
        let mut original = [0u8; 32];
        for (i, b) in original.iter_mut().enumerate() {
            *b = i as u8 + 1;
        }
        let reversed = reverse_bytes(&original);

        assert_eq!(reversed[0], 0x20);
        assert_eq!(reversed[31], 0x01);
    }

    #[test]
    fn test_display_hex_is_reversed() {
        let mut hash = [0u8; 32];
        hash[31] = 0xab;
        assert!(hash_to_display_hex(&hash).starts_with("ab00"));
    }
}
