//! Hash function helpers
//!
//! SHA-256 backs the codec checksum and account IDs, SHA-512-half is the
//! message digest for secp256k1 signatures, and RIPEMD-160 finishes the
//! account ID hash.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

/// SHA-256 digest (32 bytes)
pub type Sha256Hash = [u8; 32];

/// Create a SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Sha256Hash {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice
pub fn double_sha256(data: &[u8]) -> Sha256Hash {
    sha256(&sha256(data))
}

/// Four-byte codec checksum: first 4 bytes of double SHA-256
pub fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = double_sha256(data);
    [digest[0], digest[1], digest[2], digest[3]]
}

/// First 32 bytes of SHA-512
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut half = [0u8; 32];
    half.copy_from_slice(&digest[..32]);
    half
}

/// RIPEMD-160 of SHA-256, the account ID hash
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha512_half_is_prefix_of_sha512() {
        // SHA-512("abc") begins with ddaf35a193617aba...
        let half = sha512_half(b"abc");
        assert_eq!(
            hex::encode(half),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a"
        );
    }

    #[test]
    fn test_checksum_is_double_sha_prefix() {
        let data = b"validator";
        assert_eq!(checksum(data).as_slice(), &double_sha256(data)[..4]);
    }

    #[test]
    fn test_hash160_length_and_determinism() {
        let a = hash160(b"key");
        assert_eq!(a.len(), 20);
        assert_eq!(a, hash160(b"key"));
        assert_ne!(a, hash160(b"other"));
    }
}
