//! The blake2b hash with the CKB personalization.

use blake2b_ref::{Blake2b, Blake2bBuilder};

/// Output length of the default hash.
pub const BLAKE2B_LEN: usize = 32;
/// The personalization every CKB consensus hash uses.
pub const CKB_HASH_PERSONALIZATION: &[u8] = b"ckb-default-hash";

/// Creates a new blake2b hasher with the CKB personalization.
pub fn new_blake2b() -> Blake2b {
    Blake2bBuilder::new(BLAKE2B_LEN)
        .personal(CKB_HASH_PERSONALIZATION)
        .build()
}

/// Hashes `s` and returns the 32-byte digest.
pub fn blake2b_256<T: AsRef<[u8]>>(s: T) -> [u8; 32] {
    let mut result = [0u8; BLAKE2B_LEN];
    let mut blake2b = new_blake2b();
    blake2b.update(s.as_ref());
    blake2b.finalize(&mut result);
    result
}

/// Hashes `s` and returns the digest truncated to 20 bytes, the form used
/// for lock args and multisig key hashes.
pub fn blake2b_160<T: AsRef<[u8]>>(s: T) -> [u8; 20] {
    let mut result = [0u8; 20];
    result.copy_from_slice(&blake2b_256(s)[..20]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash() {
        let result = blake2b_256([]);
        let expect = "44f4c69744d5f8c55d642062949dcae49bc4e7ef43d388c5a12f42b5633d163e";
        assert_eq!(faster_hex::hex_string(&result), expect);
    }

    #[test]
    fn blake160_is_a_prefix() {
        let full = blake2b_256(b"ckb");
        assert_eq!(blake2b_160(b"ckb"), full[..20]);
    }
}
