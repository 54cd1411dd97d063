//! Hash algorithm strategies for the ring.
//!
//! A [`HashAlgorithm`] turns arbitrary key bytes into a digest of at least
//! four bytes; the ring interprets the first four bytes of that digest as a
//! big-endian `u32` ring position. Any deterministic, total function of at
//! least four output bytes is a legal implementation — SHA-1 and MD5 are
//! provided because they're what the source material used, not because
//! cryptographic strength matters here.

use md5::Digest as _;
use sha1::Digest as _;

/// Strategy for turning key bytes into a digest used to place virtual nodes
/// on the ring.
///
/// Implementations must be deterministic (same input always yields the same
/// output) and must return at least four bytes; the ring only reads the
/// first four.
pub trait HashAlgorithm: Send + Sync {
    /// Hashes `data`, returning a digest of at least four bytes.
    fn compute(&self, data: &[u8]) -> Vec<u8>;

    /// Name used in diagnostics and `Debug` output.
    fn name(&self) -> &'static str;
}

/// Interprets the first four bytes of `digest` as a big-endian `u32` ring
/// position. Panics if `digest` has fewer than four bytes — a contract
/// violation of [`HashAlgorithm::compute`], not a runtime condition callers
/// are expected to handle.
pub fn ring_position(digest: &[u8]) -> u32 {
    assert!(
        digest.len() >= 4,
        "HashAlgorithm::compute must return at least 4 bytes, got {}",
        digest.len()
    );
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// SHA-1 hashing (20-byte digest).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Algorithm;

impl HashAlgorithm for Sha1Algorithm {
    fn compute(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = sha1::Sha1::new();
        hasher.update(data);
        hasher.finalize().to_vec()
    }

    fn name(&self) -> &'static str {
        "SHA1"
    }
}

/// MD5 hashing (16-byte digest).
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Algorithm;

impl HashAlgorithm for Md5Algorithm {
    fn compute(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = md5::Md5::new();
        hasher.update(data);
        hasher.finalize().to_vec()
    }

    fn name(&self) -> &'static str {
        "MD5"
    }
}
