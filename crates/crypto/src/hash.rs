//! SHA-512/256 hashing utilities.
//!
//! All content addressing in the protocol uses SHA-512/256 over the
//! canonical XDR encoding of the artifact. This module provides the hash in
//! single-shot and streaming modes. All functions return [`Hash256`], a
//! 32-byte hash value.
//!
//! # Example
//!
//! ```
//! use drover_crypto::sha512_256;
//!
//! let hash = sha512_256(b"hello world");
//! assert_eq!(hash.as_bytes().len(), 32);
//! ```

use drover_common::Hash256;
use sha2::{Digest, Sha512_256};

/// Computes the SHA-512/256 hash of the given data.
///
/// This is a convenience function for single-shot hashing. For streaming
/// hashing of large or chunked data, use [`Sha512_256Hasher`] instead.
pub fn sha512_256(data: &[u8]) -> Hash256 {
    Hash256::hash(data)
}

/// Computes the SHA-512/256 hash of multiple data chunks.
///
/// This is equivalent to concatenating all chunks and hashing the result,
/// but avoids the memory allocation of creating an intermediate buffer.
///
/// # Example
///
/// ```
/// use drover_crypto::{sha512_256, sha512_256_multi};
///
/// let hash1 = sha512_256(b"helloworld");
/// let hash2 = sha512_256_multi(&[b"hello", b"world"]);
/// assert_eq!(hash1, hash2);
/// ```
pub fn sha512_256_multi(chunks: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha512_256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash256(bytes)
}

/// A streaming SHA-512/256 hasher for incremental hash computation.
///
/// Use this when you need to hash data that is not available all at once,
/// such as when serializing directly into the hasher.
///
/// # Example
///
/// ```
/// use drover_crypto::Sha512_256Hasher;
///
/// let mut hasher = Sha512_256Hasher::new();
/// hasher.update(b"chunk 1");
/// hasher.update(b"chunk 2");
/// let hash = hasher.finalize();
/// ```
pub struct Sha512_256Hasher {
    inner: Sha512_256,
}

impl Sha512_256Hasher {
    /// Creates a new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha512_256::new(),
        }
    }

    /// Feeds data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consumes the hasher and returns the computed hash.
    pub fn finalize(self) -> Hash256 {
        let result = self.inner.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Hash256(bytes)
    }
}

impl Default for Sha512_256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha512_256() {
        // NIST test vector for SHA-512/256
        let hash = sha512_256(b"abc");
        assert_eq!(
            hash.to_hex(),
            "53048e2681941ef99b2e29b76b4c7dabe4c2d0c634fc6d46e0e2f13107e7af23"
        );
    }

    #[test]
    fn test_sha512_256_empty() {
        let hash = sha512_256(b"");
        assert_eq!(
            hash.to_hex(),
            "c672b8d1ef56ed28ab87c3622c5114069bdd3ad7b8f9737498d0c01ecef0967a"
        );
    }

    #[test]
    fn test_sha512_256_multi() {
        let hash1 = sha512_256(b"helloworld");
        let hash2 = sha512_256_multi(&[b"hello", b"world"]);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_streaming_hasher() {
        let mut hasher = Sha512_256Hasher::new();
        hasher.update(b"hello");
        hasher.update(b"world");
        let hash = hasher.finalize();

        assert_eq!(hash, sha512_256(b"helloworld"));
    }
}
