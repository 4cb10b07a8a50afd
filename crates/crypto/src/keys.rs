//! Ed25519 key types for envelope signing.
//!
//! This module provides the key types used to sign and verify consensus
//! envelopes:
//!
//! - [`PublicKey`]: a 32-byte Ed25519 public key (verifying key)
//! - [`SecretKey`]: a 32-byte Ed25519 secret key (signing key)
//! - [`Signature`]: a 64-byte Ed25519 signature
//!
//! # Example
//!
//! ```
//! use drover_crypto::{SecretKey, PublicKey};
//!
//! let secret = SecretKey::generate();
//! let public = secret.public_key();
//!
//! let signature = secret.sign(b"message");
//! assert!(public.verify(b"message", &signature).is_ok());
//! ```

use crate::error::CryptoError;
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::fmt;

/// An Ed25519 public key (verifying key).
///
/// A node's identity on the wire is its public key bytes; log output shows
/// a short hex prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Creates a public key from raw 32-byte Ed25519 key material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the bytes do not
    /// represent a valid point on the Ed25519 curve.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(key))
    }

    /// Returns the raw 32-byte key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Verifies an Ed25519 signature over a message.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSignature`] if verification fails.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        use ed25519_dalek::Verifier;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.0
            .verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.as_bytes()[..6]))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

/// An Ed25519 secret key (signing key).
///
/// # Security
///
/// - The underlying key material is zeroized when this struct is dropped
///   (handled by `ed25519_dalek::SigningKey`).
/// - The `Debug` implementation does not reveal the key material.
pub struct SecretKey {
    inner: SigningKey,
}

impl SecretKey {
    /// Generates a new random secret key using the OS random number
    /// generator.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Self { inner: signing_key }
    }

    /// Creates a secret key from a 32-byte seed.
    ///
    /// Deterministic: the same seed always produces the same key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { inner: signing_key }
    }

    /// Creates a secret key from a hex-encoded 32-byte seed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSeed`] if the string is not 64 hex
    /// characters.
    pub fn from_hex_seed(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSeed)?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidSeed)?;
        Ok(Self::from_seed(&seed))
    }

    /// Signs a message, producing a 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        let signature = self.inner.sign(message);
        Signature(signature.to_bytes())
    }

    /// Derives the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.inner.verifying_key())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(..)")
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// The all-zero signature, used as a placeholder before signing.
    pub const ZERO: Self = Self([0u8; 64]);

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..6]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let secret = SecretKey::generate();
        let public = secret.public_key();

        let signature = secret.sign(b"message");
        assert!(public.verify(b"message", &signature).is_ok());
        assert!(public.verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let seed = [7u8; 32];
        let a = SecretKey::from_seed(&seed);
        let b = SecretKey::from_seed(&seed);
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_from_hex_seed() {
        let seed_hex = "07".repeat(32);
        let key = SecretKey::from_hex_seed(&seed_hex).unwrap();
        assert_eq!(key.public_key(), SecretKey::from_seed(&[7u8; 32]).public_key());

        assert!(SecretKey::from_hex_seed("abcd").is_err());
        assert!(SecretKey::from_hex_seed("zz").is_err());
    }

    #[test]
    fn test_wrong_key_rejects() {
        let secret = SecretKey::generate();
        let other = SecretKey::generate();

        let signature = secret.sign(b"message");
        assert!(other.public_key().verify(b"message", &signature).is_err());
    }
}
