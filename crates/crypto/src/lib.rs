//! Cryptographic primitives for drover.
//!
//! Two concerns live here:
//!
//! - **Hashing**: SHA-512/256 over canonical encodings, the content-address
//!   of every artifact on the wire. Single-shot, multi-chunk and streaming
//!   variants are provided (see [`hash`]).
//! - **Keys**: Ed25519 signing and verification for consensus envelopes
//!   (see [`keys`]).

mod error;
pub mod hash;
pub mod keys;

pub use error::CryptoError;
pub use hash::{sha512_256, sha512_256_multi, Sha512_256Hasher};
pub use keys::{PublicKey, SecretKey, Signature};
