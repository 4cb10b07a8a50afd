//! Canonical XDR wire encoding and the protocol vocabulary for drover.
//!
//! Everything agreed on by the network — transaction sets, quorum sets,
//! consensus values, envelopes — is identified by the SHA-512/256 hash of
//! its canonical encoding, so the encoding must be deterministic down to the
//! byte. This crate provides:
//!
//! - [`WriteXdr`] / [`ReadXdr`]: big-endian XDR serialization (RFC 4506)
//!   with strict whole-buffer decoding
//! - The protocol types: [`FbaEnvelope`], [`FbaBallot`], [`StellarValue`],
//!   [`QuorumSet`], [`TransactionEnvelope`], [`TransactionSet`],
//!   [`StellarMessage`] and friends
//!
//! # Example
//!
//! ```
//! use drover_xdr::{ReadXdr, StellarValue, WriteXdr};
//! use drover_common::Hash256;
//!
//! let value = StellarValue {
//!     tx_set_hash: Hash256::hash(b"txset"),
//!     close_time: 1_700_000_000,
//!     base_fee: 10,
//! };
//! let bytes = value.to_xdr().unwrap();
//! let decoded = StellarValue::from_xdr(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

mod codec;
mod types;

pub use codec::{ReadXdr, WriteXdr, XdrError};
pub use types::{
    hash_xdr, AccountId, FbaBallot, FbaEnvelope, FbaStatement, FbaStatementType, LedgerHeader,
    LedgerHeaderInfo, MessageType, NodeId, Operation, QuorumSet, SequenceNumber, SlotIndex,
    StellarMessage, StellarValue, TimePoint, TransactionEnvelope, TransactionSet, Value,
};
