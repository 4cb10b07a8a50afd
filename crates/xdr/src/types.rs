//! FBA protocol wire types.
//!
//! These are the artifacts the network agrees on. Each type carries a
//! canonical encoding via [`WriteXdr`]/[`ReadXdr`]; content hashes are
//! SHA-512/256 over that encoding.

use std::fmt;
use std::io::{Read, Write};

use drover_common::Hash256;
use drover_crypto::Signature;

use crate::codec::{read_var_opaque, write_var_opaque, ReadXdr, WriteXdr, XdrError};

/// Account sequence number.
pub type SequenceNumber = i64;

/// One consensus slot per ledger.
pub type SlotIndex = u64;

/// Unix time in seconds.
pub type TimePoint = u64;

/// Compute the content hash of a value's canonical encoding.
pub fn hash_xdr<T: WriteXdr>(value: &T) -> Result<Hash256, XdrError> {
    Ok(Hash256::hash(&value.to_xdr()?))
}

impl WriteXdr for Hash256 {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.0.write_xdr(w)
    }
}

impl ReadXdr for Hash256 {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Hash256(<[u8; 32]>::read_xdr(r)?))
    }
}

impl WriteXdr for Signature {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.0.write_xdr(w)
    }
}

impl ReadXdr for Signature {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Signature(<[u8; 64]>::read_xdr(r)?))
    }
}

/// A node's identity: its Ed25519 public key bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Short hex prefix for log output.
    pub fn to_short_hex(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_short_hex())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_short_hex())
    }
}

impl WriteXdr for NodeId {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.0.write_xdr(w)
    }
}

impl ReadXdr for NodeId {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(NodeId(<[u8; 32]>::read_xdr(r)?))
    }
}

/// An account's identity: its Ed25519 public key bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(pub [u8; 32]);

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..6]))
    }
}

impl WriteXdr for AccountId {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.0.write_xdr(w)
    }
}

impl ReadXdr for AccountId {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(AccountId(<[u8; 32]>::read_xdr(r)?))
    }
}

/// An opaque consensus value: the canonical encoding of a [`StellarValue`].
///
/// Values compare lexicographically by their bytes, which is how the
/// slot-machine totally orders candidate values.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Value(pub Vec<u8>);

impl Value {
    /// The raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix_len = self.0.len().min(6);
        write!(
            f,
            "Value({}, {} bytes)",
            hex::encode(&self.0[..prefix_len]),
            self.0.len()
        )
    }
}

impl WriteXdr for Value {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        write_var_opaque(w, &self.0)
    }
}

impl ReadXdr for Value {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Value(read_var_opaque(r)?))
    }
}

/// The payload carried inside every ballot: which transaction set to apply,
/// when the ledger closes, and at what base fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StellarValue {
    /// Content hash of the proposed transaction set.
    pub tx_set_hash: Hash256,
    /// Proposed close time (Unix seconds).
    pub close_time: TimePoint,
    /// Proposed base fee.
    pub base_fee: u32,
}

impl StellarValue {
    /// Encode into the opaque [`Value`] form the slot-machine carries.
    pub fn to_value(&self) -> Value {
        // Encoding a fixed-size struct into a Vec cannot fail.
        Value(self.to_xdr().expect("stellar value encoding is infallible"))
    }

    /// Decode from an opaque [`Value`].
    pub fn from_value(value: &Value) -> Result<Self, XdrError> {
        Self::from_xdr(&value.0)
    }
}

impl WriteXdr for StellarValue {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.tx_set_hash.write_xdr(w)?;
        self.close_time.write_xdr(w)?;
        self.base_fee.write_xdr(w)
    }
}

impl ReadXdr for StellarValue {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            tx_set_hash: Hash256::read_xdr(r)?,
            close_time: TimePoint::read_xdr(r)?,
            base_fee: u32::read_xdr(r)?,
        })
    }
}

/// A ballot: a counter that escalates on timeouts, and the value it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FbaBallot {
    /// Escalation counter; bumped when a round times out.
    pub counter: u32,
    /// The opaque value being balloted.
    pub value: Value,
}

impl WriteXdr for FbaBallot {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.counter.write_xdr(w)?;
        self.value.write_xdr(w)
    }
}

impl ReadXdr for FbaBallot {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            counter: u32::read_xdr(r)?,
            value: Value::read_xdr(r)?,
        })
    }
}

/// Which pledge a statement makes in the ballot protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FbaStatementType {
    Prepare,
    Prepared,
    Commit,
    Committed,
}

impl WriteXdr for FbaStatementType {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        let discriminant: u32 = match self {
            Self::Prepare => 0,
            Self::Prepared => 1,
            Self::Commit => 2,
            Self::Committed => 3,
        };
        discriminant.write_xdr(w)
    }
}

impl ReadXdr for FbaStatementType {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        match u32::read_xdr(r)? {
            0 => Ok(Self::Prepare),
            1 => Ok(Self::Prepared),
            2 => Ok(Self::Commit),
            3 => Ok(Self::Committed),
            d => Err(XdrError::UnknownDiscriminant(d)),
        }
    }
}

/// One node's statement about one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FbaStatement {
    /// The slot (ledger index) this statement is about.
    pub slot_index: SlotIndex,
    /// The ballot being pledged.
    pub ballot: FbaBallot,
    /// Hash of the sender's quorum set.
    pub quorum_set_hash: Hash256,
    /// The pledge kind.
    pub statement_type: FbaStatementType,
}

impl WriteXdr for FbaStatement {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.slot_index.write_xdr(w)?;
        self.ballot.write_xdr(w)?;
        self.quorum_set_hash.write_xdr(w)?;
        self.statement_type.write_xdr(w)
    }
}

impl ReadXdr for FbaStatement {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            slot_index: SlotIndex::read_xdr(r)?,
            ballot: FbaBallot::read_xdr(r)?,
            quorum_set_hash: Hash256::read_xdr(r)?,
            statement_type: FbaStatementType::read_xdr(r)?,
        })
    }
}

/// A signed statement, as broadcast between nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FbaEnvelope {
    /// The signing node.
    pub node_id: NodeId,
    /// The statement.
    pub statement: FbaStatement,
    /// Ed25519 signature over the statement's canonical encoding.
    pub signature: Signature,
}

impl FbaEnvelope {
    /// The slot this envelope is about.
    pub fn slot_index(&self) -> SlotIndex {
        self.statement.slot_index
    }
}

impl WriteXdr for FbaEnvelope {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.node_id.write_xdr(w)?;
        self.statement.write_xdr(w)?;
        self.signature.write_xdr(w)
    }
}

impl ReadXdr for FbaEnvelope {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            node_id: NodeId::read_xdr(r)?,
            statement: FbaStatement::read_xdr(r)?,
            signature: Signature::read_xdr(r)?,
        })
    }
}

/// A node's trust declaration: the validators it listens to and how many
/// must agree.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct QuorumSet {
    /// How many of `validators` must agree.
    pub threshold: u32,
    /// The trusted validators.
    pub validators: Vec<NodeId>,
}

impl QuorumSet {
    /// Content hash of the canonical encoding.
    pub fn hash(&self) -> Hash256 {
        hash_xdr(self).expect("quorum set encoding is infallible")
    }
}

impl WriteXdr for QuorumSet {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.threshold.write_xdr(w)?;
        self.validators.write_xdr(w)
    }
}

impl ReadXdr for QuorumSet {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            threshold: u32::read_xdr(r)?,
            validators: Vec::read_xdr(r)?,
        })
    }
}

/// An opaque operation body. The coordinator only counts operations; their
/// interpretation belongs to the ledger engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Operation(pub Vec<u8>);

impl WriteXdr for Operation {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        write_var_opaque(w, &self.0)
    }
}

impl ReadXdr for Operation {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Operation(read_var_opaque(r)?))
    }
}

/// A signed transaction as received from the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionEnvelope {
    /// The account whose sequence number this transaction consumes.
    pub source_account: AccountId,
    /// Sequence number; must follow the account's committed sequence.
    pub seq_num: SequenceNumber,
    /// Fee bid for the whole transaction.
    pub fee_bid: i64,
    /// Opaque operations; the coordinator only counts them.
    pub operations: Vec<Operation>,
    /// Signature over the canonical encoding of the rest.
    pub signature: Signature,
}

impl TransactionEnvelope {
    /// Content hash of the whole envelope; the transaction's identity.
    pub fn full_hash(&self) -> Hash256 {
        hash_xdr(self).expect("transaction encoding is infallible")
    }

    /// Number of operations.
    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }
}

impl WriteXdr for TransactionEnvelope {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.source_account.write_xdr(w)?;
        self.seq_num.write_xdr(w)?;
        self.fee_bid.write_xdr(w)?;
        self.operations.write_xdr(w)?;
        self.signature.write_xdr(w)
    }
}

impl ReadXdr for TransactionEnvelope {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            source_account: AccountId::read_xdr(r)?,
            seq_num: SequenceNumber::read_xdr(r)?,
            fee_bid: i64::read_xdr(r)?,
            operations: Vec::read_xdr(r)?,
            signature: Signature::read_xdr(r)?,
        })
    }
}

/// The wire form of a transaction set: the transactions proposed for one
/// ledger, tied to the ledger they build on.
///
/// Canonicalization (sorting by full hash before hashing) is the
/// responsibility of the frame type in the herder crate; this is the raw
/// encoding.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TransactionSet {
    /// Hash of the ledger this set builds on.
    pub previous_ledger_hash: Hash256,
    /// The member transactions.
    pub txs: Vec<TransactionEnvelope>,
}

impl WriteXdr for TransactionSet {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.previous_ledger_hash.write_xdr(w)?;
        self.txs.write_xdr(w)
    }
}

impl ReadXdr for TransactionSet {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            previous_ledger_hash: Hash256::read_xdr(r)?,
            txs: Vec::read_xdr(r)?,
        })
    }
}

/// A ledger header, as reported by the ledger engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LedgerHeader {
    /// Ledger sequence number.
    pub ledger_seq: u32,
    /// Close time agreed by consensus (Unix seconds).
    pub close_time: TimePoint,
    /// Hash of the previous ledger header.
    pub previous_ledger_hash: Hash256,
}

impl LedgerHeader {
    /// Content hash of this header.
    pub fn hash(&self) -> Hash256 {
        hash_xdr(self).expect("ledger header encoding is infallible")
    }

    /// Snapshot used by the consensus coordinator.
    pub fn info(&self) -> LedgerHeaderInfo {
        LedgerHeaderInfo {
            ledger_seq: self.ledger_seq,
            close_time: self.close_time,
            hash: self.hash(),
        }
    }
}

impl WriteXdr for LedgerHeader {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.ledger_seq.write_xdr(w)?;
        self.close_time.write_xdr(w)?;
        self.previous_ledger_hash.write_xdr(w)
    }
}

impl ReadXdr for LedgerHeader {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        Ok(Self {
            ledger_seq: u32::read_xdr(r)?,
            close_time: TimePoint::read_xdr(r)?,
            previous_ledger_hash: Hash256::read_xdr(r)?,
        })
    }
}

/// Immutable last-closed-ledger snapshot handed to the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LedgerHeaderInfo {
    /// Ledger sequence number.
    pub ledger_seq: u32,
    /// Close time (Unix seconds).
    pub close_time: TimePoint,
    /// Hash of the header.
    pub hash: Hash256,
}

/// Discriminator for [`StellarMessage`], also used by `DontHave` to say
/// which kind of artifact a peer is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    DontHave,
    GetTxSet,
    TxSet,
    Transaction,
    GetFbaQuorumSet,
    FbaQuorumSet,
    FbaMessage,
}

impl WriteXdr for MessageType {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        let discriminant: u32 = match self {
            Self::DontHave => 0,
            Self::GetTxSet => 1,
            Self::TxSet => 2,
            Self::Transaction => 3,
            Self::GetFbaQuorumSet => 4,
            Self::FbaQuorumSet => 5,
            Self::FbaMessage => 6,
        };
        discriminant.write_xdr(w)
    }
}

impl ReadXdr for MessageType {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        match u32::read_xdr(r)? {
            0 => Ok(Self::DontHave),
            1 => Ok(Self::GetTxSet),
            2 => Ok(Self::TxSet),
            3 => Ok(Self::Transaction),
            4 => Ok(Self::GetFbaQuorumSet),
            5 => Ok(Self::FbaQuorumSet),
            6 => Ok(Self::FbaMessage),
            d => Err(XdrError::UnknownDiscriminant(d)),
        }
    }
}

/// The overlay message union: everything a node broadcasts or serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StellarMessage {
    /// A peer does not have the requested artifact.
    DontHave {
        /// Which request this answers.
        type_: MessageType,
        /// The hash that was requested.
        req_hash: Hash256,
    },
    /// Request a transaction set by content hash.
    GetTxSet(Hash256),
    /// A transaction set, either announced or served.
    TxSet(TransactionSet),
    /// A flooded transaction.
    Transaction(TransactionEnvelope),
    /// Request a quorum set by content hash.
    GetFbaQuorumSet(Hash256),
    /// A quorum set, either announced or served.
    FbaQuorumSet(QuorumSet),
    /// A consensus envelope.
    FbaMessage(FbaEnvelope),
}

impl StellarMessage {
    /// The union's discriminator.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::DontHave { .. } => MessageType::DontHave,
            Self::GetTxSet(_) => MessageType::GetTxSet,
            Self::TxSet(_) => MessageType::TxSet,
            Self::Transaction(_) => MessageType::Transaction,
            Self::GetFbaQuorumSet(_) => MessageType::GetFbaQuorumSet,
            Self::FbaQuorumSet(_) => MessageType::FbaQuorumSet,
            Self::FbaMessage(_) => MessageType::FbaMessage,
        }
    }
}

impl WriteXdr for StellarMessage {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        self.message_type().write_xdr(w)?;
        match self {
            Self::DontHave { type_, req_hash } => {
                type_.write_xdr(w)?;
                req_hash.write_xdr(w)
            }
            Self::GetTxSet(hash) => hash.write_xdr(w),
            Self::TxSet(tx_set) => tx_set.write_xdr(w),
            Self::Transaction(tx) => tx.write_xdr(w),
            Self::GetFbaQuorumSet(hash) => hash.write_xdr(w),
            Self::FbaQuorumSet(quorum_set) => quorum_set.write_xdr(w),
            Self::FbaMessage(envelope) => envelope.write_xdr(w),
        }
    }
}

impl ReadXdr for StellarMessage {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        match MessageType::read_xdr(r)? {
            MessageType::DontHave => Ok(Self::DontHave {
                type_: MessageType::read_xdr(r)?,
                req_hash: Hash256::read_xdr(r)?,
            }),
            MessageType::GetTxSet => Ok(Self::GetTxSet(Hash256::read_xdr(r)?)),
            MessageType::TxSet => Ok(Self::TxSet(TransactionSet::read_xdr(r)?)),
            MessageType::Transaction => Ok(Self::Transaction(TransactionEnvelope::read_xdr(r)?)),
            MessageType::GetFbaQuorumSet => Ok(Self::GetFbaQuorumSet(Hash256::read_xdr(r)?)),
            MessageType::FbaQuorumSet => Ok(Self::FbaQuorumSet(QuorumSet::read_xdr(r)?)),
            MessageType::FbaMessage => Ok(Self::FbaMessage(FbaEnvelope::read_xdr(r)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tx(seq: i64) -> TransactionEnvelope {
        TransactionEnvelope {
            source_account: AccountId([1u8; 32]),
            seq_num: seq,
            fee_bid: 10,
            operations: vec![Operation(vec![1, 2, 3])],
            signature: Signature::ZERO,
        }
    }

    #[test]
    fn test_stellar_value_round_trip() {
        let value = StellarValue {
            tx_set_hash: Hash256::hash(b"set"),
            close_time: 1_700_000_000,
            base_fee: 10,
        };
        let opaque = value.to_value();
        assert_eq!(StellarValue::from_value(&opaque).unwrap(), value);
    }

    #[test]
    fn test_stellar_value_rejects_garbage() {
        assert!(StellarValue::from_value(&Value(vec![1, 2, 3])).is_err());
        // Trailing bytes after a well-formed value are also malformed.
        let mut bytes = StellarValue {
            tx_set_hash: Hash256::ZERO,
            close_time: 0,
            base_fee: 0,
        }
        .to_xdr()
        .unwrap();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(StellarValue::from_value(&Value(bytes)).is_err());
    }

    #[test]
    fn test_values_compare_lexicographically() {
        let a = Value(vec![0, 1]);
        let b = Value(vec![0, 2]);
        let c = Value(vec![0, 1, 0]);
        assert!(a < b);
        assert!(a < c);
        assert!(c < b);
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = FbaEnvelope {
            node_id: NodeId([9u8; 32]),
            statement: FbaStatement {
                slot_index: 12,
                ballot: FbaBallot {
                    counter: 3,
                    value: Value(vec![1, 2, 3, 4]),
                },
                quorum_set_hash: Hash256::hash(b"qset"),
                statement_type: FbaStatementType::Prepare,
            },
            signature: Signature([7u8; 64]),
        };
        let bytes = envelope.to_xdr().unwrap();
        assert_eq!(FbaEnvelope::from_xdr(&bytes).unwrap(), envelope);
        assert_eq!(envelope.slot_index(), 12);
    }

    #[test]
    fn test_statement_type_rejects_unknown() {
        let bytes = 9u32.to_xdr().unwrap();
        assert!(matches!(
            FbaStatementType::from_xdr(&bytes),
            Err(XdrError::UnknownDiscriminant(9))
        ));
    }

    #[test]
    fn test_quorum_set_hash_changes_with_content() {
        let a = QuorumSet {
            threshold: 2,
            validators: vec![NodeId([1u8; 32]), NodeId([2u8; 32])],
        };
        let mut b = a.clone();
        b.threshold = 3;
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.clone().hash());
    }

    #[test]
    fn test_transaction_identity_is_full_hash() {
        let tx = make_tx(5);
        let same = make_tx(5);
        let other = make_tx(6);
        assert_eq!(tx.full_hash(), same.full_hash());
        assert_ne!(tx.full_hash(), other.full_hash());
    }

    #[test]
    fn test_tx_set_round_trip() {
        let set = TransactionSet {
            previous_ledger_hash: Hash256::hash(b"prev"),
            txs: vec![make_tx(1), make_tx(2)],
        };
        let bytes = set.to_xdr().unwrap();
        assert_eq!(TransactionSet::from_xdr(&bytes).unwrap(), set);
    }

    #[test]
    fn test_ledger_header_hash_and_info() {
        let header = LedgerHeader {
            ledger_seq: 7,
            close_time: 1000,
            previous_ledger_hash: Hash256::hash(b"prev"),
        };
        let info = header.info();
        assert_eq!(info.ledger_seq, 7);
        assert_eq!(info.close_time, 1000);
        assert_eq!(info.hash, header.hash());
    }

    #[test]
    fn test_stellar_message_round_trips() {
        let messages = vec![
            StellarMessage::DontHave {
                type_: MessageType::TxSet,
                req_hash: Hash256::hash(b"missing"),
            },
            StellarMessage::GetTxSet(Hash256::hash(b"want")),
            StellarMessage::TxSet(TransactionSet::default()),
            StellarMessage::Transaction(make_tx(1)),
            StellarMessage::GetFbaQuorumSet(Hash256::hash(b"qs")),
            StellarMessage::FbaQuorumSet(QuorumSet {
                threshold: 1,
                validators: vec![NodeId([3u8; 32])],
            }),
        ];
        for message in messages {
            let bytes = message.to_xdr().unwrap();
            assert_eq!(StellarMessage::from_xdr(&bytes).unwrap(), message);
        }
    }
}
