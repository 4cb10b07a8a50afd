//! Transaction set frames.
//!
//! A [`TxSetFrame`] is the herder's working form of a transaction set: an
//! unordered multiset of transactions tied to the ledger it builds on. Its
//! identity is the [`contents_hash`](TxSetFrame::contents_hash), computed
//! over a canonicalized encoding (members sorted by full hash), so two
//! nodes that assemble the same transactions in different orders agree on
//! the hash.

use drover_common::Hash256;
use drover_xdr::{hash_xdr, LedgerHeaderInfo, TransactionEnvelope, TransactionSet};

/// A transaction set under construction or in validation.
#[derive(Clone, Debug, Default)]
pub struct TxSetFrame {
    previous_ledger_hash: Hash256,
    txs: Vec<TransactionEnvelope>,
}

impl TxSetFrame {
    /// Create an empty set building on the ledger with hash
    /// `previous_ledger_hash`.
    pub fn new(previous_ledger_hash: Hash256) -> Self {
        Self {
            previous_ledger_hash,
            txs: Vec::new(),
        }
    }

    /// Wrap a wire-form set.
    pub fn from_wire(wire: TransactionSet) -> Self {
        Self {
            previous_ledger_hash: wire.previous_ledger_hash,
            txs: wire.txs,
        }
    }

    /// Convert to the wire form, in canonical member order.
    pub fn to_wire(&self) -> TransactionSet {
        TransactionSet {
            previous_ledger_hash: self.previous_ledger_hash,
            txs: self.sorted_txs(),
        }
    }

    /// The ledger this set builds on.
    pub fn previous_ledger_hash(&self) -> Hash256 {
        self.previous_ledger_hash
    }

    /// Add a transaction.
    pub fn add(&mut self, tx: TransactionEnvelope) {
        self.txs.push(tx);
    }

    /// The member transactions, in insertion order.
    pub fn txs(&self) -> &[TransactionEnvelope] {
        &self.txs
    }

    /// Number of member transactions.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Full hashes of every member.
    pub fn tx_hashes(&self) -> Vec<Hash256> {
        self.txs.iter().map(|tx| tx.full_hash()).collect()
    }

    /// Whether a transaction with `hash` is a member.
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.txs.iter().any(|tx| tx.full_hash() == *hash)
    }

    fn sorted_txs(&self) -> Vec<TransactionEnvelope> {
        let mut txs = self.txs.clone();
        txs.sort_by_key(|tx| tx.full_hash());
        txs
    }

    /// Content hash over the canonical (sorted) encoding. This is the
    /// set's identity on the wire.
    pub fn contents_hash(&self) -> Hash256 {
        hash_xdr(&self.to_wire()).expect("tx set encoding is infallible")
    }

    /// Validate against a ledger header: the set must build on that ledger
    /// and every member must be structurally valid.
    ///
    /// Structural validity is what the coordinator can check without the
    /// ledger engine: a positive sequence number, a non-negative fee bid
    /// and at least one operation.
    pub fn check_valid(&self, lcl: &LedgerHeaderInfo) -> bool {
        if self.previous_ledger_hash != lcl.hash {
            return false;
        }
        self.txs.iter().all(tx_structurally_valid)
    }
}

fn tx_structurally_valid(tx: &TransactionEnvelope) -> bool {
    tx.seq_num > 0 && tx.fee_bid >= 0 && !tx.operations.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_crypto::Signature;
    use drover_xdr::{AccountId, Operation};

    fn make_tx(account: u8, seq: i64) -> TransactionEnvelope {
        TransactionEnvelope {
            source_account: AccountId([account; 32]),
            seq_num: seq,
            fee_bid: 10,
            operations: vec![Operation(vec![account])],
            signature: Signature::ZERO,
        }
    }

    #[test]
    fn test_hash_is_order_independent() {
        let prev = Hash256::hash(b"prev");
        let mut a = TxSetFrame::new(prev);
        a.add(make_tx(1, 1));
        a.add(make_tx(2, 1));

        let mut b = TxSetFrame::new(prev);
        b.add(make_tx(2, 1));
        b.add(make_tx(1, 1));

        assert_eq!(a.contents_hash(), b.contents_hash());
    }

    #[test]
    fn test_hash_depends_on_previous_ledger() {
        let mut a = TxSetFrame::new(Hash256::hash(b"one"));
        a.add(make_tx(1, 1));
        let mut b = TxSetFrame::new(Hash256::hash(b"two"));
        b.add(make_tx(1, 1));
        assert_ne!(a.contents_hash(), b.contents_hash());
    }

    #[test]
    fn test_wire_round_trip_preserves_hash() {
        let mut frame = TxSetFrame::new(Hash256::hash(b"prev"));
        frame.add(make_tx(3, 7));
        frame.add(make_tx(1, 2));

        let rebuilt = TxSetFrame::from_wire(frame.to_wire());
        assert_eq!(rebuilt.contents_hash(), frame.contents_hash());
        assert_eq!(rebuilt.len(), 2);
    }

    #[test]
    fn test_check_valid_requires_matching_previous_hash() {
        let lcl = LedgerHeaderInfo {
            ledger_seq: 5,
            close_time: 100,
            hash: Hash256::hash(b"lcl"),
        };
        let mut frame = TxSetFrame::new(lcl.hash);
        frame.add(make_tx(1, 1));
        assert!(frame.check_valid(&lcl));

        let stale = TxSetFrame::new(Hash256::hash(b"other"));
        assert!(!stale.check_valid(&lcl));
    }

    #[test]
    fn test_check_valid_rejects_malformed_tx() {
        let lcl = LedgerHeaderInfo {
            ledger_seq: 5,
            close_time: 100,
            hash: Hash256::hash(b"lcl"),
        };
        let mut frame = TxSetFrame::new(lcl.hash);
        let mut tx = make_tx(1, 1);
        tx.operations.clear();
        frame.add(tx);
        assert!(!frame.check_valid(&lcl));
    }

    #[test]
    fn test_contains() {
        let mut frame = TxSetFrame::new(Hash256::ZERO);
        let tx = make_tx(1, 1);
        let hash = tx.full_hash();
        frame.add(tx);
        assert!(frame.contains(&hash));
        assert!(!frame.contains(&make_tx(2, 1).full_hash()));
    }
}
