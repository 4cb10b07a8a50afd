//! The pending-transaction queue.
//!
//! Keeps received transactions that are valid but not yet in a ledger.
//! Each account has an associated queue of transactions with contiguous,
//! strictly increasing sequence numbers, a cached total of their fee bids,
//! a cached operation count, and an age that measures how many ledgers have
//! closed since the account last saw activity.
//!
//! After a transaction is admitted by [`TransactionQueue::try_add`] it
//! leaves the queue in one of three ways:
//!
//! - [`remove_and_reset`](TransactionQueue::remove_and_reset) after it was
//!   included in a closed ledger; the account's remaining transactions stay
//!   and its age resets
//! - [`ban`](TransactionQueue::ban) removes it and every dependent
//!   (higher-sequence) transaction of the same account and bans their
//!   hashes for the next `ban_depth` ledgers
//! - [`shift`](TransactionQueue::shift), called once per ledger close, ages
//!   every queue and bans those that reach `pending_depth`
//!
//! The queue is bounded globally at `pool_ledger_multiplier ×
//! network_ledger_ops_cap` operations; admission past the bound evicts the
//! cheapest (by fee per operation) account-queue tails, or rejects the
//! incoming transaction if it is itself the cheapest.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use drover_common::Hash256;
use drover_xdr::{AccountId, LedgerHeaderInfo, SequenceNumber, TransactionEnvelope};

use crate::gateways::LedgerGateway;
use crate::tx_set::TxSetFrame;

/// Result of attempting to add a transaction to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    /// Admitted and pending inclusion.
    Pending,
    /// Already present (by full hash).
    Duplicate,
    /// Rejected: banned, bad sequence number, unknown account or
    /// insufficient balance.
    Error,
    /// Not admissible right now; resubmission later (or with a higher fee)
    /// may succeed.
    TryAgainLater,
}

impl AddResult {
    /// Status string as surfaced to RPC clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Duplicate => "DUPLICATE",
            Self::Error => "ERROR",
            Self::TryAgainLater => "TRY_AGAIN_LATER",
        }
    }
}

/// Result of one [`TransactionQueue::shift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftResult {
    /// Transactions whose ban expired this shift.
    pub unbanned: usize,
    /// Transactions banned this shift for reaching `pending_depth`.
    pub banned_for_age: usize,
}

/// Configuration for the transaction queue.
#[derive(Debug, Clone)]
pub struct TxQueueConfig {
    /// Ledgers a queue may sit untouched before its transactions are
    /// banned.
    pub pending_depth: u32,
    /// Ledgers a banned hash stays banned.
    pub ban_depth: u32,
    /// The pool holds this many ledgers' worth of operations.
    pub pool_ledger_multiplier: u32,
    /// A same-sequence replacement must bid at least this multiple of the
    /// fee it replaces.
    pub fee_multiplier: i64,
    /// The network's per-ledger operation capacity.
    pub network_ledger_ops_cap: usize,
}

impl Default for TxQueueConfig {
    fn default() -> Self {
        Self {
            pending_depth: 4,
            ban_depth: 10,
            pool_ledger_multiplier: 2,
            fee_multiplier: 10,
            network_ledger_ops_cap: 1000,
        }
    }
}

/// Pending-queue facts for one account.
///
/// `max_seq` is computed from the queue tail; the rest are cached in the
/// queue itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountTxQueueInfo {
    /// Highest queued sequence number, 0 if nothing is queued.
    pub max_seq: SequenceNumber,
    /// Sum of queued fee bids.
    pub total_fees: i64,
    /// Sum of queued operation counts.
    pub queue_size_ops: usize,
    /// Ledgers since last admission or reset.
    pub age: u32,
}

/// One queued transaction with its derived facts.
#[derive(Debug, Clone)]
struct QueuedTransaction {
    tx: TransactionEnvelope,
    hash: Hash256,
    ops: usize,
}

impl QueuedTransaction {
    fn new(tx: TransactionEnvelope) -> Self {
        let hash = tx.full_hash();
        let ops = tx.num_operations();
        Self { tx, hash, ops }
    }
}

/// Per-account queue: transactions with contiguous ascending sequence
/// numbers, plus cached totals and the age counter.
#[derive(Debug, Default)]
struct AccountTxQueue {
    total_fees: i64,
    queue_size_ops: usize,
    age: u32,
    txs: Vec<QueuedTransaction>,
}

impl AccountTxQueue {
    fn max_seq(&self) -> SequenceNumber {
        self.txs.last().map(|q| q.tx.seq_num).unwrap_or(0)
    }

    fn recompute(&mut self) {
        self.total_fees = self.txs.iter().map(|q| q.tx.fee_bid).sum();
        self.queue_size_ops = self.txs.iter().map(|q| q.ops).sum();
    }
}

struct QueueState {
    pending: HashMap<AccountId, AccountTxQueue>,
    /// Bounded deque of banned-hash buckets; front is "just banned",
    /// back is about to expire.
    banned: VecDeque<HashSet<Hash256>>,
    /// Global operation count; always equals the sum over all queues.
    queue_size_ops: usize,
}

/// The pending transaction pool.
pub struct TransactionQueue {
    config: TxQueueConfig,
    ledger: Arc<dyn LedgerGateway>,
    state: RwLock<QueueState>,
}

/// Compare fee rates `a_fee / a_ops` vs `b_fee / b_ops` without division.
fn fee_rate_cmp(a_fee: i64, a_ops: usize, b_fee: i64, b_ops: usize) -> Ordering {
    let left = (a_fee as i128) * (b_ops as i128);
    let right = (b_fee as i128) * (a_ops as i128);
    left.cmp(&right)
}

impl TransactionQueue {
    /// Create a queue over the given ledger view.
    pub fn new(config: TxQueueConfig, ledger: Arc<dyn LedgerGateway>) -> Self {
        let mut banned = VecDeque::with_capacity(config.ban_depth as usize);
        for _ in 0..config.ban_depth.max(1) {
            banned.push_back(HashSet::new());
        }
        Self {
            config,
            ledger,
            state: RwLock::new(QueueState {
                pending: HashMap::new(),
                banned,
                queue_size_ops: 0,
            }),
        }
    }

    /// The global operation bound.
    pub fn max_queue_size_ops(&self) -> usize {
        self.config.pool_ledger_multiplier as usize * self.config.network_ledger_ops_cap
    }

    /// Try to admit a transaction.
    ///
    /// The admission pipeline, in order: ban check, duplicate check,
    /// same-sequence replacement (`fee_multiplier` rule), sequence
    /// contiguity, fee-balance coverage, then the global operation bound
    /// with tail eviction. Only a fully admitted transaction mutates the
    /// queue.
    pub fn try_add(&self, tx: TransactionEnvelope) -> AddResult {
        let queued = QueuedTransaction::new(tx);
        let account = queued.tx.source_account;
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.banned.iter().any(|bucket| bucket.contains(&queued.hash)) {
            trace!(hash = %queued.hash.to_short_hex(), "rejecting banned transaction");
            return AddResult::Error;
        }

        // Same-account scan: duplicates and same-sequence replacement.
        let mut replace_index = None;
        if let Some(queue) = state.pending.get(&account) {
            for (index, existing) in queue.txs.iter().enumerate() {
                if existing.hash == queued.hash {
                    return AddResult::Duplicate;
                }
                if existing.tx.seq_num == queued.tx.seq_num {
                    let required = existing
                        .tx
                        .fee_bid
                        .saturating_mul(self.config.fee_multiplier);
                    if queued.tx.fee_bid >= required {
                        replace_index = Some(index);
                    } else {
                        trace!(
                            hash = %queued.hash.to_short_hex(),
                            required,
                            offered = queued.tx.fee_bid,
                            "replacement fee too low"
                        );
                        return AddResult::TryAgainLater;
                    }
                }
            }
        }

        let on_ledger_seq = match self.ledger.account_seq(&account) {
            Some(seq) => seq,
            None => return AddResult::Error,
        };

        if replace_index.is_none() {
            let queue_max = state
                .pending
                .get(&account)
                .map(|queue| queue.max_seq())
                .unwrap_or(0);
            let expected = on_ledger_seq.max(queue_max) + 1;
            if queued.tx.seq_num != expected {
                trace!(
                    hash = %queued.hash.to_short_hex(),
                    expected,
                    got = queued.tx.seq_num,
                    "rejecting out-of-sequence transaction"
                );
                return AddResult::Error;
            }
        }

        // The account must cover every queued fee bid plus this one.
        let balance = match self.ledger.account_balance(&account) {
            Some(balance) => balance,
            None => return AddResult::Error,
        };
        let (current_fees, replaced_fee, replaced_ops) = match replace_index {
            Some(index) => {
                let queue = &state.pending[&account];
                (
                    queue.total_fees,
                    queue.txs[index].tx.fee_bid,
                    queue.txs[index].ops,
                )
            }
            None => (
                state
                    .pending
                    .get(&account)
                    .map(|queue| queue.total_fees)
                    .unwrap_or(0),
                0,
                0,
            ),
        };
        if queued.tx.fee_bid < self.ledger.get_tx_fee() {
            return AddResult::Error;
        }
        if balance < current_fees - replaced_fee + queued.tx.fee_bid {
            return AddResult::Error;
        }

        // Global bound: evict the cheapest tails of other accounts, unless
        // the incoming transaction is itself the cheapest.
        let max_ops = self.max_queue_size_ops();
        let mut prospective_ops = state.queue_size_ops - replaced_ops + queued.ops;
        while prospective_ops > max_ops {
            let victim = state
                .pending
                .iter()
                .filter(|(victim_account, _)| **victim_account != account)
                .filter_map(|(victim_account, queue)| {
                    queue
                        .txs
                        .last()
                        .map(|tail| (*victim_account, tail.tx.fee_bid, tail.ops, tail.hash))
                })
                .min_by(|a, b| fee_rate_cmp(a.1, a.2, b.1, b.2).then_with(|| a.3.cmp(&b.3)));
            let (victim_account, victim_fee, victim_ops, victim_hash) = match victim {
                Some(victim) => victim,
                None => return AddResult::TryAgainLater,
            };
            if fee_rate_cmp(queued.tx.fee_bid, queued.ops, victim_fee, victim_ops)
                != Ordering::Greater
            {
                // The incoming transaction would be the one evicted.
                return AddResult::TryAgainLater;
            }
            debug!(
                victim = %victim_hash.to_short_hex(),
                account = %victim_account,
                "evicting queue tail to fit new transaction"
            );
            let queue = state
                .pending
                .get_mut(&victim_account)
                .expect("victim account present");
            let evicted = queue.txs.pop().expect("victim tail present");
            queue.total_fees -= evicted.tx.fee_bid;
            queue.queue_size_ops -= evicted.ops;
            state.queue_size_ops -= evicted.ops;
            prospective_ops -= evicted.ops;
            if queue.txs.is_empty() {
                state.pending.remove(&victim_account);
            }
        }

        // Admit.
        let queue = state.pending.entry(account).or_default();
        match replace_index {
            Some(index) => {
                let new_fee = queued.tx.fee_bid;
                let new_ops = queued.ops;
                let old = std::mem::replace(&mut queue.txs[index], queued);
                queue.total_fees += new_fee - old.tx.fee_bid;
                queue.queue_size_ops = queue.queue_size_ops - old.ops + new_ops;
                state.queue_size_ops = state.queue_size_ops - old.ops + new_ops;
            }
            None => {
                queue.total_fees += queued.tx.fee_bid;
                queue.queue_size_ops += queued.ops;
                state.queue_size_ops += queued.ops;
                queue.txs.push(queued);
            }
        }
        queue.age = 0;
        AddResult::Pending
    }

    /// Remove transactions that made it into a ledger.
    ///
    /// For each transaction: its account queue drops it and every
    /// lower-sequence ancestor, caches are recomputed and the account's age
    /// resets. Emptied queues are deleted.
    pub fn remove_and_reset(&self, txs: &[TransactionEnvelope]) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        for tx in txs {
            let account = tx.source_account;
            let mut now_empty = false;
            if let Some(queue) = state.pending.get_mut(&account) {
                let removed_ops: usize = queue
                    .txs
                    .iter()
                    .filter(|queued| queued.tx.seq_num <= tx.seq_num)
                    .map(|queued| queued.ops)
                    .sum();
                let before = queue.txs.len();
                queue.txs.retain(|queued| queued.tx.seq_num > tx.seq_num);
                if queue.txs.len() != before {
                    queue.recompute();
                    queue.age = 0;
                    state.queue_size_ops -= removed_ops;
                }
                now_empty = queue.txs.is_empty();
            }
            if now_empty {
                state.pending.remove(&account);
            }
        }
    }

    /// Ban transactions and their dependents.
    ///
    /// A resident transaction is extracted together with every higher-
    /// sequence transaction of the same account, and all their hashes land
    /// in the just-banned bucket. A non-resident hash is simply banned.
    pub fn ban(&self, txs: &[TransactionEnvelope]) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        for tx in txs {
            let account = tx.source_account;
            let hash = tx.full_hash();
            let front = state.banned.front_mut().expect("ban deque is never empty");
            let mut now_empty = false;
            match state.pending.get_mut(&account) {
                Some(queue) => {
                    match queue.txs.iter().position(|queued| queued.hash == hash) {
                        Some(position) => {
                            let extracted = queue.txs.split_off(position);
                            for queued in &extracted {
                                front.insert(queued.hash);
                                state.queue_size_ops -= queued.ops;
                            }
                            debug!(
                                account = %account,
                                count = extracted.len(),
                                "banned transaction chain"
                            );
                            queue.recompute();
                            now_empty = queue.txs.is_empty();
                        }
                        None => {
                            front.insert(hash);
                        }
                    }
                }
                None => {
                    front.insert(hash);
                }
            }
            if now_empty {
                state.pending.remove(&account);
            }
        }
    }

    /// Age the pool at a ledger close.
    ///
    /// Rotates the ban deque (expiring the oldest bucket), then ages every
    /// account queue; queues reaching `pending_depth` are banned wholesale.
    pub fn shift(&self) -> ShiftResult {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.banned.push_front(HashSet::new());
        let mut unbanned = 0;
        while state.banned.len() > self.config.ban_depth.max(1) as usize {
            unbanned += state.banned.pop_back().map(|b| b.len()).unwrap_or(0);
        }

        let mut to_ban = Vec::new();
        for (account, queue) in state.pending.iter_mut() {
            queue.age += 1;
            if queue.age >= self.config.pending_depth {
                to_ban.push(*account);
            }
        }

        let mut banned_for_age = 0;
        for account in to_ban {
            if let Some(queue) = state.pending.remove(&account) {
                let front = state.banned.front_mut().expect("ban deque is never empty");
                for queued in &queue.txs {
                    front.insert(queued.hash);
                }
                state.queue_size_ops -= queue.queue_size_ops;
                banned_for_age += queue.txs.len();
                debug!(account = %account, count = queue.txs.len(), "banned aged-out queue");
            }
        }

        ShiftResult {
            unbanned,
            banned_for_age,
        }
    }

    /// Flatten the pool into a transaction set building on `lcl`.
    pub fn to_tx_set(&self, lcl: &LedgerHeaderInfo) -> TxSetFrame {
        let state = self.state.read();
        let mut frame = TxSetFrame::new(lcl.hash);
        for queue in state.pending.values() {
            for queued in &queue.txs {
                frame.add(queued.tx.clone());
            }
        }
        frame
    }

    /// Queue facts for `account`; zeros if nothing is pending.
    pub fn get_account_transaction_queue_info(&self, account: &AccountId) -> AccountTxQueueInfo {
        let state = self.state.read();
        state
            .pending
            .get(account)
            .map(|queue| AccountTxQueueInfo {
                max_seq: queue.max_seq(),
                total_fees: queue.total_fees,
                queue_size_ops: queue.queue_size_ops,
                age: queue.age,
            })
            .unwrap_or_default()
    }

    /// Hashes of the oldest cohort: every transaction whose account queue
    /// is one shift away from being banned. Validators refuse candidate
    /// sets that omit these.
    pub fn oldest_cohort(&self) -> HashSet<Hash256> {
        let state = self.state.read();
        let threshold = self.config.pending_depth.saturating_sub(1).max(1);
        state
            .pending
            .values()
            .filter(|queue| queue.age >= threshold)
            .flat_map(|queue| queue.txs.iter().map(|queued| queued.hash))
            .collect()
    }

    /// Transactions in queues that have survived at least `min_age`
    /// ledger closes. Used to re-flood lingering transactions after an
    /// externalization.
    pub fn txs_with_min_age(&self, min_age: u32) -> Vec<TransactionEnvelope> {
        let state = self.state.read();
        state
            .pending
            .values()
            .filter(|queue| queue.age >= min_age)
            .flat_map(|queue| queue.txs.iter().map(|queued| queued.tx.clone()))
            .collect()
    }

    /// Whether `hash` sits in any ban bucket.
    pub fn is_banned(&self, hash: &Hash256) -> bool {
        self.state
            .read()
            .banned
            .iter()
            .any(|bucket| bucket.contains(hash))
    }

    /// Size of ban bucket `index` (0 is "just banned").
    pub fn count_banned(&self, index: usize) -> usize {
        self.state
            .read()
            .banned
            .get(index)
            .map(|bucket| bucket.len())
            .unwrap_or(0)
    }

    /// Global operation count over all pending queues.
    pub fn queue_size_ops(&self) -> usize {
        self.state.read().queue_size_ops
    }

    /// Total pending transactions.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .pending
            .values()
            .map(|queue| queue.txs.len())
            .sum()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().pending.is_empty()
    }

    /// Whether a transaction with `hash` is pending.
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.state
            .read()
            .pending
            .values()
            .any(|queue| queue.txs.iter().any(|queued| queued.hash == *hash))
    }

    /// Verify internal consistency; used by tests after every mutation.
    #[cfg(test)]
    pub fn assert_invariants(&self) {
        let state = self.state.read();
        let mut total_ops = 0;
        for (account, queue) in &state.pending {
            assert!(!queue.txs.is_empty(), "empty queue retained for {account}");
            let mut expected_fees = 0;
            let mut expected_ops = 0;
            for window in queue.txs.windows(2) {
                assert_eq!(
                    window[1].tx.seq_num,
                    window[0].tx.seq_num + 1,
                    "sequence gap in queue for {account}"
                );
            }
            for queued in &queue.txs {
                expected_fees += queued.tx.fee_bid;
                expected_ops += queued.ops;
                assert!(
                    !state.banned.iter().any(|b| b.contains(&queued.hash)),
                    "pending hash also banned"
                );
            }
            assert_eq!(queue.total_fees, expected_fees);
            assert_eq!(queue.queue_size_ops, expected_ops);
            total_ops += expected_ops;
        }
        assert_eq!(state.queue_size_ops, total_ops);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_crypto::Signature;
    use drover_xdr::Operation;
    use parking_lot::Mutex;

    /// Ledger double with per-account committed sequences and balances.
    #[derive(Default)]
    struct TestLedger {
        seqs: Mutex<HashMap<AccountId, SequenceNumber>>,
        balances: Mutex<HashMap<AccountId, i64>>,
        lcl: Mutex<LedgerHeaderInfo>,
    }

    impl TestLedger {
        fn with_account(self, account: AccountId, seq: SequenceNumber, balance: i64) -> Self {
            self.seqs.lock().insert(account, seq);
            self.balances.lock().insert(account, balance);
            self
        }
    }

    impl LedgerGateway for TestLedger {
        fn last_closed_ledger(&self) -> LedgerHeaderInfo {
            *self.lcl.lock()
        }
        fn externalize_value(&self, _tx_set: &TxSetFrame) {}
        fn get_tx_fee(&self) -> i64 {
            10
        }
        fn get_state(&self) -> crate::gateways::AppState {
            crate::gateways::AppState::Synced
        }
        fn account_seq(&self, account: &AccountId) -> Option<SequenceNumber> {
            self.seqs.lock().get(account).copied()
        }
        fn account_balance(&self, account: &AccountId) -> Option<i64> {
            self.balances.lock().get(account).copied()
        }
    }

    fn account(id: u8) -> AccountId {
        AccountId([id; 32])
    }

    fn make_tx(source: u8, seq: i64, fee: i64, ops: usize) -> TransactionEnvelope {
        TransactionEnvelope {
            source_account: account(source),
            seq_num: seq,
            fee_bid: fee,
            operations: (0..ops).map(|i| Operation(vec![source, i as u8])).collect(),
            signature: Signature::ZERO,
        }
    }

    fn make_queue(config: TxQueueConfig) -> TransactionQueue {
        let ledger = TestLedger::default()
            .with_account(account(1), 4, 1_000_000)
            .with_account(account(2), 0, 1_000_000)
            .with_account(account(3), 0, 1_000_000);
        TransactionQueue::new(config, Arc::new(ledger))
    }

    #[test]
    fn test_try_add_pending_then_duplicate() {
        let queue = make_queue(TxQueueConfig::default());
        let tx = make_tx(1, 5, 100, 1);

        assert_eq!(queue.try_add(tx.clone()), AddResult::Pending);
        let info_after_first = queue.get_account_transaction_queue_info(&account(1));
        assert_eq!(queue.try_add(tx), AddResult::Duplicate);
        // Idempotence: the duplicate did not change the account's state.
        assert_eq!(
            queue.get_account_transaction_queue_info(&account(1)),
            info_after_first
        );
        queue.assert_invariants();
    }

    #[test]
    fn test_try_add_builds_contiguous_chain() {
        let queue = make_queue(TxQueueConfig::default());
        assert_eq!(queue.try_add(make_tx(1, 5, 100, 1)), AddResult::Pending);
        assert_eq!(queue.try_add(make_tx(1, 6, 100, 2)), AddResult::Pending);
        // A gap is an error.
        assert_eq!(queue.try_add(make_tx(1, 8, 100, 1)), AddResult::Error);
        // So is starting below the committed sequence.
        assert_eq!(queue.try_add(make_tx(1, 3, 100, 1)), AddResult::Error);

        let info = queue.get_account_transaction_queue_info(&account(1));
        assert_eq!(info.max_seq, 6);
        assert_eq!(info.total_fees, 200);
        assert_eq!(info.queue_size_ops, 3);
        assert_eq!(info.age, 0);
        queue.assert_invariants();
    }

    #[test]
    fn test_try_add_unknown_account() {
        let queue = make_queue(TxQueueConfig::default());
        assert_eq!(queue.try_add(make_tx(9, 1, 100, 1)), AddResult::Error);
    }

    #[test]
    fn test_try_add_fee_floor() {
        let queue = make_queue(TxQueueConfig::default());
        // TestLedger's tx fee is 10.
        assert_eq!(queue.try_add(make_tx(1, 5, 9, 1)), AddResult::Error);
        assert_eq!(queue.try_add(make_tx(1, 5, 10, 1)), AddResult::Pending);
    }

    #[test]
    fn test_try_add_insufficient_balance() {
        let ledger = TestLedger::default().with_account(account(1), 0, 150);
        let queue = TransactionQueue::new(TxQueueConfig::default(), Arc::new(ledger));

        assert_eq!(queue.try_add(make_tx(1, 1, 100, 1)), AddResult::Pending);
        // 100 already committed; another 100 exceeds the 150 balance.
        assert_eq!(queue.try_add(make_tx(1, 2, 100, 1)), AddResult::Error);
        assert_eq!(queue.try_add(make_tx(1, 2, 50, 1)), AddResult::Pending);
        queue.assert_invariants();
    }

    #[test]
    fn test_replacement_requires_fee_multiple() {
        let queue = make_queue(TxQueueConfig::default());
        assert_eq!(queue.try_add(make_tx(1, 5, 100, 1)), AddResult::Pending);

        // Same sequence, different hash, fee below 10x: try again later.
        assert_eq!(queue.try_add(make_tx(1, 5, 999, 1)), AddResult::TryAgainLater);
        // At exactly the multiple it replaces.
        assert_eq!(queue.try_add(make_tx(1, 5, 1000, 1)), AddResult::Pending);

        let info = queue.get_account_transaction_queue_info(&account(1));
        assert_eq!(info.max_seq, 5);
        assert_eq!(info.total_fees, 1000);
        assert_eq!(queue.len(), 1);
        queue.assert_invariants();
    }

    #[test]
    fn test_replacement_mid_chain_keeps_descendants() {
        let queue = make_queue(TxQueueConfig::default());
        assert_eq!(queue.try_add(make_tx(1, 5, 100, 1)), AddResult::Pending);
        assert_eq!(queue.try_add(make_tx(1, 6, 100, 1)), AddResult::Pending);
        assert_eq!(queue.try_add(make_tx(1, 5, 1000, 2)), AddResult::Pending);

        let info = queue.get_account_transaction_queue_info(&account(1));
        assert_eq!(info.max_seq, 6);
        assert_eq!(info.total_fees, 1100);
        assert_eq!(info.queue_size_ops, 3);
        queue.assert_invariants();
    }

    #[test]
    fn test_banned_rejected_until_unbanned() {
        let config = TxQueueConfig {
            ban_depth: 2,
            ..Default::default()
        };
        let queue = make_queue(config);
        let tx = make_tx(1, 5, 100, 1);

        queue.ban(std::slice::from_ref(&tx));
        assert!(queue.is_banned(&tx.full_hash()));
        assert_eq!(queue.count_banned(0), 1);
        assert_eq!(queue.try_add(tx.clone()), AddResult::Error);

        // After ban_depth shifts the hash is admissible again.
        queue.shift();
        queue.shift();
        assert!(!queue.is_banned(&tx.full_hash()));
        assert_eq!(queue.try_add(tx), AddResult::Pending);
        queue.assert_invariants();
    }

    #[test]
    fn test_ban_cascades_to_descendants() {
        let queue = make_queue(TxQueueConfig::default());
        let tx5 = make_tx(1, 5, 100, 1);
        let tx6 = make_tx(1, 6, 100, 1);
        let tx7 = make_tx(1, 7, 100, 1);
        for tx in [&tx5, &tx6, &tx7] {
            assert_eq!(queue.try_add(tx.clone()), AddResult::Pending);
        }

        queue.ban(std::slice::from_ref(&tx6));
        // 6 and its descendant 7 are banned; 5 stays.
        assert!(queue.is_banned(&tx6.full_hash()));
        assert!(queue.is_banned(&tx7.full_hash()));
        assert!(!queue.is_banned(&tx5.full_hash()));
        assert!(queue.contains(&tx5.full_hash()));
        assert_eq!(queue.len(), 1);
        queue.assert_invariants();
    }

    #[test]
    fn test_ban_non_resident_hash() {
        let queue = make_queue(TxQueueConfig::default());
        let tx = make_tx(2, 1, 100, 1);
        queue.ban(std::slice::from_ref(&tx));
        assert!(queue.is_banned(&tx.full_hash()));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_shift_ages_to_ban() {
        let config = TxQueueConfig {
            pending_depth: 4,
            ..Default::default()
        };
        let queue = make_queue(config);
        let tx = make_tx(1, 5, 100, 1);
        assert_eq!(queue.try_add(tx.clone()), AddResult::Pending);

        for i in 1..4 {
            let result = queue.shift();
            assert_eq!(result.banned_for_age, 0, "banned early at shift {i}");
            assert_eq!(
                queue.get_account_transaction_queue_info(&account(1)).age,
                i
            );
        }
        let result = queue.shift();
        assert_eq!(result.banned_for_age, 1);
        assert!(queue.is_banned(&tx.full_hash()));
        assert_eq!(queue.count_banned(0), 1);
        assert!(queue.is_empty());
        queue.assert_invariants();
    }

    #[test]
    fn test_remove_and_reset_drops_ancestors_and_resets_age() {
        let queue = make_queue(TxQueueConfig::default());
        let tx5 = make_tx(1, 5, 100, 1);
        let tx6 = make_tx(1, 6, 100, 2);
        let tx7 = make_tx(1, 7, 100, 1);
        for tx in [&tx5, &tx6, &tx7] {
            assert_eq!(queue.try_add(tx.clone()), AddResult::Pending);
        }
        queue.shift();
        assert_eq!(queue.get_account_transaction_queue_info(&account(1)).age, 1);

        // 6 externalizes: 5 and 6 leave, 7 stays, age resets.
        queue.remove_and_reset(std::slice::from_ref(&tx6));
        let info = queue.get_account_transaction_queue_info(&account(1));
        assert_eq!(info.max_seq, 7);
        assert_eq!(info.total_fees, 100);
        assert_eq!(info.queue_size_ops, 1);
        assert_eq!(info.age, 0);

        // The law: reset then shift leaves age at exactly 1.
        queue.shift();
        assert_eq!(queue.get_account_transaction_queue_info(&account(1)).age, 1);
        queue.assert_invariants();
    }

    #[test]
    fn test_remove_and_reset_deletes_empty_queue() {
        let queue = make_queue(TxQueueConfig::default());
        let tx = make_tx(1, 5, 100, 1);
        assert_eq!(queue.try_add(tx.clone()), AddResult::Pending);
        queue.remove_and_reset(std::slice::from_ref(&tx));
        assert!(queue.is_empty());
        assert_eq!(queue.queue_size_ops(), 0);
        queue.assert_invariants();
    }

    #[test]
    fn test_shift_composition_empties_all_buckets() {
        let config = TxQueueConfig {
            ban_depth: 3,
            ..Default::default()
        };
        let queue = make_queue(config);
        queue.ban(&[make_tx(2, 1, 100, 1), make_tx(3, 1, 100, 1)]);
        assert_eq!(queue.count_banned(0), 2);

        for _ in 0..3 {
            queue.shift();
        }
        for index in 0..3 {
            assert_eq!(queue.count_banned(index), 0, "bucket {index} not empty");
        }
    }

    #[test]
    fn test_global_cap_evicts_cheapest_tail() {
        let config = TxQueueConfig {
            pool_ledger_multiplier: 1,
            network_ledger_ops_cap: 3,
            ..Default::default()
        };
        let queue = make_queue(config);
        // Fill the 3-op pool: account 2 pays 10/op, account 3 pays 50/op.
        assert_eq!(queue.try_add(make_tx(2, 1, 20, 2)), AddResult::Pending);
        assert_eq!(queue.try_add(make_tx(3, 1, 50, 1)), AddResult::Pending);

        // A richer transaction evicts exactly the cheap tail.
        assert_eq!(queue.try_add(make_tx(1, 5, 200, 2)), AddResult::Pending);
        assert_eq!(queue.queue_size_ops(), 3);
        assert!(queue.get_account_transaction_queue_info(&account(2)).max_seq == 0);
        assert_eq!(queue.get_account_transaction_queue_info(&account(3)).max_seq, 1);
        queue.assert_invariants();
    }

    #[test]
    fn test_global_cap_rejects_cheapest_incoming() {
        let config = TxQueueConfig {
            pool_ledger_multiplier: 1,
            network_ledger_ops_cap: 2,
            ..Default::default()
        };
        let queue = make_queue(config);
        assert_eq!(queue.try_add(make_tx(2, 1, 100, 2)), AddResult::Pending);

        // 25/op vs the resident 50/op: the incoming one is the cheapest,
        // so it is the one "evicted".
        assert_eq!(queue.try_add(make_tx(3, 1, 25, 1)), AddResult::TryAgainLater);
        assert_eq!(queue.queue_size_ops(), 2);
        queue.assert_invariants();
    }

    #[test]
    fn test_to_tx_set_flattens_pool() {
        let queue = make_queue(TxQueueConfig::default());
        assert_eq!(queue.try_add(make_tx(1, 5, 100, 1)), AddResult::Pending);
        assert_eq!(queue.try_add(make_tx(2, 1, 100, 1)), AddResult::Pending);

        let lcl = LedgerHeaderInfo {
            ledger_seq: 9,
            close_time: 100,
            hash: Hash256::hash(b"lcl"),
        };
        let frame = queue.to_tx_set(&lcl);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.previous_ledger_hash(), lcl.hash);
    }

    #[test]
    fn test_oldest_cohort_tracks_near_ban_queues() {
        let config = TxQueueConfig {
            pending_depth: 4,
            ..Default::default()
        };
        let queue = make_queue(config);
        let old_tx = make_tx(1, 5, 100, 1);
        assert_eq!(queue.try_add(old_tx.clone()), AddResult::Pending);
        queue.shift();
        queue.shift();
        // Fresh transaction from another account.
        assert_eq!(queue.try_add(make_tx(2, 1, 100, 1)), AddResult::Pending);

        assert!(queue.oldest_cohort().is_empty());
        queue.shift();
        // Account 1 is now at age 3 == pending_depth - 1.
        let cohort = queue.oldest_cohort();
        assert_eq!(cohort.len(), 1);
        assert!(cohort.contains(&old_tx.full_hash()));
    }
}
