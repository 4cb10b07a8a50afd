//! The consensus coordinator.
//!
//! The `Herder` sits between the overlay network, the ledger engine and the
//! FBA slot-machine. It:
//!
//! - admits transactions into the pending queue and floods them to peers
//! - validates candidate values and ballots on behalf of the slot-machine,
//!   suspending on artifacts that are still being fetched
//! - times the consensus rounds: a trigger timer proposes the next ledger's
//!   value on a fixed cadence, and a bump timer escalates the ballot
//!   counter when a heard-from quorum stalls
//! - buffers envelopes for future slots and replays them at that slot's
//!   trigger
//! - reacts to externalization: rotates the transaction-set fetchers,
//!   hands the decided set to the ledger and reconciles the queue
//!
//! # Participation gate
//!
//! A freshly started node observes passively for three ledger closes after
//! the ledger engine reports itself synced. While the gate is open the
//! herder validates leniently (no slot or close-time checks), emits
//! nothing, and never arms the bump timer.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use drover_common::{Hash256, TimerEvent, VirtualClock, VirtualTimer};
use drover_xdr::{
    FbaBallot, FbaEnvelope, LedgerHeaderInfo, NodeId, QuorumSet, SlotIndex, StellarMessage,
    StellarValue, TransactionEnvelope, Value,
};

use crate::config::HerderConfig;
use crate::error::{HerderError, Result};
use crate::fba::{FbaDriver, QuorumSetCb, ValidationCb};
use crate::gateways::{
    AppState, EnvelopeResultCb, LedgerGateway, OverlayGateway, PeerId, SlotMachine,
};
use crate::item_fetcher::{ItemFetcher, TxSetFetcherPair};
use crate::tx_queue::{AddResult, TransactionQueue};
use crate::tx_set::TxSetFrame;

/// Ledger closes to observe passively after the node reports synced.
const LEDGERS_TO_WAIT_TO_PARTICIPATE: u32 = 3;

/// A validation parked on a transaction set that is still being fetched.
///
/// Resumed exactly once when the set first arrives; the callback is
/// consumed by the resume.
enum PendingValidation {
    Value {
        slot_index: SlotIndex,
        node_id: NodeId,
        cb: ValidationCb,
    },
    Ballot {
        slot_index: SlotIndex,
        node_id: NodeId,
        cb: ValidationCb,
    },
}

/// The consensus coordinator. See the module docs for the big picture.
pub struct Herder {
    config: HerderConfig,
    clock: VirtualClock,
    ledger: Arc<dyn LedgerGateway>,
    overlay: Arc<dyn OverlayGateway>,
    slot_machine: RwLock<Option<Arc<dyn SlotMachine>>>,
    node_id: NodeId,

    tx_queue: TransactionQueue,
    tx_set_fetchers: TxSetFetcherPair,
    quorum_set_fetcher: ItemFetcher<QuorumSet>,

    /// Validations waiting on a transaction set, by content hash.
    tx_set_fetches: Mutex<HashMap<Hash256, Vec<PendingValidation>>>,
    /// Retrievals waiting on a quorum set, by content hash.
    quorum_set_fetches: Mutex<HashMap<Hash256, Vec<QuorumSetCb>>>,
    /// Envelopes for slots beyond the next one, replayed at that slot's
    /// trigger.
    future_envelopes: Mutex<HashMap<SlotIndex, Vec<(FbaEnvelope, EnvelopeResultCb)>>>,

    /// Sync gate; participation is passive while positive.
    ledgers_to_wait_to_participate: RwLock<u32>,
    last_closed_ledger: RwLock<LedgerHeaderInfo>,
    /// When consensus was last triggered, clock milliseconds.
    last_trigger: RwLock<u64>,
    /// Our current proposal for the open slot.
    local_value: RwLock<Option<Value>>,

    trigger_timer: Mutex<VirtualTimer>,
    bump_timer: Mutex<VirtualTimer>,

    self_ref: RwLock<Weak<Herder>>,
}

impl Herder {
    /// Build a herder over its capability bundle.
    ///
    /// Validates the configuration, derives the node identity from the
    /// validation key, and seeds the quorum-set cache with our own quorum
    /// set so peers can fetch it immediately.
    pub fn new(
        config: HerderConfig,
        clock: VirtualClock,
        ledger: Arc<dyn LedgerGateway>,
        overlay: Arc<dyn OverlayGateway>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let node_id = if config.validation_key.is_empty() {
            NodeId::default()
        } else {
            NodeId(*config.secret_key()?.public_key().as_bytes())
        };
        let local_quorum_set = config.local_quorum_set()?;
        let tx_queue = TransactionQueue::new(config.tx_queue_config(), ledger.clone());
        let last_closed_ledger = ledger.last_closed_ledger();

        let herder = Arc::new(Self {
            node_id,
            tx_queue,
            tx_set_fetchers: TxSetFetcherPair::new(overlay.clone()),
            quorum_set_fetcher: ItemFetcher::new(overlay.clone()),
            tx_set_fetches: Mutex::new(HashMap::new()),
            quorum_set_fetches: Mutex::new(HashMap::new()),
            future_envelopes: Mutex::new(HashMap::new()),
            ledgers_to_wait_to_participate: RwLock::new(LEDGERS_TO_WAIT_TO_PARTICIPATE),
            last_closed_ledger: RwLock::new(last_closed_ledger),
            last_trigger: RwLock::new(clock.now_ms()),
            local_value: RwLock::new(None),
            trigger_timer: Mutex::new(VirtualTimer::new(clock.clone())),
            bump_timer: Mutex::new(VirtualTimer::new(clock.clone())),
            self_ref: RwLock::new(Weak::new()),
            slot_machine: RwLock::new(None),
            config,
            clock,
            ledger,
            overlay,
        });
        *herder.self_ref.write() = Arc::downgrade(&herder);
        herder.recv_fba_quorum_set(local_quorum_set);
        Ok(herder)
    }

    /// Attach the slot-machine. Must happen before consensus traffic flows.
    pub fn set_slot_machine(&self, slot_machine: Arc<dyn SlotMachine>) {
        *self.slot_machine.write() = Some(slot_machine);
    }

    fn slot_machine(&self) -> Option<Arc<dyn SlotMachine>> {
        self.slot_machine.read().clone()
    }

    fn weak(&self) -> Weak<Herder> {
        self.self_ref.read().clone()
    }

    /// This node's identity.
    pub fn local_node_id(&self) -> NodeId {
        self.node_id
    }

    /// The pending-transaction pool.
    pub fn tx_queue(&self) -> &TransactionQueue {
        &self.tx_queue
    }

    /// Whether the participation gate has fully opened.
    pub fn synced(&self) -> bool {
        *self.ledgers_to_wait_to_participate.read() == 0
    }

    /// Remaining passive ledger closes.
    pub fn ledgers_to_wait_to_participate(&self) -> u32 {
        *self.ledgers_to_wait_to_participate.read()
    }

    /// Snapshot of the last closed ledger.
    pub fn last_closed_ledger(&self) -> LedgerHeaderInfo {
        *self.last_closed_ledger.read()
    }

    /// Start a brand-new network.
    ///
    /// Requires `start_new_network`; snapshots the genesis ledger, opens
    /// the participation gate and triggers the first consensus round
    /// immediately.
    pub fn bootstrap(&self) -> Result<()> {
        if !self.config.start_new_network {
            return Err(HerderError::NotBootstrapped);
        }
        *self.last_closed_ledger.write() = self.ledger.last_closed_ledger();
        *self.ledgers_to_wait_to_participate.write() = 0;
        info!(node = %self.node_id, "bootstrapping new network");
        self.trigger_next_ledger();
        Ok(())
    }

    // =========================================================================
    // Inbound from the overlay
    // =========================================================================

    /// Admit a flooded transaction; a `Pending` verdict re-floods it.
    pub fn recv_transaction(&self, tx: TransactionEnvelope) -> AddResult {
        let result = self.tx_queue.try_add(tx.clone());
        trace!(
            hash = %tx.full_hash().to_short_hex(),
            result = result.as_str(),
            "received transaction"
        );
        if result == AddResult::Pending {
            self.overlay
                .broadcast_message(StellarMessage::Transaction(tx));
        }
        result
    }

    /// Receive a transaction set from the overlay.
    ///
    /// When a fetch was outstanding, its member transactions are offered to
    /// the queue and every validation parked on this hash resumes, exactly
    /// once.
    pub fn recv_tx_set(&self, frame: TxSetFrame) {
        let hash = frame.contents_hash();
        if self.tx_set_fetchers.current().recv_item(frame.clone()) {
            for tx in frame.txs() {
                let _ = self.tx_queue.try_add(tx.clone());
            }
            let parked = self.tx_set_fetches.lock().remove(&hash);
            if let Some(parked) = parked {
                debug!(
                    hash = %hash.to_short_hex(),
                    resumed = parked.len(),
                    "transaction set arrived, resuming validations"
                );
                for pending in parked {
                    self.finish_tx_set_validation(pending, &frame);
                }
            }
        }
    }

    /// Receive a quorum set from the overlay; drains parked retrievals.
    pub fn recv_fba_quorum_set(&self, quorum_set: QuorumSet) {
        let hash = quorum_set.hash();
        if self.quorum_set_fetcher.recv_item(quorum_set.clone()) {
            let parked = self.quorum_set_fetches.lock().remove(&hash);
            if let Some(parked) = parked {
                debug!(
                    hash = %hash.to_short_hex(),
                    resumed = parked.len(),
                    "quorum set arrived, resuming retrievals"
                );
                for cb in parked {
                    cb(quorum_set.clone());
                }
            }
        }
    }

    /// A peer advertised that it may have a transaction set we are
    /// fetching.
    pub fn tx_set_candidate(&self, hash: Hash256, peer: PeerId) {
        self.tx_set_fetchers.current().add_candidate(hash, peer);
    }

    /// A peer advertised that it may have a quorum set we are fetching.
    pub fn quorum_set_candidate(&self, hash: Hash256, peer: PeerId) {
        self.quorum_set_fetcher.add_candidate(hash, peer);
    }

    /// A peer reported it does not have a transaction set.
    pub fn doesnt_have_tx_set(&self, hash: Hash256, peer: PeerId) {
        self.tx_set_fetchers.current().doesnt_have(hash, peer);
    }

    /// A peer reported it does not have a quorum set.
    pub fn doesnt_have_fba_quorum_set(&self, hash: Hash256, peer: PeerId) {
        self.quorum_set_fetcher.doesnt_have(hash, peer);
    }

    /// Route an incoming consensus envelope.
    ///
    /// Once synced: envelopes outside the validity bracket are dropped,
    /// envelopes for slots beyond the next are buffered for replay at that
    /// slot's trigger, and everything else goes to the slot-machine in
    /// receipt order.
    pub fn recv_fba_envelope(&self, envelope: FbaEnvelope, cb: EnvelopeResultCb) {
        let slot = envelope.slot_index();
        if self.synced() {
            let lcl = self.last_closed_ledger();
            let current = lcl.ledger_seq as u64;
            let min_slot = current.saturating_sub(self.config.ledger_validity_bracket);
            let max_slot = current + self.config.ledger_validity_bracket;
            if slot < min_slot || slot > max_slot {
                debug!(slot, min_slot, max_slot, "dropping envelope outside validity bracket");
                return;
            }
            if slot > current + 1 {
                trace!(slot, "buffering envelope for future slot");
                self.future_envelopes
                    .lock()
                    .entry(slot)
                    .or_default()
                    .push((envelope, cb));
                return;
            }
        }
        match self.slot_machine() {
            Some(slot_machine) => slot_machine.receive_envelope(envelope, cb),
            None => warn!(slot, "no slot machine attached, dropping envelope"),
        }
    }

    // =========================================================================
    // Ledger events and timers
    // =========================================================================

    /// The ledger engine closed a ledger.
    ///
    /// Updates the snapshot, walks the participation gate down while the
    /// engine reports synced, ages the transaction pool, and re-arms the
    /// trigger timer to fire one timespan after the previous trigger.
    pub fn ledger_closed(&self, header: LedgerHeaderInfo) {
        trace!(
            ledger_seq = header.ledger_seq,
            hash = %header.hash.to_short_hex(),
            "ledger closed"
        );
        *self.last_closed_ledger.write() = header;

        {
            let mut gate = self.ledgers_to_wait_to_participate.write();
            if *gate > 0 && self.ledger.get_state() == AppState::Synced {
                *gate -= 1;
                info!(remaining = *gate, "participation gate ticked down");
            }
        }

        self.tx_queue.shift();

        if !self.synced() {
            return;
        }

        let timespan_ms = self.config.exp_ledger_timespan_secs * 1000;
        let elapsed = self
            .clock
            .now_ms()
            .saturating_sub(*self.last_trigger.read());
        let delay = timespan_ms.saturating_sub(elapsed);
        let weak = self.weak();
        self.trigger_timer.lock().expires_from_now(
            Duration::from_millis(delay),
            move |event| {
                if event != TimerEvent::Expired {
                    return;
                }
                if let Some(herder) = weak.upgrade() {
                    herder.trigger_next_ledger();
                }
            },
        );
    }

    /// Open the next slot: assemble a proposal from the queue and hand it
    /// to the slot-machine, then replay any envelopes buffered for the
    /// slot.
    pub fn trigger_next_ledger(&self) {
        *self.last_trigger.write() = self.clock.now_ms();
        let lcl = self.last_closed_ledger();
        let slot = lcl.ledger_seq as u64 + 1;

        let proposed = self.tx_queue.to_tx_set(&lcl);
        let tx_set_hash = proposed.contents_hash();
        info!(
            slot,
            txs = proposed.len(),
            tx_set = %tx_set_hash.to_short_hex(),
            "triggering next ledger"
        );
        // Our own proposal must be servable to peers like any fetched set.
        self.recv_tx_set(proposed);

        let now_secs = self.clock.now_secs();
        let next_close_time = if now_secs <= lcl.close_time {
            lcl.close_time + 1
        } else {
            now_secs
        };

        let value = StellarValue {
            tx_set_hash,
            close_time: next_close_time,
            base_fee: self.config.desired_base_fee,
        }
        .to_value();
        *self.local_value.write() = Some(value.clone());

        if let Some(slot_machine) = self.slot_machine() {
            slot_machine.prepare_value(slot, value, false);
        }

        let buffered = self.future_envelopes.lock().remove(&slot);
        if let Some(buffered) = buffered {
            debug!(slot, count = buffered.len(), "replaying buffered envelopes");
            for (envelope, cb) in buffered {
                self.recv_fba_envelope(envelope, cb);
            }
        }
    }

    /// The bump timer fired: re-propose our value with an escalated ballot
    /// counter.
    fn expire_ballot(&self, slot_index: SlotIndex, _ballot: &FbaBallot) {
        let lcl = self.last_closed_ledger();
        assert_eq!(
            slot_index,
            lcl.ledger_seq as u64 + 1,
            "ballot expired for a slot that is not the open one"
        );
        let value = self.local_value.read().clone();
        match (value, self.slot_machine()) {
            (Some(value), Some(slot_machine)) => {
                debug!(slot_index, "ballot timed out, bumping counter");
                slot_machine.prepare_value(slot_index, value, true);
            }
            _ => warn!(slot_index, "ballot expired without a local value"),
        }
    }

    // =========================================================================
    // Validation plumbing
    // =========================================================================

    /// Look up a transaction set in the current fetcher buffer.
    pub fn fetch_tx_set(&self, hash: Hash256, ask_network: bool) -> Option<Arc<TxSetFrame>> {
        self.tx_set_fetchers.current().fetch_item(hash, ask_network)
    }

    /// Look up a quorum set.
    pub fn fetch_quorum_set(&self, hash: Hash256, ask_network: bool) -> Option<Arc<QuorumSet>> {
        self.quorum_set_fetcher.fetch_item(hash, ask_network)
    }

    fn finish_tx_set_validation(&self, pending: PendingValidation, frame: &TxSetFrame) {
        match pending {
            PendingValidation::Value {
                slot_index,
                node_id,
                cb,
            } => self.finish_validate_value(slot_index, node_id, frame, cb),
            PendingValidation::Ballot {
                slot_index,
                node_id,
                cb,
            } => self.finish_validate_ballot(slot_index, node_id, frame, cb),
        }
    }

    fn finish_validate_value(
        &self,
        slot_index: SlotIndex,
        node_id: NodeId,
        frame: &TxSetFrame,
        cb: ValidationCb,
    ) {
        if self.synced() && !frame.check_valid(&self.last_closed_ledger()) {
            debug!(
                slot_index,
                node = %node_id,
                tx_set = %frame.contents_hash().to_short_hex(),
                "invalid tx set in candidate value"
            );
            return cb(false);
        }
        trace!(slot_index, node = %node_id, "candidate value validated");
        cb(true)
    }

    fn finish_validate_ballot(
        &self,
        slot_index: SlotIndex,
        node_id: NodeId,
        frame: &TxSetFrame,
        cb: ValidationCb,
    ) {
        // Liveness: a candidate set must carry every transaction we have
        // held long enough that it risks aging out.
        let members: std::collections::HashSet<Hash256> =
            frame.tx_hashes().into_iter().collect();
        for hash in self.tx_queue.oldest_cohort() {
            if !members.contains(&hash) {
                debug!(
                    slot_index,
                    node = %node_id,
                    missing = %hash.to_short_hex(),
                    "ballot tx set omits an aged local transaction"
                );
                return cb(false);
            }
        }
        trace!(slot_index, node = %node_id, "ballot validated");
        cb(true)
    }
}

impl FbaDriver for Herder {
    fn validate_value(
        &self,
        slot_index: SlotIndex,
        node_id: NodeId,
        value: &Value,
        cb: ValidationCb,
    ) {
        let b = match StellarValue::from_value(value) {
            Ok(b) => b,
            Err(_) => {
                debug!(slot_index, node = %node_id, "undecodable candidate value");
                return cb(false);
            }
        };

        // Tests against the last closed ledger only once fully synced.
        if self.synced() {
            let lcl = self.last_closed_ledger();
            if slot_index != lcl.ledger_seq as u64 + 1 {
                return cb(false);
            }
            if b.close_time <= lcl.close_time {
                return cb(false);
            }
        }

        match self.fetch_tx_set(b.tx_set_hash, true) {
            Some(frame) => self.finish_validate_value(slot_index, node_id, &frame, cb),
            None => {
                trace!(
                    slot_index,
                    tx_set = %b.tx_set_hash.to_short_hex(),
                    "value validation waiting on tx set"
                );
                self.tx_set_fetches
                    .lock()
                    .entry(b.tx_set_hash)
                    .or_default()
                    .push(PendingValidation::Value {
                        slot_index,
                        node_id,
                        cb,
                    });
            }
        }
    }

    fn validate_ballot(
        &self,
        slot_index: SlotIndex,
        node_id: NodeId,
        ballot: &FbaBallot,
        cb: ValidationCb,
    ) {
        let b = match StellarValue::from_value(&ballot.value) {
            Ok(b) => b,
            Err(_) => {
                debug!(slot_index, node = %node_id, "undecodable ballot value");
                return cb(false);
            }
        };

        // Close time must not sit in the future beyond clock skew.
        let now = self.clock.now_secs();
        if b.close_time > now + self.config.max_time_slip_secs {
            return cb(false);
        }

        // The ballot counter must be explicable by elapsed time: a counter
        // of k implies the sum of the first k timeouts has passed since our
        // last trigger (modulo clock skew). This blocks counter-exhaustion
        // storms.
        let last_trigger_secs = *self.last_trigger.read() / 1000;
        let mut sum_timeouts: u64 = 0;
        for i in 0..ballot.counter {
            let exponential = if i < 63 { 1u64 << i } else { u64::MAX };
            sum_timeouts =
                sum_timeouts.saturating_add(exponential.min(self.config.max_fba_timeout_secs));
        }
        if now + self.config.max_time_slip_secs < last_trigger_secs.saturating_add(sum_timeouts) {
            debug!(
                slot_index,
                node = %node_id,
                counter = ballot.counter,
                "ballot counter ahead of elapsed time"
            );
            return cb(false);
        }

        // Base fee within range of what we would propose.
        let desired = self.config.desired_base_fee as u64;
        if (b.base_fee as u64) * 2 < desired {
            return cb(false);
        }
        if b.base_fee as u64 > desired * 2 {
            return cb(false);
        }

        match self.fetch_tx_set(b.tx_set_hash, true) {
            Some(frame) => self.finish_validate_ballot(slot_index, node_id, &frame, cb),
            None => {
                trace!(
                    slot_index,
                    tx_set = %b.tx_set_hash.to_short_hex(),
                    "ballot validation waiting on tx set"
                );
                self.tx_set_fetches
                    .lock()
                    .entry(b.tx_set_hash)
                    .or_default()
                    .push(PendingValidation::Ballot {
                        slot_index,
                        node_id,
                        cb,
                    });
            }
        }
    }

    fn retrieve_quorum_set(&self, node_id: NodeId, quorum_set_hash: Hash256, cb: QuorumSetCb) {
        debug!(node = %node_id, qset = %quorum_set_hash.to_short_hex(), "retrieving quorum set");
        match self.fetch_quorum_set(quorum_set_hash, true) {
            Some(quorum_set) => cb((*quorum_set).clone()),
            None => {
                self.quorum_set_fetches
                    .lock()
                    .entry(quorum_set_hash)
                    .or_default()
                    .push(cb);
            }
        }
    }

    fn emit_envelope(&self, envelope: &FbaEnvelope) {
        let gate = self.ledgers_to_wait_to_participate();
        if gate > 0 {
            debug!(gate, "not emitting envelope while participation is gated");
            return;
        }
        self.overlay
            .broadcast_message(StellarMessage::FbaMessage(envelope.clone()));
    }

    fn ballot_did_hear_from_quorum(&self, slot_index: SlotIndex, ballot: &FbaBallot) {
        // Without full participation we simply never time the protocol out.
        if !self.synced() {
            return;
        }
        let lcl = self.last_closed_ledger();
        assert_eq!(
            slot_index,
            lcl.ledger_seq as u64 + 1,
            "heard from quorum for a slot that is not the open one"
        );

        let delay = Duration::from_secs(1u64 << ballot.counter.min(63));
        debug!(slot_index, counter = ballot.counter, delay_secs = delay.as_secs(), "arming bump timer");
        let weak = self.weak();
        let slot = slot_index;
        let ballot = ballot.clone();
        self.bump_timer
            .lock()
            .expires_from_now(delay, move |event| {
                if event != TimerEvent::Expired {
                    return;
                }
                if let Some(herder) = weak.upgrade() {
                    herder.expire_ballot(slot, &ballot);
                }
            });
    }

    fn value_externalized(&self, slot_index: SlotIndex, value: &Value) {
        self.bump_timer.lock().cancel();

        let b = match StellarValue::from_value(value) {
            Ok(b) => b,
            Err(_) => {
                // Validation fetched and decoded this value before the
                // slot-machine could externalize it, so this is a bug.
                error!(slot_index, "externalized value is malformed");
                return;
            }
        };
        info!(
            slot_index,
            tx_set = %b.tx_set_hash.to_short_hex(),
            close_time = b.close_time,
            "value externalized"
        );

        let frame = match self.fetch_tx_set(b.tx_set_hash, false) {
            Some(frame) => frame,
            None => {
                // Same invariant: the set was fetched during validation.
                error!(
                    slot_index,
                    tx_set = %b.tx_set_hash.to_short_hex(),
                    "externalized tx set not in cache"
                );
                return;
            }
        };

        if self.synced() {
            let lcl = self.last_closed_ledger();
            assert_eq!(
                slot_index,
                lcl.ledger_seq as u64 + 1,
                "externalized a slot that is not the open one"
            );
        }

        // Retire the closing ledger's fetch window.
        self.tx_set_fetchers.rotate();

        self.ledger.externalize_value(&frame);
        self.tx_queue.remove_and_reset(frame.txs());

        // Re-flood transactions that have lingered across a close so the
        // network converges on them.
        for tx in self.tx_queue.txs_with_min_age(1) {
            self.overlay
                .broadcast_message(StellarMessage::Transaction(tx));
        }
    }
}
