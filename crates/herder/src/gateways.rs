//! Capability traits the herder is constructed over.
//!
//! The herder never reaches back into an application object; everything it
//! needs from the rest of the node is passed in at construction as a small
//! bundle of capabilities:
//!
//! - [`LedgerGateway`]: the ledger engine (apply externalized sets, report
//!   the last closed ledger, current fees, sync state, account views)
//! - [`OverlayGateway`]: the peer-to-peer network (broadcast only; inbound
//!   traffic is pushed into the herder by the overlay)
//! - [`SlotMachine`]: the FBA consensus algorithm, driven through a narrow
//!   two-method contract; its callbacks arrive via
//!   [`FbaDriver`](crate::fba::FbaDriver)

use drover_xdr::{
    AccountId, FbaEnvelope, LedgerHeaderInfo, SequenceNumber, SlotIndex, StellarMessage, Value,
};

use crate::tx_set::TxSetFrame;

/// Callback reporting whether an envelope was accepted by the slot-machine.
pub type EnvelopeResultCb = Box<dyn FnOnce(bool) + Send>;

/// Coarse node state as reported by the ledger engine.
///
/// The herder only distinguishes [`AppState::Synced`]: the sync gate counts
/// down only while the engine reports it, and several validations are
/// relaxed while it does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Starting up; no ledger state yet.
    Booting,
    /// Downloading and applying history.
    CatchingUp,
    /// In sync with the network.
    Synced,
}

/// The ledger engine, as seen by the herder.
pub trait LedgerGateway: Send + Sync {
    /// Header snapshot of the last closed ledger.
    fn last_closed_ledger(&self) -> LedgerHeaderInfo;

    /// Hand an externalized transaction set to the ledger for application.
    ///
    /// Triggers the close-ledger flow; the engine reports back through
    /// `ledger_closed` on the herder.
    fn externalize_value(&self, tx_set: &TxSetFrame);

    /// Current per-transaction fee under the ledger's reserve rules.
    fn get_tx_fee(&self) -> i64;

    /// Current node state.
    fn get_state(&self) -> AppState;

    /// Committed sequence number of `account`, or `None` if the account
    /// does not exist on the ledger.
    fn account_seq(&self, account: &AccountId) -> Option<SequenceNumber>;

    /// Spendable balance of `account`, or `None` if it does not exist.
    fn account_balance(&self, account: &AccountId) -> Option<i64>;
}

/// The overlay network, as seen by the herder.
pub trait OverlayGateway: Send + Sync {
    /// Flood a message to peers.
    fn broadcast_message(&self, message: StellarMessage);
}

/// The FBA slot-machine, driven by the herder.
///
/// The algorithm itself (voting, accepting, confirming ballots) lives
/// outside this crate; the herder only injects values and envelopes and
/// reacts to the callbacks of [`FbaDriver`](crate::fba::FbaDriver).
pub trait SlotMachine: Send + Sync {
    /// Propose `value` for `slot_index`. With `bump_counter`, the ballot
    /// counter escalates past the current one (timeout recovery).
    fn prepare_value(&self, slot_index: SlotIndex, value: Value, bump_counter: bool);

    /// Deliver a peer envelope. `cb` reports whether it was accepted.
    fn receive_envelope(&self, envelope: FbaEnvelope, cb: EnvelopeResultCb);
}

/// Opaque peer handle used for fetch bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u64);
