//! The callback contract between the FBA slot-machine and the herder.
//!
//! The slot-machine is a pure agreement algorithm: it does not know how to
//! validate a value, where quorum sets come from, or how envelopes reach
//! peers. All of that context is delegated through [`FbaDriver`], which the
//! herder implements.
//!
//! # Suspension
//!
//! `validate_value`, `validate_ballot` and `retrieve_quorum_set` may
//! *suspend*: when the artifact behind a content hash is not yet fetched,
//! the driver records the callback keyed by that hash and returns without
//! invoking it. The callback runs exactly once when the artifact first
//! arrives. On a cache hit the callback is invoked synchronously on the
//! same task.

use std::cmp::Ordering;

use drover_common::Hash256;
use drover_xdr::{FbaBallot, NodeId, QuorumSet, SlotIndex, Value};

/// Callback reporting a validation verdict.
pub type ValidationCb = Box<dyn FnOnce(bool) + Send>;

/// Callback delivering a retrieved quorum set.
pub type QuorumSetCb = Box<dyn FnOnce(QuorumSet) + Send>;

/// Callbacks the slot-machine invokes on its driver.
pub trait FbaDriver: Send + Sync {
    /// Is `value` an acceptable outcome for `slot_index`, as proposed by
    /// `node_id`? May suspend on a missing transaction set.
    fn validate_value(&self, slot_index: SlotIndex, node_id: NodeId, value: &Value, cb: ValidationCb);

    /// Is `ballot` acceptable for `slot_index`? Applies the timing and fee
    /// discipline on top of value validation. May suspend on a missing
    /// transaction set.
    fn validate_ballot(
        &self,
        slot_index: SlotIndex,
        node_id: NodeId,
        ballot: &FbaBallot,
        cb: ValidationCb,
    );

    /// Resolve the quorum set `node_id` referenced by hash. May suspend on
    /// a missing quorum set.
    fn retrieve_quorum_set(&self, node_id: NodeId, quorum_set_hash: Hash256, cb: QuorumSetCb);

    /// Broadcast a statement of ours to the network.
    fn emit_envelope(&self, envelope: &drover_xdr::FbaEnvelope);

    /// A quorum was heard for `ballot`; the driver should arm its timeout
    /// escalation.
    fn ballot_did_hear_from_quorum(&self, slot_index: SlotIndex, ballot: &FbaBallot);

    /// Consensus was reached: `value` is the decided outcome of
    /// `slot_index`.
    fn value_externalized(&self, slot_index: SlotIndex, value: &Value);

    /// Total order over values: lexicographic comparison of the canonical
    /// encoding.
    fn compare_values(&self, v1: &Value, v2: &Value) -> Ordering {
        v1.cmp(v2)
    }
}
