//! Content-addressed artifact fetching.
//!
//! Consensus messages reference transaction sets and quorum sets by hash;
//! the artifacts themselves travel separately. [`ItemFetcher`] is the
//! request/serve cache that bridges the gap: a `fetch_item` miss broadcasts
//! a request to the overlay and the caller parks a continuation elsewhere;
//! `recv_item` reports whether anyone was waiting so the caller can resume
//! them.
//!
//! Transaction sets use two fetchers in a double buffer
//! ([`TxSetFetcherPair`]): on each externalization the buffer with the
//! closing ledger's sets is retired and the stale one is wiped, so retained
//! sets are bounded to two ledger windows while late requests for the
//! just-closed ledger can still be served.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use drover_common::Hash256;
use drover_xdr::{QuorumSet, StellarMessage};

use crate::gateways::{OverlayGateway, PeerId};
use crate::tx_set::TxSetFrame;

/// An artifact the fetcher can cache and request by content hash.
pub trait FetchableItem: Clone + Send + Sync {
    /// The artifact's content hash.
    fn content_hash(&self) -> Hash256;

    /// The overlay request message for an artifact with `hash`.
    fn request_message(hash: Hash256) -> StellarMessage;
}

impl FetchableItem for TxSetFrame {
    fn content_hash(&self) -> Hash256 {
        self.contents_hash()
    }

    fn request_message(hash: Hash256) -> StellarMessage {
        StellarMessage::GetTxSet(hash)
    }
}

impl FetchableItem for QuorumSet {
    fn content_hash(&self) -> Hash256 {
        self.hash()
    }

    fn request_message(hash: Hash256) -> StellarMessage {
        StellarMessage::GetFbaQuorumSet(hash)
    }
}

/// Bookkeeping for one outstanding fetch.
#[derive(Default)]
struct Tracker {
    /// Peers believed to have the artifact (from adverts); shrinks on
    /// `doesnt_have`.
    candidates: HashSet<PeerId>,
}

/// A content-addressed request/serve cache.
pub struct ItemFetcher<T> {
    overlay: Arc<dyn OverlayGateway>,
    items: RwLock<HashMap<Hash256, Arc<T>>>,
    trackers: RwLock<HashMap<Hash256, Tracker>>,
}

impl<T: FetchableItem> ItemFetcher<T> {
    /// Create a fetcher broadcasting requests through `overlay`.
    pub fn new(overlay: Arc<dyn OverlayGateway>) -> Self {
        Self {
            overlay,
            items: RwLock::new(HashMap::new()),
            trackers: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached artifact for `hash`, if present. On a miss with
    /// `ask_network`, start (or keep) an outstanding fetch by broadcasting
    /// the artifact's request message.
    pub fn fetch_item(&self, hash: Hash256, ask_network: bool) -> Option<Arc<T>> {
        if let Some(item) = self.items.read().get(&hash) {
            return Some(item.clone());
        }
        if ask_network {
            let newly_tracked = {
                let mut trackers = self.trackers.write();
                match trackers.entry(hash) {
                    std::collections::hash_map::Entry::Occupied(_) => false,
                    std::collections::hash_map::Entry::Vacant(entry) => {
                        entry.insert(Tracker::default());
                        true
                    }
                }
            };
            if newly_tracked {
                trace!(hash = %hash.to_short_hex(), "requesting artifact from network");
                self.overlay.broadcast_message(T::request_message(hash));
            }
        }
        None
    }

    /// Store an artifact. Returns `true` iff a fetch for its hash was
    /// outstanding, i.e. someone is waiting on it.
    pub fn recv_item(&self, item: T) -> bool {
        let hash = item.content_hash();
        let was_fetching = self.trackers.write().remove(&hash).is_some();
        self.items.write().insert(hash, Arc::new(item));
        trace!(hash = %hash.to_short_hex(), was_fetching, "received artifact");
        was_fetching
    }

    /// Record a peer as a candidate holder of `hash` (e.g. it advertised
    /// the artifact).
    pub fn add_candidate(&self, hash: Hash256, peer: PeerId) {
        if let Some(tracker) = self.trackers.write().get_mut(&hash) {
            tracker.candidates.insert(peer);
        }
    }

    /// A peer answered `DontHave` for `hash`: drop it from the candidate
    /// set, and once no candidates remain escalate with a fresh broadcast.
    pub fn doesnt_have(&self, hash: Hash256, peer: PeerId) {
        let escalate = {
            let mut trackers = self.trackers.write();
            match trackers.get_mut(&hash) {
                Some(tracker) => {
                    tracker.candidates.remove(&peer);
                    tracker.candidates.is_empty()
                }
                None => false,
            }
        };
        if escalate {
            debug!(hash = %hash.to_short_hex(), "no candidate peers left, re-broadcasting request");
            self.overlay.broadcast_message(T::request_message(hash));
        }
    }

    /// Whether a fetch for `hash` is outstanding.
    pub fn is_fetching(&self, hash: &Hash256) -> bool {
        self.trackers.read().contains_key(hash)
    }

    /// Abandon all outstanding fetches, keeping cached artifacts.
    pub fn stop_fetching_all(&self) {
        self.trackers.write().clear();
    }

    /// Drop all trackers and cached artifacts.
    pub fn clear(&self) {
        self.trackers.write().clear();
        self.items.write().clear();
    }

    /// Number of cached artifacts.
    pub fn cached_count(&self) -> usize {
        self.items.read().len()
    }

    /// Number of outstanding fetches.
    pub fn fetching_count(&self) -> usize {
        self.trackers.read().len()
    }
}

/// The double-buffered pair of transaction-set fetchers.
///
/// All reads and writes go to the *current* fetcher. On externalization,
/// [`rotate`](Self::rotate) abandons the current buffer's outstanding
/// fetches, makes the other buffer current and wipes it, so the retired
/// buffer keeps serving the just-closed ledger's sets for one more window.
pub struct TxSetFetcherPair {
    fetchers: [ItemFetcher<TxSetFrame>; 2],
    current: RwLock<usize>,
}

impl TxSetFetcherPair {
    /// Create the pair over `overlay`.
    pub fn new(overlay: Arc<dyn OverlayGateway>) -> Self {
        Self {
            fetchers: [
                ItemFetcher::new(overlay.clone()),
                ItemFetcher::new(overlay),
            ],
            current: RwLock::new(0),
        }
    }

    /// The current buffer.
    pub fn current(&self) -> &ItemFetcher<TxSetFrame> {
        &self.fetchers[*self.current.read()]
    }

    /// Swap buffers at an externalization boundary.
    pub fn rotate(&self) {
        let mut current = self.current.write();
        self.fetchers[*current].stop_fetching_all();
        *current = 1 - *current;
        self.fetchers[*current].clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingOverlay {
        messages: Mutex<Vec<StellarMessage>>,
    }

    impl OverlayGateway for RecordingOverlay {
        fn broadcast_message(&self, message: StellarMessage) {
            self.messages.lock().push(message);
        }
    }

    fn make_qset(id: u8) -> QuorumSet {
        QuorumSet {
            threshold: 1,
            validators: vec![drover_xdr::NodeId([id; 32])],
        }
    }

    #[test]
    fn test_fetch_miss_asks_network_once() {
        let overlay = Arc::new(RecordingOverlay::default());
        let fetcher: ItemFetcher<QuorumSet> = ItemFetcher::new(overlay.clone());
        let hash = make_qset(1).hash();

        assert!(fetcher.fetch_item(hash, true).is_none());
        assert!(fetcher.fetch_item(hash, true).is_none());
        // Only the first miss broadcasts; the second sees the tracker.
        assert_eq!(overlay.messages.lock().len(), 1);
        assert!(matches!(
            overlay.messages.lock()[0],
            StellarMessage::GetFbaQuorumSet(h) if h == hash
        ));
    }

    #[test]
    fn test_fetch_miss_without_ask_is_silent() {
        let overlay = Arc::new(RecordingOverlay::default());
        let fetcher: ItemFetcher<QuorumSet> = ItemFetcher::new(overlay.clone());

        assert!(fetcher.fetch_item(make_qset(1).hash(), false).is_none());
        assert!(overlay.messages.lock().is_empty());
        assert_eq!(fetcher.fetching_count(), 0);
    }

    #[test]
    fn test_recv_then_fetch_round_trip() {
        let overlay = Arc::new(RecordingOverlay::default());
        let fetcher: ItemFetcher<QuorumSet> = ItemFetcher::new(overlay);
        let qset = make_qset(2);
        let hash = qset.hash();

        // Nobody waiting yet.
        assert!(!fetcher.recv_item(qset.clone()));
        let fetched = fetcher.fetch_item(hash, false).unwrap();
        assert_eq!(*fetched, qset);
    }

    #[test]
    fn test_recv_reports_outstanding_fetch() {
        let overlay = Arc::new(RecordingOverlay::default());
        let fetcher: ItemFetcher<QuorumSet> = ItemFetcher::new(overlay);
        let qset = make_qset(3);

        assert!(fetcher.fetch_item(qset.hash(), true).is_none());
        assert!(fetcher.recv_item(qset.clone()));
        // Second receipt: nobody waiting anymore.
        assert!(!fetcher.recv_item(qset));
    }

    #[test]
    fn test_doesnt_have_escalates_when_candidates_exhausted() {
        let overlay = Arc::new(RecordingOverlay::default());
        let fetcher: ItemFetcher<QuorumSet> = ItemFetcher::new(overlay.clone());
        let hash = make_qset(4).hash();

        fetcher.fetch_item(hash, true);
        fetcher.add_candidate(hash, PeerId(1));
        fetcher.add_candidate(hash, PeerId(2));
        assert_eq!(overlay.messages.lock().len(), 1);

        fetcher.doesnt_have(hash, PeerId(1));
        assert_eq!(overlay.messages.lock().len(), 1);
        fetcher.doesnt_have(hash, PeerId(2));
        assert_eq!(overlay.messages.lock().len(), 2);

        // Unknown hash: no escalation.
        fetcher.doesnt_have(make_qset(9).hash(), PeerId(1));
        assert_eq!(overlay.messages.lock().len(), 2);
    }

    #[test]
    fn test_stop_fetching_keeps_items() {
        let overlay = Arc::new(RecordingOverlay::default());
        let fetcher: ItemFetcher<QuorumSet> = ItemFetcher::new(overlay);
        let qset = make_qset(5);
        let hash = qset.hash();

        fetcher.fetch_item(make_qset(6).hash(), true);
        fetcher.recv_item(qset);
        fetcher.stop_fetching_all();

        assert_eq!(fetcher.fetching_count(), 0);
        assert!(fetcher.fetch_item(hash, false).is_some());
    }

    #[test]
    fn test_rotate_retires_and_wipes() {
        let overlay = Arc::new(RecordingOverlay::default());
        let pair = TxSetFetcherPair::new(overlay);

        let mut frame = TxSetFrame::new(Hash256::hash(b"lcl"));
        frame.add(drover_xdr::TransactionEnvelope {
            source_account: drover_xdr::AccountId([1; 32]),
            seq_num: 1,
            fee_bid: 10,
            operations: vec![drover_xdr::Operation(vec![0])],
            signature: drover_crypto::Signature::ZERO,
        });
        let hash = frame.contents_hash();
        pair.current().recv_item(frame);
        assert!(pair.current().fetch_item(hash, false).is_some());

        // First rotation: the set lives in the retired buffer; the new
        // current is empty.
        pair.rotate();
        assert!(pair.current().fetch_item(hash, false).is_none());

        // Second rotation comes back to the original buffer and wipes it.
        pair.rotate();
        assert!(pair.current().fetch_item(hash, false).is_none());
        assert_eq!(pair.current().cached_count(), 0);
    }
}
