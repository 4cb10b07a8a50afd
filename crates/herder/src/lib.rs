//! Consensus coordination for drover.
//!
//! This crate is the bridge between three collaborators that know nothing
//! about each other: the overlay network, the ledger engine, and the FBA
//! slot-machine. It owns the state that spans them:
//!
//! - [`TransactionQueue`]: the per-account pending pool proposals are drawn
//!   from, with aging, banning and fee discipline
//! - [`ItemFetcher`]: content-addressed request/serve caches for
//!   transaction sets and quorum sets, with suspended-validation resume
//! - [`Herder`]: the per-slot coordinator — validation callbacks for the
//!   slot-machine, the trigger and bump timers, the participation gate and
//!   the future-envelope buffer
//!
//! # Wiring
//!
//! ```ignore
//! use drover_herder::{Herder, HerderConfig};
//!
//! let herder = Herder::new(config, clock, ledger, overlay)?;
//! herder.set_slot_machine(slot_machine);
//!
//! // Inbound traffic from the overlay:
//! herder.recv_transaction(tx);
//! herder.recv_fba_envelope(envelope, cb);
//!
//! // The ledger engine reports closes:
//! herder.ledger_closed(header);
//! ```

pub mod config;
pub mod error;
pub mod fba;
pub mod gateways;
pub mod herder;
pub mod item_fetcher;
pub mod tx_queue;
pub mod tx_set;

pub use config::HerderConfig;
pub use error::{HerderError, Result};
pub use fba::{FbaDriver, QuorumSetCb, ValidationCb};
pub use gateways::{AppState, EnvelopeResultCb, LedgerGateway, OverlayGateway, PeerId, SlotMachine};
pub use herder::Herder;
pub use item_fetcher::{FetchableItem, ItemFetcher, TxSetFetcherPair};
pub use tx_queue::{AccountTxQueueInfo, AddResult, ShiftResult, TransactionQueue, TxQueueConfig};
pub use tx_set::TxSetFrame;
