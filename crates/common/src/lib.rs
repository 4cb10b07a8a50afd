//! Shared foundation types for drover.
//!
//! This crate holds the pieces every other drover crate needs:
//!
//! - [`Hash256`]: the 32-byte content hash used to address every artifact
//!   on the wire (transaction sets, quorum sets, transactions)
//! - [`time`]: Unix timestamp helpers, plus the [`VirtualClock`] and
//!   [`VirtualTimer`] that drive the consensus coordinator's timeouts

pub mod time;
pub mod types;

pub use time::{current_timestamp, current_timestamp_ms, TimerEvent, VirtualClock, VirtualTimer};
pub use types::Hash256;
