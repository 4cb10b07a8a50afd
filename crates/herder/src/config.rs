//! Herder configuration.
//!
//! Loadable from a TOML file or built programmatically; every field has a
//! default so a config file only needs to name what it changes. Call
//! [`HerderConfig::validate`] before handing the config to the herder.
//!
//! # Example Configuration
//!
//! ```toml
//! validation_key = "0707...07"            # hex seed, 64 chars
//! quorum_threshold = 2
//! quorum_set = ["ab12...", "cd34..."]     # hex node ids
//! desired_base_fee = 10
//! exp_ledger_timespan_secs = 5
//! start_new_network = true
//! ```

use serde::Deserialize;
use std::path::Path;

use drover_crypto::SecretKey;
use drover_xdr::{NodeId, QuorumSet};

use crate::error::{HerderError, Result};
use crate::tx_queue::TxQueueConfig;

/// Configuration for the consensus coordinator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HerderConfig {
    /// Hex-encoded Ed25519 seed identifying this node. Required to
    /// bootstrap a new network or participate as a validator.
    pub validation_key: String,

    /// How many of `quorum_set` must agree.
    pub quorum_threshold: u32,

    /// Hex-encoded node ids of the validators this node trusts.
    pub quorum_set: Vec<String>,

    /// The base fee this node proposes; peers accept proposals within
    /// `[desired_base_fee / 2, desired_base_fee * 2]`.
    pub desired_base_fee: u32,

    /// Target seconds between ledger triggers.
    pub exp_ledger_timespan_secs: u64,

    /// Cap on any single term of the ballot-counter timeout series.
    pub max_fba_timeout_secs: u64,

    /// Tolerated clock skew when judging proposed close times.
    pub max_time_slip_secs: u64,

    /// Envelopes outside `lcl ± ledger_validity_bracket` ledgers are
    /// dropped once synced.
    pub ledger_validity_bracket: u64,

    /// Whether this node bootstraps a fresh network instead of joining an
    /// existing one.
    pub start_new_network: bool,

    /// Ledgers a pending transaction may linger before being banned.
    pub pending_depth: u32,

    /// Ledgers a banned transaction stays banned.
    pub ban_depth: u32,

    /// The pending pool holds this many ledgers' worth of operations.
    pub pool_ledger_multiplier: u32,

    /// Fee multiple required for a same-sequence replacement.
    pub fee_multiplier: i64,

    /// The network's per-ledger operation capacity.
    pub network_ledger_ops_cap: usize,
}

impl Default for HerderConfig {
    fn default() -> Self {
        Self {
            validation_key: String::new(),
            quorum_threshold: 0,
            quorum_set: Vec::new(),
            desired_base_fee: 10,
            exp_ledger_timespan_secs: 5,
            max_fba_timeout_secs: 30,
            max_time_slip_secs: 60,
            ledger_validity_bracket: 10,
            start_new_network: false,
            pending_depth: 4,
            ban_depth: 10,
            pool_ledger_multiplier: 2,
            fee_multiplier: 10,
            network_ledger_ops_cap: 1000,
        }
    }
}

impl HerderConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HerderError::InvalidConfig(format!("cannot read config: {e}")))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| HerderError::InvalidConfig(format!("cannot parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check configuration consistency.
    pub fn validate(&self) -> Result<()> {
        if self.exp_ledger_timespan_secs == 0 {
            return Err(HerderError::InvalidConfig(
                "exp_ledger_timespan_secs must be positive".into(),
            ));
        }
        if self.pending_depth == 0 {
            return Err(HerderError::InvalidConfig(
                "pending_depth must be positive".into(),
            ));
        }
        if self.ban_depth == 0 {
            return Err(HerderError::InvalidConfig("ban_depth must be positive".into()));
        }
        if self.fee_multiplier < 1 {
            return Err(HerderError::InvalidConfig(
                "fee_multiplier must be at least 1".into(),
            ));
        }
        if self.quorum_threshold as usize > self.quorum_set.len() {
            return Err(HerderError::InvalidConfig(format!(
                "quorum_threshold {} exceeds quorum_set size {}",
                self.quorum_threshold,
                self.quorum_set.len()
            )));
        }
        if self.start_new_network && self.validation_key.is_empty() {
            return Err(HerderError::InvalidConfig(
                "start_new_network requires a validation_key".into(),
            ));
        }
        if !self.validation_key.is_empty() {
            self.secret_key()?;
        }
        self.local_quorum_set()?;
        Ok(())
    }

    /// The node's secret key, parsed from `validation_key`.
    pub fn secret_key(&self) -> Result<SecretKey> {
        Ok(SecretKey::from_hex_seed(&self.validation_key)?)
    }

    /// The node's quorum set, parsed from `quorum_threshold` and
    /// `quorum_set`.
    pub fn local_quorum_set(&self) -> Result<QuorumSet> {
        let mut validators = Vec::with_capacity(self.quorum_set.len());
        for entry in &self.quorum_set {
            let bytes = hex::decode(entry)
                .map_err(|e| HerderError::InvalidConfig(format!("bad quorum_set entry: {e}")))?;
            let id: [u8; 32] = bytes.try_into().map_err(|_| {
                HerderError::InvalidConfig("quorum_set entries must be 32 bytes of hex".into())
            })?;
            validators.push(NodeId(id));
        }
        Ok(QuorumSet {
            threshold: self.quorum_threshold,
            validators,
        })
    }

    /// The queue slice of this configuration.
    pub fn tx_queue_config(&self) -> TxQueueConfig {
        TxQueueConfig {
            pending_depth: self.pending_depth,
            ban_depth: self.ban_depth,
            pool_ledger_multiplier: self.pool_ledger_multiplier,
            fee_multiplier: self.fee_multiplier,
            network_ledger_ops_cap: self.network_ledger_ops_cap,
        }
    }
}
