//! Client configuration
//!
//! Values come from an optional TOML file and are then overridden by
//! command-line flags. Everything has a default suitable for devnet.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

use crate::errors::{ClientError, Result};
use crate::ledger::ConfirmationPolicy;

/// Address of the deployed counter program
pub const DEFAULT_PROGRAM_ID: &str = "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS";

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the ledger
    pub rpc_url: String,
    /// `processed`, `confirmed` or `finalized`
    pub commitment: String,
    /// Fee payer keypair, in the Solana CLI format
    pub payer_keypair: PathBuf,
    /// Where the counter keypair is persisted between runs
    pub counter_keypair: PathBuf,
    pub program_id: String,
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: "confirmed".to_string(),
            payer_keypair: default_payer_keypair(),
            counter_keypair: PathBuf::from("counter-keypair.json"),
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            confirm_timeout_secs: 60,
            poll_interval_ms: 500,
        }
    }
}

fn default_payer_keypair() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".config").join("solana").join("id.json")
}

impl ClientConfig {
    /// Read a TOML config file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .map_err(|e| ClientError::Config(format!("invalid program id {}: {e}", self.program_id)))
    }

    pub fn commitment(&self) -> Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(ClientError::Config(format!("unknown commitment level {other}"))),
        }
    }

    pub fn confirmation_policy(&self) -> Result<ConfirmationPolicy> {
        if self.confirm_timeout_secs == 0 {
            return Err(ClientError::Config("confirm_timeout_secs must be positive".to_string()));
        }
        Ok(ConfirmationPolicy {
            timeout: Duration::from_secs(self.confirm_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        })
    }
}
