//! The ledger capabilities the lifecycle controller relies on
//!
//! Every method is a separate suspension point and reports failure through
//! [`ClientError`](crate::errors::ClientError) rather than panicking, so the
//! controller can be driven by an in-memory ledger in tests exactly as it is
//! by RPC in production.

use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::errors::Result;
use crate::state::CounterState;
use crate::transaction::{FreshnessToken, SignedTransaction};

/// Handle to a submitted transaction, used to wait for its confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubmissionHandle {
    pub signature: Signature,
}

impl From<Signature> for SubmissionHandle {
    fn from(signature: Signature) -> Self {
        Self { signature }
    }
}

/// Bounds for waiting on a confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance of `address` in lamports
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// A fresh token to bind the next transaction to
    async fn latest_freshness_token(&self) -> Result<FreshnessToken>;

    /// Send a signed transaction without waiting for it to land
    async fn submit(&self, transaction: &SignedTransaction) -> Result<SubmissionHandle>;

    /// Wait until the submission is confirmed
    ///
    /// Returns `ConfirmationTimeout` if the bound elapses first, and a
    /// rejection if the ledger executed the transaction and it failed.
    async fn await_confirmation(&self, handle: &SubmissionHandle) -> Result<()>;

    /// Current state of the counter at `address`, `None` if no account exists
    async fn fetch_resource_state(&self, address: &Pubkey) -> Result<Option<CounterState>>;
}
