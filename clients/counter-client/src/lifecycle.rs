//! # Lifecycle Module
//!
//! Drives one counter from whatever state the ledger reports to a confirmed
//! increment. Each step waits for the previous one: a transaction is built
//! only after its own blockhash was fetched, and state is re-read only after
//! the transaction that changed it was confirmed. Counts are never computed
//! locally; the reported count is always the one read back from the ledger.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing::{debug, info, warn};

use crate::errors::{ClientError, Result};
use crate::identity::Identity;
use crate::instructions::{CounterAccounts, CounterOperation};
use crate::ledger::LedgerClient;
use crate::state::{CounterState, LifecycleState};
use crate::transaction::{SignedTransaction, UnsignedTransaction};

/// Outcome of a complete run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Payer balance in lamports, read at the start of the run
    pub payer_balance: u64,
    /// Whether this run's initialize transaction created the counter
    pub initialized_by_this_run: bool,
    /// Counter state observed before the increment was submitted
    pub before_increment: CounterState,
    /// Counter state observed after the increment was confirmed
    pub after_increment: CounterState,
    /// Signature of the initialize transaction, when one was confirmed
    pub initialize_signature: Option<Signature>,
    pub increment_signature: Signature,
}

/// State machine over a single counter account
pub struct CounterLifecycle<'a, L: LedgerClient + ?Sized> {
    ledger: &'a L,
    program_id: Pubkey,
    payer: &'a Identity,
    counter: &'a Identity,
    state: LifecycleState,
    payer_balance: Option<u64>,
}

impl<'a, L: LedgerClient + ?Sized> CounterLifecycle<'a, L> {
    pub fn new(ledger: &'a L, program_id: Pubkey, payer: &'a Identity, counter: &'a Identity) -> Self {
        Self {
            ledger,
            program_id,
            payer,
            counter,
            state: LifecycleState::Unknown,
            payer_balance: None,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Payer balance in lamports, once `run` has read it
    ///
    /// Kept even when a later step of the run fails.
    pub fn payer_balance(&self) -> Option<u64> {
        self.payer_balance
    }

    pub fn counter_address(&self) -> Pubkey {
        self.counter.address()
    }

    fn accounts(&self) -> CounterAccounts {
        CounterAccounts {
            counter: self.counter.address(),
            user: self.payer.address(),
        }
    }

    /// Query the ledger and move to `NotInitialized` or `Initialized`
    ///
    /// Once initialized, an absent account is reported as an error instead of
    /// moving back to `NotInitialized`.
    pub async fn observe(&mut self) -> Result<&LifecycleState> {
        let address = self.counter.address();
        let observed = self.ledger.fetch_resource_state(&address).await?;

        if observed.is_none() && matches!(self.state, LifecycleState::Initialized(_)) {
            return Err(ClientError::StateNotObserved(address.to_string()));
        }
        self.state = LifecycleState::observed(observed);
        debug!(counter = %address, state = ?self.state, "observed counter");
        Ok(&self.state)
    }

    /// Fetch a fresh token, then build and sign `operation`
    async fn prepare(&self, operation: CounterOperation) -> Result<SignedTransaction> {
        let token = self.ledger.latest_freshness_token().await?;
        debug!(operation = operation.name(), blockhash = %token, "building transaction");

        let unsigned = UnsignedTransaction::build(
            self.program_id,
            operation,
            self.accounts(),
            self.payer.address(),
            token,
        );
        if operation.counter_signs() {
            unsigned.sign(&[self.payer, self.counter])
        } else {
            unsigned.sign(&[self.payer])
        }
    }

    /// Submit and block until the ledger confirms the transaction
    async fn submit_and_confirm(&self, transaction: &SignedTransaction) -> Result<Signature> {
        let handle = self.ledger.submit(transaction).await?;
        info!(
            operation = transaction.operation().name(),
            signature = %handle.signature,
            "transaction submitted"
        );
        self.ledger.await_confirmation(&handle).await?;
        debug!(signature = %handle.signature, "transaction confirmed");
        Ok(handle.signature)
    }

    async fn require_observed(&mut self) -> Result<CounterState> {
        let address = self.counter.address();
        match self.observe().await? {
            LifecycleState::Initialized(state) => Ok(state.clone()),
            _ => Err(ClientError::StateNotObserved(address.to_string())),
        }
    }

    /// Create the counter account
    ///
    /// Returns the confirmed signature, or `None` when the ledger rejected our
    /// transaction because a concurrent run initialized the same counter
    /// first. In that case the winner's state is adopted after re-reading it.
    pub async fn initialize(&mut self) -> Result<Option<Signature>> {
        info!(counter = %self.counter.address(), "initializing counter");
        let transaction = self.prepare(CounterOperation::Initialize).await?;

        let outcome = self.submit_and_confirm(&transaction).await;
        match outcome {
            Ok(signature) => {
                let state = self.require_observed().await?;
                info!(count = state.count, "counter initialized");
                Ok(Some(signature))
            }
            Err(error) if error.is_rejection() => {
                // Our own failure is only a lost race if the account now exists.
                if let LifecycleState::Initialized(state) = self.observe().await? {
                    warn!(
                        count = state.count,
                        %error,
                        "initialize rejected but counter already exists; adopting it"
                    );
                    Ok(None)
                } else {
                    Err(error)
                }
            }
            Err(error) => Err(error),
        }
    }

    /// Increment the counter and return its re-observed state
    pub async fn increment(&mut self) -> Result<(Signature, CounterState)> {
        let before = match &self.state {
            LifecycleState::Initialized(state) => state.count,
            _ => return Err(ClientError::StateNotObserved(self.counter.address().to_string())),
        };

        info!(counter = %self.counter.address(), count = before, "incrementing counter");
        let transaction = self.prepare(CounterOperation::Increment).await?;
        let signature = self.submit_and_confirm(&transaction).await?;

        let after = self.require_observed().await?;
        if before.checked_add(1) != Some(after.count) {
            warn!(
                before,
                after = after.count,
                "counter moved by more than this run's increment"
            );
        }
        info!(count = after.count, "counter incremented");
        Ok((signature, after))
    }

    /// Run the whole flow: balance, observe, initialize if needed, increment
    pub async fn run(&mut self) -> Result<RunReport> {
        let payer_balance = self.ledger.get_balance(&self.payer.address()).await?;
        info!(payer = %self.payer.address(), lamports = payer_balance, "payer balance");
        self.payer_balance = Some(payer_balance);

        let mut initialize_signature = None;
        if matches!(self.observe().await?, LifecycleState::NotInitialized) {
            initialize_signature = self.initialize().await?;
        }

        let before_increment = match &self.state {
            LifecycleState::Initialized(state) => state.clone(),
            _ => return Err(ClientError::StateNotObserved(self.counter.address().to_string())),
        };
        let (increment_signature, after_increment) = self.increment().await?;

        Ok(RunReport {
            payer_balance,
            initialized_by_this_run: initialize_signature.is_some(),
            before_increment,
            after_increment,
            initialize_signature,
            increment_signature,
        })
    }
}
