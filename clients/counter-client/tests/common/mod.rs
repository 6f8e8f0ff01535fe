//! In-memory ledger that executes counter transactions the way the program would.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use counter_client::{
    ClientError, CounterAccount, CounterOperation, CounterState, FreshnessToken, LedgerClient,
    RemoteFailure, Result, SignedTransaction, SubmissionHandle,
};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// Every ledger call, in the order it was made
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    GetBalance,
    Token(Hash),
    Submit {
        operation: CounterOperation,
        blockhash: Hash,
    },
    Confirm(CounterOperation),
    Fetch,
}

struct Pending {
    operation: CounterOperation,
    counter: Pubkey,
    user: Pubkey,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<Pubkey, CounterAccount>,
    balances: HashMap<Pubkey, u64>,
    next_token: u8,
    issued: HashSet<Hash>,
    used: HashSet<Hash>,
    pending: HashMap<Signature, Pending>,
    calls: Vec<Call>,
    timeouts: HashSet<CounterOperation>,
    rejections: HashMap<CounterOperation, RemoteFailure>,
    lose_initialize_race: bool,
    fetch_unreachable: bool,
}

pub struct FakeLedger {
    program_id: Pubkey,
    inner: Mutex<Inner>,
}

impl FakeLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn fund(&self, address: Pubkey, lamports: u64) {
        self.inner.lock().unwrap().balances.insert(address, lamports);
    }

    /// Seed an already initialized counter
    pub fn seed_counter(&self, address: Pubkey, authority: Pubkey, count: u64) {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(address, counter_account(authority, count));
    }

    /// Confirmations of `operation` never arrive
    pub fn time_out(&self, operation: CounterOperation) {
        self.inner.lock().unwrap().timeouts.insert(operation);
    }

    /// Submissions of `operation` are rejected with `failure`
    pub fn reject(&self, operation: CounterOperation, failure: RemoteFailure) {
        self.inner.lock().unwrap().rejections.insert(operation, failure);
    }

    /// Another run initializes the counter just before ours is submitted
    pub fn lose_initialize_race(&self) {
        self.inner.lock().unwrap().lose_initialize_race = true;
    }

    pub fn make_unreachable(&self) {
        self.inner.lock().unwrap().fetch_unreachable = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn submissions(&self) -> Vec<(CounterOperation, Hash)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit {
                    operation,
                    blockhash,
                } => Some((operation, blockhash)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, address: &Pubkey) -> Option<u64> {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|account| account.count)
    }
}

fn counter_account(authority: Pubkey, count: u64) -> CounterAccount {
    CounterAccount {
        authority: authority.to_bytes(),
        count,
        created_at: 1_700_000_000,
        updated_at: 1_700_000_000,
        total_increments: count,
        total_decrements: 0,
    }
}

fn already_in_use(address: &Pubkey) -> RemoteFailure {
    RemoteFailure::new(
        Some(0),
        format!("Allocate: account Address {{ address: {address}, base: None }} already in use"),
    )
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::GetBalance);
        Ok(inner.balances.get(address).copied().unwrap_or_default())
    }

    async fn latest_freshness_token(&self) -> Result<FreshnessToken> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_token += 1;
        let blockhash = Hash::new_from_array([inner.next_token; 32]);
        inner.issued.insert(blockhash);
        inner.calls.push(Call::Token(blockhash));
        Ok(FreshnessToken::new(blockhash))
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<SubmissionHandle> {
        let mut inner = self.inner.lock().unwrap();
        let tx = signed.transaction();
        let blockhash = tx.message.recent_blockhash;
        let operation = CounterOperation::from_data(&tx.message.instructions[0].data)
            .expect("counter instruction");
        inner.calls.push(Call::Submit {
            operation,
            blockhash,
        });

        if tx.verify().is_err() {
            return Err(ClientError::rejected(RemoteFailure::new(
                None,
                "Transaction did not pass signature verification",
            )));
        }
        if !inner.issued.contains(&blockhash) || !inner.used.insert(blockhash) {
            return Err(ClientError::rejected(RemoteFailure::new(
                None,
                "Blockhash not found",
            )));
        }

        let keys = &tx.message.account_keys;
        let ix = &tx.message.instructions[0];
        let counter = keys[usize::from(ix.accounts[0])];
        let user = keys[usize::from(ix.accounts[1])];

        if operation == CounterOperation::Initialize && inner.lose_initialize_race {
            inner.accounts.insert(counter, counter_account(user, 0));
        }
        if let Some(failure) = inner.rejections.get(&operation) {
            return Err(ClientError::rejected(failure.clone()));
        }
        if operation == CounterOperation::Initialize && inner.accounts.contains_key(&counter) {
            return Err(ClientError::rejected(already_in_use(&counter)));
        }

        let signature = signed.signature();
        inner.pending.insert(
            signature,
            Pending {
                operation,
                counter,
                user,
            },
        );
        Ok(SubmissionHandle::from(signature))
    }

    async fn await_confirmation(&self, handle: &SubmissionHandle) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let pending = inner
            .pending
            .remove(&handle.signature)
            .expect("confirmation of an unknown submission");
        inner.calls.push(Call::Confirm(pending.operation));

        if inner.timeouts.contains(&pending.operation) {
            return Err(ClientError::ConfirmationTimeout {
                signature: handle.signature.to_string(),
                waited_secs: 60,
            });
        }

        match pending.operation {
            CounterOperation::Initialize => {
                inner
                    .accounts
                    .insert(pending.counter, counter_account(pending.user, 0));
            }
            CounterOperation::Increment => match inner.accounts.get_mut(&pending.counter) {
                Some(account) => {
                    account.count += 1;
                    account.total_increments += 1;
                }
                None => {
                    return Err(ClientError::rejected(RemoteFailure::new(
                        Some(3012),
                        "custom program error: 0xbc4",
                    )))
                }
            },
        }
        Ok(())
    }

    async fn fetch_resource_state(&self, address: &Pubkey) -> Result<Option<CounterState>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Fetch);
        if inner.fetch_unreachable {
            return Err(ClientError::Network("connection refused".to_string()));
        }

        // Round-trip through account bytes, as an RPC read would.
        match inner.accounts.get(address) {
            Some(account) => CounterState::decode(*address, &account.to_account_data()).map(Some),
            None => Ok(None),
        }
    }
}

pub fn program_id() -> Pubkey {
    Pubkey::new_unique()
}
